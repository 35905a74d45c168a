// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn debug_never_contains_full_secret() {
    let cred = Credential::new("tok-1234567890");
    let debug = format!("{:?}", cred);
    assert!(!debug.contains("tok-1234567890"));
    assert!(debug.contains("tok-"));
}

#[test]
fn display_is_redacted() {
    let cred = Credential::new("supersecret");
    assert_eq!(cred.to_string(), "supe…");
}

#[test]
fn short_secret_redacts_without_panic() {
    let cred = Credential::new("ab");
    assert_eq!(cred.to_string(), "ab…");
}

#[test]
fn expose_returns_raw_secret() {
    let cred = Credential::new("tok-123");
    assert_eq!(cred.expose(), "tok-123");
}

#[test]
fn serde_is_transparent() {
    let cred = Credential::new("tok-123");
    let json = serde_json::to_string(&cred).unwrap();
    assert_eq!(json, "\"tok-123\"");
    let back: Credential = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cred);
}
