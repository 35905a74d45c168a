// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque workload credential.
//!
//! The supervisor hands each workload a secret token via its environment
//! (`BOT_TOKEN`). The token is persisted in the registry store but must
//! never appear in logs or command output, so `Debug` and `Display` are
//! redacted. Code that genuinely needs the raw value (environment
//! injection at spawn time) calls [`Credential::expose`].

use serde::{Deserialize, Serialize};

/// Environment variable the credential is injected under.
pub const CREDENTIAL_ENV_VAR: &str = "BOT_TOKEN";

/// A secret token supplied to a workload at startup.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret. Only for environment injection; never log this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Redacted form safe for logs and operator output: at most the
    /// first four characters followed by an ellipsis.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}…")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
