//! Credentials for the delivery endpoint.
//!
//! Secrets are resolved when a session opens, never stored in config.

use std::fmt;

use crate::TransportError;

/// A password or passphrase. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Supplies the endpoint credential on demand.
pub trait SecretProvider: Send + Sync {
    fn secret(&self) -> Result<Secret, TransportError>;
}

/// Reads the secret from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvSecret {
    var: String,
}

impl EnvSecret {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretProvider for EnvSecret {
    fn secret(&self) -> Result<Secret, TransportError> {
        match std::env::var(&self.var) {
            Ok(v) if !v.is_empty() => Ok(Secret(v)),
            _ => Err(TransportError::Credential(format!(
                "environment variable {} is not set",
                self.var
            ))),
        }
    }
}

/// A fixed secret, for tests and embedding.
#[derive(Debug, Clone)]
pub struct StaticSecret(pub Secret);

impl SecretProvider for StaticSecret {
    fn secret(&self) -> Result<Secret, TransportError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let s = Secret::new("hunter2");
        assert_eq!(format!("{s:?}"), "Secret(***)");
        assert_eq!(s.expose(), "hunter2");
    }

    #[test]
    fn missing_env_var_is_credential_error() {
        let provider = EnvSecret::new("DOCRELAY_TEST_SECRET_THAT_IS_NEVER_SET");
        let err = provider.secret().unwrap_err();
        assert_eq!(err.kind(), "credential");
    }
}
