//! Sign-in credentials
//!
//! Constructed once at startup and passed by parameter; nothing below the
//! binary entry point reads the process environment. Neither field ever
//! appears in logs or Debug output.

use std::env;
use std::fmt;

use thiserror::Error;

const IDENTITY_VAR: &str = "CAUGHTUP_IDENTITY";
const SECRET_VAR: &str = "CAUGHTUP_SECRET";

/// Errors from credential construction; messages name the variable, never
/// its value.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {0} is set but empty")]
    Empty(&'static str),
}

/// An identity/secret pair, immutable for the run
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Read both values from the environment. Call this once, at startup.
    pub fn from_env() -> Result<Self, CredentialsError> {
        Ok(Self {
            identity: required_var(IDENTITY_VAR)?,
            secret: required_var(SECRET_VAR)?,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn required_var(name: &'static str) -> Result<String, CredentialsError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(CredentialsError::Empty(name)),
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => Err(CredentialsError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn test_debug_never_leaks() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_env_missing() {
        let _guard = env_lock().lock().unwrap();
        env::remove_var(IDENTITY_VAR);
        env::remove_var(SECRET_VAR);

        let err = Credentials::from_env().unwrap_err();
        assert!(err.to_string().contains(IDENTITY_VAR));
    }

    #[test]
    fn test_from_env_trims() {
        let _guard = env_lock().lock().unwrap();
        env::set_var(IDENTITY_VAR, " user@example.com ");
        env::set_var(SECRET_VAR, "s3cret");

        let creds = Credentials::from_env().unwrap();
        assert_eq!(creds.identity(), "user@example.com");
        assert_eq!(creds.secret(), "s3cret");

        env::remove_var(IDENTITY_VAR);
        env::remove_var(SECRET_VAR);
    }

    #[test]
    fn test_from_env_empty_secret() {
        let _guard = env_lock().lock().unwrap();
        env::set_var(IDENTITY_VAR, "user@example.com");
        env::set_var(SECRET_VAR, "   ");

        let err = Credentials::from_env().unwrap_err();
        assert!(err.to_string().contains(SECRET_VAR));

        env::remove_var(IDENTITY_VAR);
        env::remove_var(SECRET_VAR);
    }
}
