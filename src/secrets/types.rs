//! Secure types for handling sensitive data.
//!
//! Both types redact themselves in `Debug` and `Display` and zero their memory
//! on drop. Neither implements `Serialize`: there is no code path that writes
//! a secret anywhere other than the decrypt process's secret channel.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The decryption passphrase for one pipeline run.
///
/// Fetched from the secret store at the start of a request, handed to the
/// [`SecretChannel`](crate::pipeline::SecretChannel) and dropped (zeroed) as
/// soon as the channel has written it. Deliberately not `Clone`: a run holds
/// exactly one copy.
pub struct Secret {
    bytes: Zeroizing<Vec<u8>>,
}

impl Secret {
    /// Wraps raw passphrase bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: Zeroizing::new(bytes.into()) }
    }

    /// Exposes the passphrase bytes.
    ///
    /// Only the secret channel writer should call this.
    pub fn expose_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the length of the secret without exposing the value.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED; {} bytes])", self.bytes.len())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// A credential from configuration (Vault token, index password, storage key).
///
/// Lives for the whole process, unlike [`Secret`].
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new SecretString from a string value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
