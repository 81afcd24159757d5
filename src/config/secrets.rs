use std::fmt;

use eyre::{Result, WrapErr};
use keyring::Entry;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::{HarnessError, HarnessResult};

const SERVICE_NAME: &str = "campaign-deployer";

/// Where a sensitive configuration value comes from.
///
/// Written in configuration as `env:NAME`, `keychain:ENTRY`, or a bare literal.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum SecretRef {
    Env(String),
    Keychain(String),
    Literal(String),
}

impl SecretRef {
    pub fn parse(value: &str) -> Self {
        if let Some(name) = value.strip_prefix("env:") {
            SecretRef::Env(name.to_string())
        } else if let Some(entry) = value.strip_prefix("keychain:") {
            SecretRef::Keychain(entry.to_string())
        } else {
            SecretRef::Literal(value.to_string())
        }
    }

    /// True when the value is injected at runtime rather than written in config
    pub fn is_external(&self) -> bool {
        !matches!(self, SecretRef::Literal(_))
    }

    pub fn resolve(&self) -> HarnessResult<Zeroizing<String>> {
        match self {
            SecretRef::Env(name) => std::env::var(name)
                .map(Zeroizing::new)
                .map_err(|_| HarnessError::MissingSecret(format!("environment variable {}", name))),
            SecretRef::Keychain(entry) => KeychainManager::new()
                .get_zeroizing(entry)
                .map_err(|e| {
                    HarnessError::MissingSecret(format!("keychain entry {}: {:#}", entry, e))
                })?
                .ok_or_else(|| HarnessError::MissingSecret(format!("keychain entry {}", entry))),
            SecretRef::Literal(value) => Ok(Zeroizing::new(value.clone())),
        }
    }
}

impl From<String> for SecretRef {
    fn from(value: String) -> Self {
        SecretRef::parse(&value)
    }
}

impl fmt::Debug for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretRef::Env(name) => write!(f, "env:{}", name),
            SecretRef::Keychain(entry) => write!(f, "keychain:{}", entry),
            SecretRef::Literal(_) => write!(f, "<literal>"),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Manager for secure credential storage using the OS keychain
pub struct KeychainManager {
    service: String,
}

impl KeychainManager {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Store a secret in the keychain
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)
            .wrap_err_with(|| format!("Failed to create keychain entry for {}", key))?;

        entry
            .set_password(value)
            .wrap_err_with(|| format!("Failed to store secret for {}", key))?;

        tracing::info!("Stored secret in keychain: {}", key);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, key)
            .wrap_err_with(|| format!("Failed to access keychain entry for {}", key))?;

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to retrieve secret for {}", key)),
        }
    }

    pub fn get_zeroizing(&self, key: &str) -> Result<Option<Zeroizing<String>>> {
        self.get(key).map(|opt| opt.map(Zeroizing::new))
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)
            .wrap_err_with(|| format!("Failed to access keychain entry for {}", key))?;

        match entry.delete_credential() {
            Ok(()) => {
                tracing::info!("Deleted secret from keychain: {}", key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to delete secret for {}", key)),
        }
    }
}

impl Default for KeychainManager {
    fn default() -> Self {
        Self::new()
    }
}
