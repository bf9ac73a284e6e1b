//! Flickr API credentials.
//!
//! The consumer key/secret pair is resolved once at startup. Values set in the
//! config file (or via `FLICKR_LOGIN_CLIENT_ID` / `FLICKR_LOGIN_CLIENT_SECRET`)
//! win; anything still missing is read from a [`SecretStore`], normally the
//! system keychain:
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//! - Windows: Credential Manager
//!
//! The app refuses to start without both values.

use std::collections::HashMap;
use std::fmt;

use crate::config::CredentialsConfig;

/// Keychain account holding the API key.
pub const KEY_ACCOUNT: &str = "key";

/// Keychain account holding the API secret.
pub const SECRET_ACCOUNT: &str = "secret";

/// Flickr API consumer credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// The API key, sent as `oauth_consumer_key`.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The API secret, only ever used as HMAC key material.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .finish()
    }
}

/// Errors raised while resolving credentials at startup.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Either the key or the secret could not be found anywhere.
    #[error(
        "You need to save your Flickr API credentials before you can run this app.\n\n\
         Store them in the system keychain:\n\n    \
         keyring set {service} key\n    \
         keyring set {service} secret\n\n\
         or set FLICKR_LOGIN_CLIENT_ID and FLICKR_LOGIN_CLIENT_SECRET."
    )]
    Missing { service: String },

    /// The secret store itself failed.
    #[error("Keychain error: {0}")]
    Store(String),
}

/// A lookup-only view of a password store keyed by `(service, account)`.
pub trait SecretStore: Send + Sync {
    /// Read a password; `Ok(None)` when no entry exists.
    fn get_password(&self, service: &str, account: &str) -> Result<Option<String>, CredentialsError>;

    /// Backend name for log messages.
    fn name(&self) -> &str;
}

// =============================================================================
// KeyringSecretStore
// =============================================================================

/// System keychain store.
///
/// Feature-gated behind `system-keyring`. Lookups block the calling thread;
/// on Linux they go over D-Bus, so call from a blocking task.
#[cfg(feature = "system-keyring")]
#[derive(Debug, Clone, Default)]
pub struct KeyringSecretStore;

#[cfg(feature = "system-keyring")]
impl SecretStore for KeyringSecretStore {
    fn get_password(&self, service: &str, account: &str) -> Result<Option<String>, CredentialsError> {
        let entry = keyring::Entry::new(service, account)
            .map_err(|e| CredentialsError::Store(format!("Failed to create keyring entry: {e}")))?;
        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialsError::Store(format!("Keyring error: {e}"))),
        }
    }

    fn name(&self) -> &str {
        "keyring"
    }
}

// =============================================================================
// MemorySecretStore
// =============================================================================

/// In-memory store, used in tests and when the keychain is compiled out.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    entries: HashMap<(String, String), String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_password(
        mut self,
        service: impl Into<String>,
        account: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.entries
            .insert((service.into(), account.into()), password.into());
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn get_password(&self, service: &str, account: &str) -> Result<Option<String>, CredentialsError> {
        Ok(self
            .entries
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// The store used by the binary: the keychain when compiled in, otherwise
/// an empty in-memory store (so only config/env credentials work).
pub fn default_store() -> Box<dyn SecretStore> {
    #[cfg(feature = "system-keyring")]
    {
        Box::new(KeyringSecretStore)
    }
    #[cfg(not(feature = "system-keyring"))]
    {
        Box::new(MemorySecretStore::new())
    }
}

/// Resolve the API key and secret, config values first.
pub fn load(
    config: &CredentialsConfig,
    store: &dyn SecretStore,
) -> Result<Credentials, CredentialsError> {
    let service = config.keyring_service.as_str();

    let client_id = resolve(config.client_id.as_deref(), store, service, KEY_ACCOUNT)?;
    let client_secret = resolve(config.client_secret.as_deref(), store, service, SECRET_ACCOUNT)?;

    match (client_id, client_secret) {
        (Some(client_id), Some(client_secret)) => {
            tracing::debug!(store = store.name(), "Flickr API credentials loaded");
            Ok(Credentials::new(client_id, client_secret))
        }
        _ => Err(CredentialsError::Missing {
            service: service.to_string(),
        }),
    }
}

fn resolve(
    configured: Option<&str>,
    store: &dyn SecretStore,
    service: &str,
    account: &str,
) -> Result<Option<String>, CredentialsError> {
    if let Some(value) = configured.filter(|v| !v.is_empty()) {
        return Ok(Some(value.to_string()));
    }
    Ok(store
        .get_password(service, account)?
        .filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CredentialsConfig {
        CredentialsConfig {
            client_id: None,
            client_secret: None,
            keyring_service: "flickr_login_test".to_string(),
        }
    }

    #[test]
    fn test_missing_client_id_is_error() {
        let err = load(&config(), &MemorySecretStore::new()).unwrap_err();
        assert!(matches!(err, CredentialsError::Missing { .. }));
        assert!(
            err.to_string()
                .contains("You need to save your Flickr API credentials")
        );
        assert!(err.to_string().contains("keyring set flickr_login_test key"));
    }

    #[test]
    fn test_missing_client_secret_is_error() {
        let store = MemorySecretStore::new().with_password("flickr_login_test", "key", "123");
        let err = load(&config(), &store).unwrap_err();
        assert!(
            err.to_string()
                .contains("You need to save your Flickr API credentials")
        );
    }

    #[test]
    fn test_loads_from_store() {
        let store = MemorySecretStore::new()
            .with_password("flickr_login_test", "key", "123")
            .with_password("flickr_login_test", "secret", "456");
        let creds = load(&config(), &store).unwrap();
        assert_eq!(creds.client_id(), "123");
        assert_eq!(creds.client_secret(), "456");
    }

    #[test]
    fn test_config_values_take_precedence() {
        let store = MemorySecretStore::new()
            .with_password("flickr_login_test", "key", "from-store")
            .with_password("flickr_login_test", "secret", "from-store");
        let mut cfg = config();
        cfg.client_id = Some("from-config".to_string());
        let creds = load(&cfg, &store).unwrap();
        assert_eq!(creds.client_id(), "from-config");
        assert_eq!(creds.client_secret(), "from-store");
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let store = MemorySecretStore::new()
            .with_password("flickr_login_test", "key", "")
            .with_password("flickr_login_test", "secret", "456");
        assert!(load(&config(), &store).is_err());
    }

    #[cfg(all(
        feature = "system-keyring",
        any(target_os = "linux", target_os = "macos", target_os = "windows")
    ))]
    #[test]
    fn test_keyring_backend_is_persistent() {
        use keyring::credential::CredentialPersistence;

        let builder = keyring::default::default_credential_builder();
        assert!(
            !builder.as_any().is::<keyring::mock::MockCredentialBuilder>(),
            "keyring was built with its mock store: {builder:?}"
        );
        assert!(matches!(
            builder.persistence(),
            CredentialPersistence::UntilDelete | CredentialPersistence::UntilReboot
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("123", "super-secret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("123"));
        assert!(!debug.contains("super-secret"));
    }
}
