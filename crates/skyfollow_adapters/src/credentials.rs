use async_trait::async_trait;
use keyring::Entry;
use reqwest::Url;
use skyfollow_core::ports::CredentialStore;
use skyfollow_core::Error;
use tracing::{debug, instrument};

const SERVICE_NAME: &str = "skyfollow";

/// App passwords kept in the OS keyring.
///
/// Each password lives in a slot named `<identifier>@<host>`, so the same
/// handle on two different servers maps to two separate entries.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    host: String,
}

impl KeyringCredentialStore {
    /// Store scoped to the server behind `service_url`.
    pub fn for_service(service_url: &str) -> Result<Self, Error> {
        let url = Url::parse(service_url).map_err(|e| {
            Error::InvalidInput(format!("invalid service url '{}': {}", service_url, e))
        })?;
        let host = url.host_str().ok_or_else(|| {
            Error::InvalidInput(format!("service url '{}' has no host", service_url))
        })?;

        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        Ok(Self {
            host: host.to_lowercase(),
        })
    }

    fn slot(&self, identifier: &str) -> String {
        let identifier = identifier.trim().trim_start_matches('@').to_lowercase();
        format!("{}@{}", identifier, self.host)
    }
}

/// Run one keyring operation off the async runtime.
///
/// The platform secret service blocks, so the entry is opened and used
/// inside `spawn_blocking`.
async fn with_entry<T, F>(slot: String, op: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce(Entry) -> keyring::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(Entry::new(SERVICE_NAME, &slot)?))
        .await
        .map_err(|e| Error::CredentialStorage(format!("keyring task failed: {}", e)))?
        .map_err(|e| Error::CredentialStorage(e.to_string()))
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    #[instrument(skip(self, password), fields(host = %self.host))]
    async fn store_password(&self, identifier: &str, password: &str) -> Result<(), Error> {
        let slot = self.slot(identifier);
        debug!(slot = %slot, "storing app password");

        let password = password.to_string();
        with_entry(slot, move |entry| entry.set_password(&password)).await
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn get_password(&self, identifier: &str) -> Result<Option<String>, Error> {
        with_entry(self.slot(identifier), |entry| match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    #[instrument(skip(self), fields(host = %self.host))]
    async fn delete_password(&self, identifier: &str) -> Result<(), Error> {
        with_entry(self.slot(identifier), |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}
