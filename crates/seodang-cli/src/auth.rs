//! Keychain-backed token persistence for the CLI.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use seodang_core::{Error, Result, TokenStore};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "seodang-cli";

/// Stores the session token in the OS keychain under a fixed account name.
#[derive(Clone)]
pub struct KeyringTokenStore {
    account: String,
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            account: "session_token".to_string(),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.account)
            .map_err(|error| Error::Storage(error.to_string()))
    }
}

impl TokenStore for KeyringTokenStore {
    #[cfg(not(test))]
    fn load_token(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_token(&self) -> Result<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        Ok(guard.get(&self.account).cloned())
    }

    #[cfg(not(test))]
    fn save_token(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(|error| Error::Storage(error.to_string()))
    }

    #[cfg(test)]
    fn save_token(&self, token: &str) -> Result<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        guard.insert(self.account.clone(), token.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_token(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_token(&self) -> Result<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        guard.remove(&self.account);
        Ok(())
    }
}
