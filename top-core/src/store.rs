use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ProviderError;
use crate::identity::UserIdentity;

/// Serial number of the first token after construction or reset.
pub const FIRST_SERIAL: u64 = 1;

struct IssuedEntry {
    user: UserIdentity,
    serial: u64,
}

struct StoreInner {
    /// Map: access token -> issued identity.
    users: HashMap<String, IssuedEntry>,
    /// Index: serial -> access token, in issuance order.
    issued: BTreeMap<u64, String>,
    /// Map: authorization code -> access token.
    codes: HashMap<String, String>,
    serial: u64,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            users: HashMap::new(),
            issued: BTreeMap::new(),
            codes: HashMap::new(),
            serial: FIRST_SERIAL,
        }
    }
}

/// In-memory token and authorization-code store.
///
/// All mutations go through one lock, so a recorded token, its position in
/// issuance order and the serial counter always change together.
pub struct TokenStore {
    inner: Mutex<StoreInner>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a token for `user`.
    ///
    /// `sign` receives the current serial number and produces the token. On
    /// success the token is stored and the serial counter incremented; on
    /// failure the store is left untouched.
    pub fn record_token<F>(&self, user: UserIdentity, sign: F) -> Result<String, ProviderError>
    where
        F: FnOnce(u64) -> Result<String, ProviderError>,
    {
        let mut inner = self.lock();
        let serial = inner.serial;
        let token = sign(serial)?;
        if let Some(previous) = inner.users.insert(token.clone(), IssuedEntry { user, serial }) {
            inner.issued.remove(&previous.serial);
        }
        inner.issued.insert(serial, token.clone());
        inner.serial += 1;
        Ok(token)
    }

    /// The identity recorded for `token`.
    pub fn lookup_user(&self, token: &str) -> Result<UserIdentity, ProviderError> {
        self.lock()
            .users
            .get(token)
            .map(|entry| entry.user.clone())
            .ok_or_else(|| ProviderError::NotFound("token is invalid or expired".into()))
    }

    /// Whether `token` is currently recorded.
    pub fn contains(&self, token: &str) -> bool {
        self.lock().users.contains_key(token)
    }

    /// The most recently issued token that is still live.
    pub fn last_issued(&self) -> Option<String> {
        self.lock()
            .issued
            .last_key_value()
            .map(|(_, token)| token.clone())
    }

    /// Bind an authorization code to a live token.
    pub fn bind_code(&self, code: String, token: &str) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        if !inner.users.contains_key(token) {
            return Err(ProviderError::InvalidState(
                "token is invalid or expired".into(),
            ));
        }
        inner.codes.insert(code, token.to_string());
        Ok(())
    }

    /// Remove and return the token bound to `code`. Succeeds at most once per code.
    pub fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        self.lock().codes.remove(code).ok_or_else(|| {
            ProviderError::InvalidState("Authorization code is invalid or expired".into())
        })
    }

    /// Remove an expired token and any codes bound to it.
    ///
    /// Returns `false` if the token was already gone.
    pub fn expire(&self, token: &str) -> bool {
        let mut inner = self.lock();
        let Some(entry) = inner.users.remove(token) else {
            return false;
        };
        inner.issued.remove(&entry.serial);
        inner.codes.retain(|_, bound| bound != token);
        true
    }

    /// Empty both maps and restart the serial counter.
    pub fn clear_all(&self) {
        *self.lock() = StoreInner::new();
    }

    /// Number of live tokens.
    pub fn len(&self) -> usize {
        self.lock().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of outstanding authorization codes.
    pub fn num_codes(&self) -> usize {
        self.lock().codes.len()
    }

    /// Serial number the next recorded token will get.
    pub fn next_serial(&self) -> u64 {
        self.lock().serial
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
