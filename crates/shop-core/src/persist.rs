//! # Client-side persistence
//!
//! Whole-snapshot storage for the cart and the auth token. Writes go to a
//! sibling temp file that is renamed over the target, so a crash leaves either
//! the old or the new snapshot on disk.

use crate::cart::Cart;
use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage for the cart snapshot
pub trait CartPersistence: Send + Sync {
    /// Load the last saved cart, `None` when nothing was saved yet
    fn load(&self) -> ShopResult<Option<Cart>>;

    /// Replace the saved cart with `cart`
    fn save(&self, cart: &Cart) -> ShopResult<()>;
}

/// A login kept between restarts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLogin {
    pub token: String,
    /// Account the token was issued for; the role is looked up again from it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl StoredLogin {
    pub fn new(token: impl Into<String>, email: Option<String>) -> Self {
        Self {
            token: token.into(),
            email,
        }
    }
}

/// Storage for the logged-in user's token
pub trait TokenStore: Send + Sync {
    fn load(&self) -> ShopResult<Option<StoredLogin>>;
    fn save(&self, login: &StoredLogin) -> ShopResult<()>;
    fn clear(&self) -> ShopResult<()>;
}

fn write_atomic(path: &Path, bytes: &[u8]) -> ShopResult<()> {
    let storage = |e: std::io::Error| ShopError::Storage(format!("{}: {}", path.display(), e));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(storage)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp).map_err(storage)?;
    file.write_all(bytes).map_err(storage)?;
    file.sync_all().map_err(storage)?;
    fs::rename(&tmp, path).map_err(storage)?;
    Ok(())
}

fn read_optional(path: &Path) -> ShopResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ShopError::Storage(format!("{}: {}", path.display(), e))),
    }
}

/// Cart snapshot kept as a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileCart {
    path: PathBuf,
}

impl JsonFileCart {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartPersistence for JsonFileCart {
    fn load(&self) -> ShopResult<Option<Cart>> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Cart>(&content) {
            Ok(cart) => Ok(Some(Cart::from_items(cart.items().to_vec()))),
            Err(e) => {
                // A corrupt snapshot is dropped rather than blocking startup.
                warn!("Ignoring unreadable cart snapshot {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, cart: &Cart) -> ShopResult<()> {
        let json = serde_json::to_vec_pretty(cart)?;
        write_atomic(&self.path, &json)?;
        debug!("Saved cart snapshot ({} lines) to {}", cart.len(), self.path.display());
        Ok(())
    }
}

/// Login kept as a small JSON file. A file holding only the bare token is
/// read as a login without an email.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ShopResult<Option<StoredLogin>> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(None);
        };
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }
        if !content.starts_with('{') {
            return Ok(Some(StoredLogin::new(content, None)));
        }
        match serde_json::from_str::<StoredLogin>(content) {
            Ok(login) => Ok(Some(login)),
            Err(e) => {
                warn!("Ignoring unreadable login {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, login: &StoredLogin) -> ShopResult<()> {
        write_atomic(&self.path, &serde_json::to_vec(login)?)
    }

    fn clear(&self) -> ShopResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShopError::Storage(format!("{}: {}", self.path.display(), e))),
        }
    }
}

/// In-memory token store, used when no token path is configured
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    login: std::sync::Mutex<Option<StoredLogin>>,
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ShopResult<Option<StoredLogin>> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, login: &StoredLogin) -> ShopResult<()> {
        *self.lock()? = Some(login.clone());
        Ok(())
    }

    fn clear(&self) -> ShopResult<()> {
        *self.lock()? = None;
        Ok(())
    }
}

impl MemoryTokenStore {
    fn lock(&self) -> ShopResult<std::sync::MutexGuard<'_, Option<StoredLogin>>> {
        self.login
            .lock()
            .map_err(|_| ShopError::Storage("token store poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartStore, LineItem};
    use rust_decimal::Decimal;

    #[test]
    fn test_cart_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileCart::new(dir.path().join("state/cart.json"));
        assert!(storage.load().unwrap().is_none());

        let mut store = CartStore::new();
        store
            .add(LineItem::new(1u64, "Remera", Decimal::from(1000)).with_quantity(2))
            .unwrap();
        storage.save(&store.snapshot()).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, *store.snapshot());
        assert!(!dir.path().join("state/cart.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_cart_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cart.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonFileCart::new(path).load().unwrap().is_none());
    }

    #[test]
    fn test_token_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));

        assert_eq!(store.load().unwrap(), None);
        let login = StoredLogin::new("abc.def", Some("admin@shop.test".into()));
        store.save(&login).unwrap();
        assert_eq!(store.load().unwrap(), Some(login));
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_bare_token_file_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "abc.def\n").unwrap();

        let login = FileTokenStore::new(path).load().unwrap().unwrap();
        assert_eq!(login.token, "abc.def");
        assert_eq!(login.email, None);
    }
}
