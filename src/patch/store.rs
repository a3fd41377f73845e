//! Persisted patch settings and identity.
//!
//! The in-memory [`PatchConfig`] is the working copy read by tasks; every
//! committed change is validated, then written as a postcard blob through
//! the [`StoragePort`]. A failed write leaves the working copy unchanged.
//!
//! The bonding handshake stages a MAC in memory only. It becomes durable on
//! [`commit_mac`](PatchConfigStore::commit_mac) and is cleared (and the
//! clearing persisted) on [`rollback_mac`](PatchConfigStore::rollback_mac).

use core::cell::RefCell;

use log::{info, warn};

use crate::app::ports::{ConfigError, StoragePort};
use crate::config::{MAC_ADDRESS_LEN, PatchConfig};

const NAMESPACE: &str = "patch";
const KEY: &str = "patchcfg";
const MAX_BLOB_SIZE: usize = 64;

pub struct PatchConfigStore {
    config: RefCell<PatchConfig>,
    storage: RefCell<Box<dyn StoragePort>>,
}

impl PatchConfigStore {
    /// Load the persisted config, falling back to defaults when absent or
    /// unreadable.
    pub fn load(storage: Box<dyn StoragePort>) -> Self {
        let config = match Self::read(storage.as_ref()) {
            Ok(cfg) => {
                info!(target: "store", "patch config loaded, bonded={}", cfg.is_bonded());
                cfg
            }
            Err(ConfigError::NotFound) => {
                info!(target: "store", "no stored patch config, using defaults");
                PatchConfig::default()
            }
            Err(e) => {
                warn!(target: "store", "patch config unreadable ({e}), using defaults");
                PatchConfig::default()
            }
        };
        Self {
            config: RefCell::new(config),
            storage: RefCell::new(storage),
        }
    }

    fn read(storage: &dyn StoragePort) -> Result<PatchConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let len = storage.read(NAMESPACE, KEY, &mut buf)?;
        let cfg: PatchConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn persist(&self, cfg: &PatchConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        let bytes = postcard::to_allocvec(cfg).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        self.storage
            .borrow_mut()
            .write(NAMESPACE, KEY, &bytes)
            .map_err(ConfigError::from)
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn get(&self) -> PatchConfig {
        self.config.borrow().clone()
    }

    pub fn mac_address(&self) -> heapless::String<MAC_ADDRESS_LEN> {
        self.config.borrow().mac_address.clone()
    }

    // ── Writes ────────────────────────────────────────────────

    /// Apply `f` to a copy, validate and persist it, then adopt it.
    pub fn update(&self, f: impl FnOnce(&mut PatchConfig)) -> Result<(), ConfigError> {
        let mut next = self.get();
        f(&mut next);
        self.persist(&next)?;
        *self.config.borrow_mut() = next;
        Ok(())
    }

    /// Set the working-copy MAC without persisting it.
    pub fn stage_mac(&self, mac: &str) -> Result<(), ConfigError> {
        let mut staged = heapless::String::new();
        staged
            .push_str(mac)
            .map_err(|()| ConfigError::ValidationFailed("mac_address too long"))?;
        self.config.borrow_mut().mac_address = staged;
        Ok(())
    }

    /// Persist the staged MAC.
    pub fn commit_mac(&self) -> Result<(), ConfigError> {
        let cfg = self.get();
        self.persist(&cfg)?;
        info!(target: "store", "patch MAC {} recorded", cfg.mac_address);
        Ok(())
    }

    /// Clear the MAC and persist the cleared state. Best effort: a storage
    /// failure is logged, the working copy is cleared regardless.
    pub fn rollback_mac(&self) {
        self.config.borrow_mut().mac_address.clear();
        let cfg = self.get();
        if let Err(e) = self.persist(&cfg) {
            warn!(target: "store", "failed to persist MAC rollback: {e}");
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.storage.borrow().exists(NAMESPACE, KEY)
    }
}
