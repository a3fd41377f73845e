//! In-memory non-volatile storage adapter.
//!
//! Implements [`StoragePort`] over a namespaced key-value map. Hosts with
//! real persistence (preferences, flash, a file) provide their own
//! [`StoragePort`]; this backend serves simulation and tests.
//!
//! - Namespace isolation: keys are stored as `namespace::key`.
//! - Atomic writes: a value is replaced in one insert.
//! - Clones share the same map, so a reload sees earlier writes.

use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::app::ports::{StorageError, StoragePort};

/// Largest value accepted by [`write`](StoragePort::write).
pub const MAX_BLOB_SIZE: usize = 4000;

#[derive(Clone)]
pub struct NvsAdapter {
    store: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NvsAdapter {
    pub fn new() -> Self {
        info!(target: "store", "NvsAdapter: simulation backend");
        Self {
            store: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let composite = Self::composite_key(namespace, key);
        match self.store.borrow().get(&composite) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full);
        }
        let composite = Self::composite_key(namespace, key);
        debug!(target: "store", "write {} ({} bytes)", composite, data.len());
        self.store.borrow_mut().insert(composite, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key);
        self.store.borrow_mut().remove(&composite);
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        let composite = Self::composite_key(namespace, key);
        self.store.borrow().contains_key(&composite)
    }
}
