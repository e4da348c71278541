// File: aadhaar_anchor_wasm/src/storage.rs
//! localStorage persistence for exported proof bundles, so the proof
//! history survives page reloads.

use wasm_bindgen::prelude::*;
use web_sys::{Storage, Window};

use aadhaar_anchor::ProofBundle;

const KEY_PREFIX: &str = "aadhaar-proof-";

#[derive(Clone)]
pub struct BundleStore {
    storage: Storage,
}

impl BundleStore {
    pub fn new() -> Result<BundleStore, JsValue> {
        let window: Window =
            web_sys::window().ok_or_else(|| JsValue::from_str("No window found"))?;
        let storage = window
            .local_storage()?
            .ok_or_else(|| JsValue::from_str("No localStorage found"))?;

        Ok(Self { storage })
    }

    /// Persists a bundle keyed by its proof hash.
    pub fn save_bundle(&self, bundle: &ProofBundle) -> Result<(), JsValue> {
        let key = format!("{KEY_PREFIX}{}", bundle.proof_hash());
        self.storage.set_item(&key, &bundle.to_json())?;
        Ok(())
    }

    /// Loads every stored bundle. Entries that no longer parse are skipped
    /// rather than failing the listing.
    pub fn load_bundles(&self) -> Result<Vec<ProofBundle>, JsValue> {
        let mut bundles = Vec::new();

        for i in 0..self.storage.length()? {
            if let Some(key) = self.storage.key(i)? {
                if !key.starts_with(KEY_PREFIX) {
                    continue;
                }
                if let Some(raw) = self.storage.get_item(&key)? {
                    match ProofBundle::parse(raw.as_bytes()) {
                        Ok(bundle) => bundles.push(bundle),
                        Err(e) => log::warn!("dropping unreadable bundle {key}: {e}"),
                    }
                }
            }
        }

        Ok(bundles)
    }

    /// Removes every stored bundle.
    pub fn clear(&self) -> Result<(), JsValue> {
        let mut doomed = Vec::new();
        for i in 0..self.storage.length()? {
            if let Some(key) = self.storage.key(i)? {
                if key.starts_with(KEY_PREFIX) {
                    doomed.push(key);
                }
            }
        }
        for key in doomed {
            self.storage.remove_item(&key)?;
        }
        Ok(())
    }
}
