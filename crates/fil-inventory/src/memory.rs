//! MemoryInventory: in-process inventory backend.
//!
//! Holds spools and settings behind a mutex so it can be shared by
//! reference like the HTTP client. Used by tests and headless runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use fil_core::{Spool, SpoolId};

use crate::error::{InventoryError, InventoryResult};
use crate::{Inventory, SpoolQuery};

#[derive(Default)]
struct State {
    spools: BTreeMap<SpoolId, Spool>,
    settings: HashMap<String, serde_json::Value>,
    failing_locations: HashSet<SpoolId>,
}

#[derive(Default)]
pub struct MemoryInventory {
    state: Mutex<State>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spools(spools: impl IntoIterator<Item = Spool>) -> Self {
        let inventory = Self::new();
        for spool in spools {
            inventory.insert_spool(spool);
        }
        inventory
    }

    /// Insert or replace a spool.
    pub fn insert_spool(&self, spool: Spool) {
        self.lock().spools.insert(spool.id, spool);
    }

    /// Snapshot of every spool, archived included, ordered by id.
    pub fn spools(&self) -> Vec<Spool> {
        self.lock().spools.values().cloned().collect()
    }

    /// Make every later `set_spool_location` for `id` fail.
    pub fn fail_location_updates_for(&self, id: SpoolId) {
        self.lock().failing_locations.insert(id);
    }

    /// Store a raw settings value as the service would return it.
    pub fn set_raw_setting(&self, key: &str, value: serde_json::Value) {
        self.lock().settings.insert(key.to_string(), value);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn matches(spool: &Spool, query: &SpoolQuery) -> bool {
    if spool.archived && !query.allow_archived {
        return false;
    }
    if let Some(name) = query.name_filter() {
        if !spool
            .filament
            .name
            .to_lowercase()
            .contains(&name.to_lowercase())
        {
            return false;
        }
    }
    if let Some(location) = &query.location {
        if &spool.location != location {
            return false;
        }
    }
    if let Some(material) = &query.material {
        if !spool.filament.material.eq_ignore_ascii_case(material) {
            return false;
        }
    }
    if let Some(vendor) = &query.vendor {
        if !spool.vendor_name().eq_ignore_ascii_case(vendor) {
            return false;
        }
    }
    if let Some(color) = &query.color_hex {
        let have = spool.filament.color_hex.as_deref().unwrap_or("");
        if !have.trim_start_matches('#').eq_ignore_ascii_case(color.trim_start_matches('#')) {
            return false;
        }
    }
    true
}

impl Inventory for MemoryInventory {
    fn find_spools(&self, query: &SpoolQuery) -> InventoryResult<Vec<Spool>> {
        let state = self.lock();
        Ok(state
            .spools
            .values()
            .filter(|spool| matches(spool, query))
            .cloned()
            .collect())
    }

    fn get_spool(&self, id: SpoolId) -> InventoryResult<Spool> {
        self.lock()
            .spools
            .get(&id)
            .cloned()
            .ok_or(InventoryError::SpoolNotFound(id))
    }

    fn set_spool_location(&self, id: SpoolId, location: &str) -> InventoryResult<()> {
        let mut state = self.lock();
        if state.failing_locations.contains(&id) {
            return Err(InventoryError::Api {
                status: 500,
                body: format!("location update for spool #{id} rejected"),
            });
        }
        let spool = state
            .spools
            .get_mut(&id)
            .ok_or(InventoryError::SpoolNotFound(id))?;
        spool.location = location.to_string();
        debug!(spool = id, %location, "memory location updated");
        Ok(())
    }

    fn use_filament(&self, id: SpoolId, amount: f64) -> InventoryResult<()> {
        let mut state = self.lock();
        let spool = state
            .spools
            .get_mut(&id)
            .ok_or(InventoryError::SpoolNotFound(id))?;
        spool.remaining_weight = (spool.remaining_weight - amount).max(0.0);
        spool.used_weight += amount;
        spool.last_used = Some(chrono::Utc::now());
        Ok(())
    }

    fn get_setting(&self, key: &str) -> InventoryResult<Option<serde_json::Value>> {
        Ok(self.lock().settings.get(key).cloned())
    }

    fn put_setting(&self, key: &str, json_text: &str) -> InventoryResult<()> {
        self.lock().settings.insert(
            key.to_string(),
            serde_json::Value::String(json_text.to_string()),
        );
        Ok(())
    }
}
