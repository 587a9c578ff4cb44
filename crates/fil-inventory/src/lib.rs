//! fil-inventory: the inventory collaborator.
//!
//! Everything the core needs from the spool inventory service goes
//! through the [`Inventory`] trait: spool lookup, declared-location
//! updates, usage recording, and the generic settings store that holds
//! the per-location order lists.
//!
//! # Backends
//!
//! ```text
//! Inventory
//!   ├── SpoolmanClient  (blocking HTTP against /api/v1)
//!   └── MemoryInventory (in-process, for tests and offline runs)
//! ```

pub mod client;
pub mod error;
pub mod memory;

pub use client::SpoolmanClient;
pub use error::{InventoryError, InventoryResult};
pub use memory::MemoryInventory;

use fil_core::{Spool, SpoolId};

/// Typed spool filter.
///
/// `name` of `None` or `"*"` matches every spool. Archived spools are
/// excluded unless `allow_archived` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpoolQuery {
    pub name: Option<String>,
    pub location: Option<String>,
    pub material: Option<String>,
    pub vendor: Option<String>,
    pub color_hex: Option<String>,
    pub allow_archived: bool,
}

impl SpoolQuery {
    /// Every non-archived spool.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn in_location(mut self, location: Option<&str>) -> Self {
        self.location = location.map(str::to_string);
        self
    }

    /// Name filter with the `*` wildcard folded away.
    pub fn name_filter(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "*")
    }
}

/// Operations the core consumes from the inventory service.
pub trait Inventory {
    fn find_spools(&self, query: &SpoolQuery) -> InventoryResult<Vec<Spool>>;

    /// Fails with [`InventoryError::SpoolNotFound`] for unknown ids.
    fn get_spool(&self, id: SpoolId) -> InventoryResult<Spool>;

    /// Set a spool's declared location. The empty string clears it.
    fn set_spool_location(&self, id: SpoolId, location: &str) -> InventoryResult<()>;

    /// Record `amount` grams of usage against a spool.
    fn use_filament(&self, id: SpoolId, amount: f64) -> InventoryResult<()>;

    /// Raw `value` of a settings entry, or `None` when the key is unset.
    ///
    /// Object settings arrive as a JSON string holding the serialized
    /// object, so callers decode twice.
    fn get_setting(&self, key: &str) -> InventoryResult<Option<serde_json::Value>>;

    /// Overwrite a settings entry with already-serialized JSON text.
    fn put_setting(&self, key: &str, json_text: &str) -> InventoryResult<()>;
}
