//! LocationOrders: the order map and its settings-store round trip.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fil_core::SpoolId;
use fil_inventory::Inventory;

use crate::error::{OrderError, OrderResult};

/// Settings key holding the serialized order map.
pub const ORDERS_SETTING_KEY: &str = "locations_spoolorders";

/// Location name → ordered spool ids. The empty location name is allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationOrders(BTreeMap<String, Vec<SpoolId>>);

impl LocationOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The list for `location`; empty when the location has none yet.
    pub fn get(&self, location: &str) -> &[SpoolId] {
        self.0.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SpoolId])> {
        self.0.iter().map(|(loc, ids)| (loc.as_str(), ids.as_slice()))
    }

    /// Drop every occurrence of `id` from every list. Emptied lists stay
    /// in the map. Returns true if anything was removed.
    pub fn remove_everywhere(&mut self, id: SpoolId) -> bool {
        let mut removed = false;
        for ids in self.0.values_mut() {
            let before = ids.len();
            ids.retain(|&other| other != id);
            removed |= ids.len() != before;
        }
        removed
    }

    /// Insert `id` into `location`'s list at the 1-based `position`
    /// (clamped), or append when `position` is `None`. The list is created
    /// on first insert. Returns the 0-based index used.
    ///
    /// Does not remove `id` from other lists; see [`Self::place`].
    pub fn insert(&mut self, location: &str, id: SpoolId, position: Option<i64>) -> usize {
        let ids = self.0.entry(location.to_string()).or_default();
        insert_clamped(ids, id, position)
    }

    /// `remove_everywhere` followed by `insert`.
    pub fn place(&mut self, location: &str, id: SpoolId, position: Option<i64>) -> usize {
        self.remove_everywhere(id);
        self.insert(location, id, position)
    }

    /// First location listing `id` and its 0-based index there.
    pub fn position_of(&self, id: SpoolId) -> Option<(&str, usize)> {
        self.0.iter().find_map(|(loc, ids)| {
            ids.iter()
                .position(|&other| other == id)
                .map(|index| (loc.as_str(), index))
        })
    }

    /// Every location whose list contains `id`.
    pub fn locations_containing(&self, id: SpoolId) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(loc, _)| loc.as_str())
            .collect()
    }
}

impl FromIterator<(String, Vec<SpoolId>)> for LocationOrders {
    fn from_iter<I: IntoIterator<Item = (String, Vec<SpoolId>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Clamp a 1-based position into `[1, len + 1]`.
pub fn clamp_position(position: i64, len: usize) -> usize {
    let upper = len as i64 + 1;
    position.clamp(1, upper) as usize
}

/// Insert `id` at the 1-based `position` (clamped) or append. Entries
/// after the insertion point shift right. Returns the 0-based index.
pub fn insert_clamped(ids: &mut Vec<SpoolId>, id: SpoolId, position: Option<i64>) -> usize {
    let index = match position {
        Some(pos) => clamp_position(pos, ids.len()) - 1,
        None => ids.len(),
    };
    ids.insert(index, id);
    index
}

/// Fetch the current order map. An absent, null or blank setting is an
/// empty map; anything that does not decode is an error.
pub fn load(inventory: &dyn Inventory) -> OrderResult<LocationOrders> {
    let value = inventory.get_setting(ORDERS_SETTING_KEY)?;
    let orders = match value {
        None | Some(serde_json::Value::Null) => LocationOrders::new(),
        Some(serde_json::Value::String(text)) if text.trim().is_empty() => LocationOrders::new(),
        Some(serde_json::Value::String(text)) => {
            serde_json::from_str(&text).map_err(|source| OrderError::Malformed {
                key: ORDERS_SETTING_KEY.to_string(),
                source,
            })?
        }
        Some(object @ serde_json::Value::Object(_)) => {
            serde_json::from_value(object).map_err(|source| OrderError::Malformed {
                key: ORDERS_SETTING_KEY.to_string(),
                source,
            })?
        }
        Some(other) => {
            return Err(OrderError::UnexpectedValue {
                key: ORDERS_SETTING_KEY.to_string(),
                found: other.to_string(),
            });
        }
    };
    debug!(locations = orders.0.len(), "order map loaded");
    Ok(orders)
}

/// Overwrite the stored order map with `orders`.
pub fn save(inventory: &dyn Inventory, orders: &LocationOrders) -> OrderResult<()> {
    let text = serde_json::to_string(orders).map_err(OrderError::Serialize)?;
    inventory.put_setting(ORDERS_SETTING_KEY, &text)?;
    debug!(locations = orders.0.len(), "order map saved");
    Ok(())
}
