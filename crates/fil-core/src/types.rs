//! Shared inventory types used across fil crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spool identifier as assigned by the inventory service.
pub type SpoolId = u32;

/// Filament (material-kind) identifier.
pub type FilamentId = u32;

/// Location name. The empty string means "no location".
pub type Location = String;

/// Display label for the "no location" sentinel.
pub const EMPTY_LOCATION_LABEL: &str = "<empty>";

/// A filament definition shared by every spool of the same kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filament {
    pub id: FilamentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub color_hex: Option<String>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

/// A single physical spool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spool {
    pub id: SpoolId,
    pub filament: Filament,
    /// Remaining material in grams.
    #[serde(default)]
    pub remaining_weight: f64,
    /// Material consumed so far in grams.
    #[serde(default)]
    pub used_weight: f64,
    /// Declared location; empty when unassigned.
    #[serde(default)]
    pub location: Location,
    /// `None` when the spool has never been used.
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Spool {
    pub fn filament_id(&self) -> FilamentId {
        self.filament.id
    }

    /// True when any material has been consumed from this spool.
    pub fn is_used(&self) -> bool {
        self.used_weight > 0.0
    }

    pub fn vendor_name(&self) -> &str {
        self.filament
            .vendor
            .as_ref()
            .map(|v| v.name.as_str())
            .unwrap_or("")
    }
}

impl fmt::Display for Spool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ", self.id)?;
        let vendor = self.vendor_name();
        if !vendor.is_empty() {
            write!(f, "{vendor} ")?;
        }
        write!(f, "{}", self.filament.name)?;
        if !self.filament.material.is_empty() {
            write!(f, " ({})", self.filament.material)?;
        }
        write!(
            f,
            " - {:.1}g remaining @ {}",
            self.remaining_weight,
            location_label(&self.location)
        )?;
        if self.archived {
            write!(f, " (archived)")?;
        }
        Ok(())
    }
}

/// Human label for a location, rendering the empty location as `<empty>`.
pub fn location_label(location: &str) -> &str {
    if location.is_empty() {
        EMPTY_LOCATION_LABEL
    } else {
        location
    }
}
