//! Destination tokens: `location[:slot]` / `location[@slot]`.

use std::collections::HashMap;
use std::fmt;

use crate::types::EMPTY_LOCATION_LABEL;

/// Separators that may introduce a slot position.
const POSITION_SEPARATORS: [char; 2] = [':', '@'];

/// Case-insensitive location alias lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    by_upper: HashMap<String, String>,
}

impl AliasTable {
    pub fn new<'a>(aliases: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        Self {
            by_upper: aliases
                .into_iter()
                .map(|(alias, location)| (alias.to_uppercase(), location.clone()))
                .collect(),
        }
    }

    /// Resolve an alias; unknown names pass through unchanged.
    pub fn resolve(&self, name: &str) -> String {
        self.by_upper
            .get(&name.to_uppercase())
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Resolve a bare location name, mapping the `<empty>` sentinel and
    /// blank input to the empty location.
    pub fn resolve_location(&self, name: &str) -> String {
        let name = name.trim();
        if is_no_location(name) {
            String::new()
        } else {
            self.resolve(name)
        }
    }
}

/// A parsed destination: a location plus an optional 1-based position.
///
/// `position == None` means "append". Positions outside the list are
/// clamped at insert time, so zero or negative values are kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestSpec {
    pub location: String,
    pub position: Option<i64>,
}

impl DestSpec {
    pub fn new(location: impl Into<String>, position: Option<i64>) -> Self {
        Self {
            location: location.into(),
            position,
        }
    }

    /// The "no location" destination.
    pub fn nowhere() -> Self {
        Self::default()
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    /// Parse a destination token, resolving aliases on the location part.
    pub fn parse(input: &str, aliases: &AliasTable) -> Self {
        let input = input.trim();
        if is_no_location(input) {
            return Self::nowhere();
        }

        let Some(idx) = input.rfind(POSITION_SEPARATORS) else {
            return Self::new(aliases.resolve(input), None);
        };
        // Leading separator or nothing after it: the separator is part of the name.
        if idx == 0 || idx == input.len() - 1 {
            return Self::new(aliases.resolve(input), None);
        }

        let location_part = input[..idx].trim();
        let position_part = input[idx + 1..].trim();

        match position_part.parse::<i64>() {
            Ok(position) => {
                let location = if is_no_location(location_part) {
                    String::new()
                } else {
                    aliases.resolve(location_part)
                };
                Self::new(location, Some(position))
            }
            Err(_) => Self::new(aliases.resolve(input), None),
        }
    }
}

fn is_no_location(token: &str) -> bool {
    token.is_empty() || token.eq_ignore_ascii_case(EMPTY_LOCATION_LABEL)
}

impl fmt::Display for DestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = crate::types::location_label(&self.location);
        match self.position {
            Some(position) => write!(f, "{label}:{position}"),
            None => write!(f, "{label}"),
        }
    }
}
