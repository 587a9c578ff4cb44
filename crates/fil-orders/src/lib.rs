//! fil-orders: per-location spool ordering.
//!
//! Each location keeps an ordered list of spool ids (left-to-right bay
//! order, shelf order). The whole map lives in one settings entry of the
//! inventory service and is loaded fresh by every command.
//!
//! # Persisted format
//!
//! ```text
//! setting "locations_spoolorders"
//!   value: "{\"AMS A\":[5,9],\"Shelf 6B\":[3],\"\":[]}"
//!           └── JSON text of { location: [spool id, ..] }
//! ```
//!
//! A spool id appears in at most one list. Callers restore this with
//! [`LocationOrders::remove_everywhere`] before every insert.

pub mod error;
pub mod store;

pub use error::{OrderError, OrderResult};
pub use store::{LocationOrders, ORDERS_SETTING_KEY, clamp_position, insert_clamped, load, save};
