pub mod config;
pub mod dest;
pub mod plan;
pub mod types;

pub use config::{ConfigError, FilConfig};
pub use dest::{AliasTable, DestSpec};
pub use plan::{DiscoveredPlan, PlanError, PlanFile, Plate, Project, Requirement, Status, discover_plans};
pub use types::*;
