//! fil-move: relocate spools.
//!
//! A move updates two things: the spool's declared location in the
//! inventory service and the location order lists. The executor keeps
//! them in step for a batch of moves:
//!
//! ```text
//! MoveExecutor::run
//!   ├── resolve   selector → spool id (search, chooser on ambiguity)
//!   ├── parse     destination token → DestSpec
//!   ├── apply     remove_everywhere + insert on a copy of the orders
//!   └── commit    save orders, then set each spool's location
//! ```
//!
//! Cancelling a chooser aborts the batch before anything is written.
//! After the orders are saved, location updates are independent: one
//! failure is reported and the rest still go through.

pub mod error;
pub mod executor;
pub mod report;

pub use error::{MoveError, MoveResult};
pub use executor::{Choice, MoveExecutor, MoveOptions, MoveRequest, SpoolChooser};
pub use report::{MoveFailure, MoveReport, OrderChange, PlannedMove};
