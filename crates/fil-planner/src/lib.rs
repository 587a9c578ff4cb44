//! fil-planner: get a printer ready for the next plate.
//!
//! Planning is greedy and covers one plate at a time.
//!
//! # Flow
//!
//! ```text
//! enumerate_candidates   every pending plate → swap cost + readiness
//!        │ recommend
//!        ▼
//! SwapSession::advance   per requirement:
//!   loaded? ── enough ──────────────► AlreadyLoaded
//!      │ short ─► ConfirmRestage ─┐
//!      ▼                          │
//!   select_load_candidate ─► ConfirmCrossPrinter (other printer's slot)
//!      ▼                          │
//!   choose_slot ◄─────────────────┘
//!      ├── Free  ───────────────────────────► ConfirmLoad ─► Loaded
//!      └── Evict ─► EvictDestination ─► Evicted ─► ConfirmLoad
//! ```
//!
//! The session never prompts. It returns a [`Decision`] and resumes on
//! the caller's [`Answer`], so terminal, scripted and test drivers all
//! share one code path.

pub mod candidates;
pub mod check;
pub mod error;
pub mod selection;
pub mod session;

pub use candidates::{PlateCandidate, enumerate_candidates, is_ready, recommend, swap_cost};
pub use check::{CheckReport, NeedKey, NeedStatus, NeedTotal, ZeroAmountNeed, check_plans};
pub use error::{PlannerError, PlannerResult};
pub use selection::{NeededKinds, SlotChoice, SlotView, choose_slot, needed_kinds, replacement_for, select_load_candidate};
pub use session::{Answer, Decision, Step, SwapEvent, SwapReport, SwapSession, run_with};
