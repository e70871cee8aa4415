//! Stage state machine.
//!
//! - `model`: the [`Stage`] enum
//! - `action`: user actions, outcomes and per-stage views
//! - `context`: [`SessionContext`], the mutable state of one run
//! - `controller`: [`StageController`], which enforces the transitions

mod action;
mod context;
mod controller;
mod model;

pub use action::{ActionOutcome, StageView, UserAction};
pub use context::SessionContext;
pub use controller::StageController;
pub use model::Stage;
