//! Scenario domain module.
//!
//! - `model`: preparation input, difficulty and scenario options
//! - `planner`: parsing of the planner agent's JSON answer
//! - `catalog`: prebuilt scenarios that skip planning
//! - `feedback`: the cached feedback result

mod catalog;
mod feedback;
mod model;
mod planner;

pub use catalog::{PrebuiltScenario, find_prebuilt, prebuilt_scenarios};
pub use feedback::FeedbackResult;
pub use model::{Difficulty, PreparationInput, ScenarioOption};
pub use planner::{SCENARIO_OPTION_COUNT, parse_scenario_options};
pub(crate) use planner::json_object_slice;
