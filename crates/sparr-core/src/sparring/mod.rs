//! Verbal sparring: a quick-fire game against referee-designed opponents.
//!
//! - `model`: topics, levels, rounds and the fixed gaslighting ladder
//! - `rules`: hit points, scoring and offline fallbacks
//! - `referee`: parsing of the referee agent's JSON answers
//! - `game`: the game state and its damage rules
//! - `session`: [`SparringSession`], which drives a game through the referee

mod game;
mod model;
mod referee;
mod rules;
mod session;

pub use game::{Exchange, SparringGame, SparringStatus};
pub use model::{
    LADDER_ID, LADDER_LEN, OptionKind, SparringLevel, SparringMode, SparringOption,
    SparringRound, SparringTopic, find_topic, ladder_level, sparring_topics,
};
pub use referee::{OPTIONS_PER_ROUND, parse_level, parse_rounds};
pub use rules::{
    BASE_HP, LEVEL_SCORE, MAX_DAMAGE, ROUNDS_PER_LEVEL, fallback_level, fallback_round,
    fallback_rounds, initial_hp,
};
pub use session::{LevelReport, SparringSession, Source};
