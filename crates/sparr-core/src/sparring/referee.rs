//! Parsing of the referee agent's answers.

use std::str::FromStr;

use serde::Deserialize;

use super::model::{OptionKind, SparringLevel, SparringOption, SparringRound, SparringTopic};
use super::rules::{MAX_DAMAGE, initial_hp, random_avatar};
use crate::error::AgentCallError;
use crate::scenario::json_object_slice;

/// Options every round must offer.
pub const OPTIONS_PER_ROUND: usize = 4;

#[derive(Deserialize, Default)]
#[serde(default)]
struct LevelPayload {
    opponent_name: Option<String>,
    opponent_role: Option<String>,
    attack_style: Option<String>,
    weakness: Option<String>,
    win_condition: Option<String>,
    difficulty_prompt: Option<String>,
}

#[derive(Deserialize)]
struct RoundsPayload {
    rounds: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawRound {
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    attack: Option<String>,
    #[serde(default)]
    options: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawOption {
    text: String,
    damage_user: u32,
    damage_opponent: u32,
    feedback: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Builds endless level `level_number` of `topic` from the referee's JSON.
///
/// Missing fields get neutral defaults; hit points always follow
/// [`initial_hp`], never the reply.
pub fn parse_level(
    raw: &str,
    topic: &SparringTopic,
    level_number: u32,
) -> Result<SparringLevel, AgentCallError> {
    let candidate = json_object_slice(raw)
        .ok_or_else(|| AgentCallError::Malformed("referee level contains no JSON object".into()))?;
    let payload: LevelPayload = serde_json::from_str(candidate)
        .map_err(|e| AgentCallError::Malformed(format!("referee level JSON invalid: {e}")))?;

    let opponent_role = or_default(payload.opponent_role, "Opponent");
    let (player, opponent) = initial_hp(level_number);
    Ok(SparringLevel {
        id: format!("{}_lvl_{level_number}", topic.id),
        title: format!("Level {level_number}: {opponent_role}"),
        opponent_name: or_default(payload.opponent_name, "Opponent"),
        opponent_role,
        attack_style: or_default(payload.attack_style, "Pushy and demanding"),
        weakness: or_default(payload.weakness, "Calm facts"),
        win_condition: or_default(payload.win_condition, "Keep calm and set boundaries"),
        difficulty_prompt: or_default(
            payload.difficulty_prompt,
            "Be direct, pushy and test the player's boundaries.",
        ),
        initial_player_hp: player,
        initial_opponent_hp: opponent,
        avatar: random_avatar(),
    })
}

/// Extracts up to `count` playable rounds from the referee's JSON.
///
/// A round is playable when exactly [`OPTIONS_PER_ROUND`] of its options
/// carry text, feedback, both damages and a known kind. Damage above
/// [`MAX_DAMAGE`] is capped. A reply without a single playable round is
/// malformed.
pub fn parse_rounds(raw: &str, count: usize) -> Result<Vec<SparringRound>, AgentCallError> {
    let candidate = json_object_slice(raw)
        .ok_or_else(|| AgentCallError::Malformed("referee rounds contain no JSON object".into()))?;
    let payload: RoundsPayload = serde_json::from_str(candidate)
        .map_err(|e| AgentCallError::Malformed(format!("referee rounds JSON invalid: {e}")))?;

    let rounds: Vec<SparringRound> = payload
        .rounds
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawRound>(value).ok())
        .filter_map(playable_round)
        .take(count)
        .collect();

    if rounds.is_empty() {
        return Err(AgentCallError::Malformed(
            "referee produced no playable round".into(),
        ));
    }
    Ok(rounds)
}

fn playable_round(raw: RawRound) -> Option<SparringRound> {
    let options: Vec<SparringOption> = raw
        .options
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawOption>(value).ok())
        .filter_map(valid_option)
        .collect();
    if options.len() != OPTIONS_PER_ROUND {
        return None;
    }
    Some(SparringRound {
        context: or_default(raw.context, "The opponent wants to test you further."),
        attack: or_default(raw.attack, "That doesn't hold up. What are you really thinking?"),
        options,
    })
}

fn valid_option(raw: RawOption) -> Option<SparringOption> {
    let kind = OptionKind::from_str(raw.kind.trim()).ok()?;
    let text = raw.text.trim();
    if text.is_empty() {
        return None;
    }
    Some(SparringOption {
        text: text.to_string(),
        damage_user: raw.damage_user.min(MAX_DAMAGE),
        damage_opponent: raw.damage_opponent.min(MAX_DAMAGE),
        feedback: raw.feedback.trim().to_string(),
        kind,
    })
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
