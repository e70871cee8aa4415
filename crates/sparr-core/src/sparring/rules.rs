//! Hit points, scoring and the offline fallbacks.

use rand::seq::SliceRandom;

use super::model::{OptionKind, SparringLevel, SparringOption, SparringRound, SparringTopic};

/// Hit points each side starts a level with unless the level says otherwise.
pub const BASE_HP: u32 = 100;
/// Opponent hit points from [`STUBBORN_FROM_LEVEL`] on.
pub const STUBBORN_OPPONENT_HP: u32 = 120;
/// Player hit points from [`TIRED_FROM_LEVEL`] on.
pub const TIRED_PLAYER_HP: u32 = 80;
pub const STUBBORN_FROM_LEVEL: u32 = 4;
pub const TIRED_FROM_LEVEL: u32 = 7;

/// Upper bound for a single hit, whatever the referee claims.
pub const MAX_DAMAGE: u32 = 50;
/// Rounds prepared per level.
pub const ROUNDS_PER_LEVEL: usize = 5;
/// Score for clearing a level.
pub const LEVEL_SCORE: u32 = 100;

const AVATARS: [&str; 10] = ["💥", "😠", "😤", "😑", "😏", "🧊", "🧠", "🦊", "🪨", "🔥"];
const FALLBACK_AVATAR: &str = "🤖";

/// `(player, opponent)` hit points for endless level `level_number`.
pub fn initial_hp(level_number: u32) -> (u32, u32) {
    let player = if level_number >= TIRED_FROM_LEVEL {
        TIRED_PLAYER_HP
    } else {
        BASE_HP
    };
    let opponent = if level_number >= STUBBORN_FROM_LEVEL {
        STUBBORN_OPPONENT_HP
    } else {
        BASE_HP
    };
    (player, opponent)
}

pub fn random_avatar() -> String {
    AVATARS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_AVATAR)
        .to_string()
}

/// Level built from the topic alone, for when the referee is unavailable.
pub fn fallback_level(topic: &SparringTopic, level_number: u32) -> SparringLevel {
    let (player, opponent) = initial_hp(level_number);
    let name = non_blank(&topic.title, "Opponent");
    SparringLevel {
        id: "fallback".to_string(),
        title: format!("Level {level_number}: {name}"),
        opponent_name: name.clone(),
        opponent_role: non_blank(&topic.description, "Opponent"),
        attack_style: "Lecturing and pushy".to_string(),
        weakness: "Calm facts and clear boundaries".to_string(),
        win_condition: "Stay factual and end the exchange on your own terms".to_string(),
        difficulty_prompt: "Be persistent and convinced you are right, without turning aggressive."
            .to_string(),
        initial_player_hp: player,
        initial_opponent_hp: opponent,
        avatar: FALLBACK_AVATAR.to_string(),
    }
}

/// Fixed round with one option of every kind.
pub fn fallback_round(level: &SparringLevel) -> SparringRound {
    SparringRound {
        context: "A pushy conversation partner challenges you in an everyday situation, \
                  and you notice them pressing their own agenda."
            .to_string(),
        attack: format!(
            "{}: 'This makes no sense, why are you pushing this?'",
            level.opponent_name
        ),
        options: vec![
            option(
                "Ok, maybe you are right, I'll drop it.",
                25,
                0,
                "You gave up too easily.",
                OptionKind::CriticalFail,
            ),
            option(
                "Let's take this later.",
                12,
                0,
                "Vague and stalling.",
                OptionKind::Weak,
            ),
            option(
                "I hear you, but the fact is that we agreed on this.",
                0,
                12,
                "Clear boundary.",
                OptionKind::Good,
            ),
            option(
                "I'm sticking to the agreement: we do it this way, full stop.",
                0,
                24,
                "Precise and steady.",
                OptionKind::CriticalHit,
            ),
        ],
    }
}

const FALLBACK_SCENES: [&str; 5] = [
    "Family visit: your uncle takes the floor at the dinner table and everyone listens while \
     he makes a point about politics.",
    "The work canteen: a colleague comments loudly while several people around you follow along.",
    "The gym: an acquaintance starts small talk and wants to tell you how things ought to be done.",
    "A group chat: someone throws in a pointed remark and expects an answer from you.",
    "The taxi queue: a stranger wants to discuss the topic and keeps pressing while you wait.",
];

/// `count` fallback rounds, each in a different setting.
pub fn fallback_rounds(level: &SparringLevel, count: usize) -> Vec<SparringRound> {
    (0..count)
        .map(|i| SparringRound {
            context: FALLBACK_SCENES[i % FALLBACK_SCENES.len()].to_string(),
            ..fallback_round(level)
        })
        .collect()
}

fn option(
    text: &str,
    damage_user: u32,
    damage_opponent: u32,
    feedback: &str,
    kind: OptionKind,
) -> SparringOption {
    SparringOption {
        text: text.to_string(),
        damage_user,
        damage_opponent,
        feedback: feedback.to_string(),
        kind,
    }
}

fn non_blank(value: &str, default: &str) -> String {
    let value = value.trim();
    let chosen = if value.is_empty() { default } else { value };
    chosen.to_string()
}
