use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::rules::BASE_HP;

/// Theme of an endless sparring game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparringTopic {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
}

/// One opponent, either generated by the referee or from the fixed ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparringLevel {
    pub id: String,
    pub title: String,
    pub opponent_name: String,
    pub opponent_role: String,
    pub attack_style: String,
    pub weakness: String,
    pub win_condition: String,
    /// How the opponent should behave, handed to the referee for rounds.
    pub difficulty_prompt: String,
    pub initial_player_hp: u32,
    pub initial_opponent_hp: u32,
    pub avatar: String,
}

/// Quality of an answer, from worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OptionKind {
    CriticalFail,
    Weak,
    Good,
    CriticalHit,
}

/// An answer the player can pick, with what it costs each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparringOption {
    pub text: String,
    pub damage_user: u32,
    pub damage_opponent: u32,
    pub feedback: String,
    pub kind: OptionKind,
}

/// A scene, the opponent's line and the answers to choose from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparringRound {
    pub context: String,
    pub attack: String,
    pub options: Vec<SparringOption>,
}

impl SparringRound {
    /// Same round with its options in random order, so position says
    /// nothing about quality.
    pub fn shuffled(mut self) -> Self {
        self.options.shuffle(&mut rand::thread_rng());
        self
    }
}

/// Endless play on a topic, or the fixed gaslighting ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SparringMode {
    Endless(SparringTopic),
    Ladder,
}

impl SparringMode {
    /// Topic the referee writes rounds for.
    pub fn topic(&self) -> SparringTopic {
        match self {
            SparringMode::Endless(topic) => topic.clone(),
            SparringMode::Ladder => SparringTopic {
                id: LADDER_ID.to_string(),
                title: "Gaslighting".to_string(),
                description: "People who deny what happened and make you doubt yourself."
                    .to_string(),
                icon: "🌀".to_string(),
            },
        }
    }
}

/// Id that selects [`SparringMode::Ladder`].
pub const LADDER_ID: &str = "ladder";

const TOPICS: [(&str, &str, &str, &str); 3] = [
    (
        "know_it_all",
        "Political Know-It-All",
        "The uncle at the dinner table who knows best about everything.",
        "🗣️",
    ),
    (
        "canteen_critic",
        "Canteen Critic",
        "A colleague who always overrules your opinions at lunch.",
        "🍽️",
    ),
    (
        "gym_guru",
        "Gym Guru",
        "A gym acquaintance who lectures you about everything.",
        "🏋️",
    ),
];

/// Topics for endless games, in display order.
pub fn sparring_topics() -> Vec<SparringTopic> {
    TOPICS
        .iter()
        .map(|&(id, title, description, icon)| SparringTopic {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        })
        .collect()
}

pub fn find_topic(id: &str) -> Option<SparringTopic> {
    sparring_topics().into_iter().find(|topic| topic.id == id)
}

struct Rung {
    id: &'static str,
    title: &'static str,
    opponent_name: &'static str,
    opponent_role: &'static str,
    attack_style: &'static str,
    weakness: &'static str,
    win_condition: &'static str,
    difficulty_prompt: &'static str,
    avatar: &'static str,
}

const LADDER: [Rung; 3] = [
    Rung {
        id: "gaslight_1",
        title: "Level 1: The Forgetful Friend",
        opponent_name: "Jonas",
        opponent_role: "Friend",
        attack_style: "Denies facts ('I never said that')",
        weakness: "Calmly repeating the facts",
        win_condition: "Get Jonas to admit he is unsure or back down.",
        difficulty_prompt: "You are Jonas. You forgot an appointment but deny you ever made one. \
                            Say things like 'What? We never talked about that' or 'You remember \
                            it wrong'. Be confused, not aggressive.",
        avatar: "😑",
    },
    Rung {
        id: "gaslight_2",
        title: "Level 2: The Victim",
        opponent_name: "Silje",
        opponent_role: "Partner",
        attack_style: "Plays the victim ('You are so sensitive')",
        weakness: "Not taking the blame and staying on the issue",
        win_condition: "Get Silje to accept that her behaviour hurt you, without apologising.",
        difficulty_prompt: "You are Silje. When the user confronts you, get upset. Say 'God, you \
                            are so sensitive', 'I was only joking', 'Why do you always have to \
                            make a drama?'.",
        avatar: "😏",
    },
    Rung {
        id: "gaslight_3",
        title: "Level 3: The Reality Twister (BOSS)",
        opponent_name: "Erik",
        opponent_role: "Boss",
        attack_style: "Aggressive denial and counter-attack",
        weakness: "Grey rocking: boring, short, factual",
        win_condition: "End the conversation without getting emotional or giving in.",
        difficulty_prompt: "You are Erik, a narcissistic boss. You made a mistake but blame the \
                            user. Be arrogant. 'This is your fault', 'You are incompetent', 'I \
                            remember exactly what happened, and you are lying'.",
        avatar: "😤",
    },
];

/// Number of levels on the gaslighting ladder.
pub const LADDER_LEN: usize = LADDER.len();

/// Ladder level `number` (1-based).
pub fn ladder_level(number: u32) -> Option<SparringLevel> {
    let rung = LADDER.get((number as usize).checked_sub(1)?)?;
    Some(SparringLevel {
        id: rung.id.to_string(),
        title: rung.title.to_string(),
        opponent_name: rung.opponent_name.to_string(),
        opponent_role: rung.opponent_role.to_string(),
        attack_style: rung.attack_style.to_string(),
        weakness: rung.weakness.to_string(),
        win_condition: rung.win_condition.to_string(),
        difficulty_prompt: rung.difficulty_prompt.to_string(),
        initial_player_hp: BASE_HP,
        initial_opponent_hp: BASE_HP,
        avatar: rung.avatar.to_string(),
    })
}
