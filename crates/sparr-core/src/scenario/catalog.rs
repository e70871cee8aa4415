//! Ready-made scenarios that skip the planning step.

use super::model::{Difficulty, PreparationInput, ScenarioOption};

/// A catalogue entry: the preparation it implies plus the scenario itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrebuiltScenario {
    pub id: &'static str,
    pub preparation: PreparationInput,
    pub option: ScenarioOption,
}

struct Entry {
    id: &'static str,
    title: &'static str,
    summary: &'static str,
    role: &'static str,
    situation: &'static str,
    goal: &'static str,
    instructions: &'static str,
    opponent: &'static str,
}

const ENTRIES: [Entry; 3] = [
    Entry {
        id: "steamroller",
        title: "The Steamroller",
        summary: "A colleague who interrupts and talks over you in meetings.",
        role: "Project member",
        situation: "You are in a planning meeting. Every time you try to present your proposal, \
                    Reidar cuts in with his own opinions and will not let you finish.",
        goal: "Present your proposal in full and make clear you do not want to be interrupted, \
               without becoming aggressive.",
        instructions: "You are impatient and loud. Interrupt the user whenever they hesitate. \
                       Be convinced your own solution is the best one.",
        opponent: "Reidar",
    },
    Entry {
        id: "silent_wall",
        title: "The Silent Wall",
        summary: "A team member who gives no response and takes no initiative.",
        role: "Team lead",
        situation: "You have a follow-up meeting with Ingrid. She delivers decently but says \
                    nothing in meetings and seems disengaged. You need her to take more ownership.",
        goal: "Get Ingrid to open up about what she thinks and commit to contributing more \
               in meetings.",
        instructions: "Be evasive. Answer in single words ('yes', 'no', 'don't know'). Be passive \
                       but not hostile. Make the user work to get you talking.",
        opponent: "Ingrid",
    },
    Entry {
        id: "guilt_tripper",
        title: "The Guilt Tripper",
        summary: "A neighbour who uses guilt to get their way.",
        role: "Neighbour",
        situation: "Your neighbour Leif asks you to water his plants during his holiday for the \
                    third time this year. This week is very inconvenient for you.",
        goal: "Say no in a friendly but firm way without being manipulated by his \
               'poor me' stories.",
        instructions: "Play the victim. Use phrases like 'I thought we were friends', 'I have \
                       nobody else' and 'Typical, I always end up alone with my problems'.",
        opponent: "Leif",
    },
];

/// All catalogue entries, in display order.
pub fn prebuilt_scenarios() -> Vec<PrebuiltScenario> {
    ENTRIES
        .iter()
        .map(|entry| PrebuiltScenario {
            id: entry.id,
            preparation: PreparationInput {
                role: entry.role.to_string(),
                situation: entry.situation.to_string(),
                goal: entry.goal.to_string(),
                difficulty: Difficulty::Medium,
            },
            option: ScenarioOption {
                title: entry.title.to_string(),
                summary: entry.summary.to_string(),
                focus: entry.goal.to_string(),
                agent_instructions: entry.instructions.to_string(),
                opponent_name: Some(entry.opponent.to_string()),
            },
        })
        .collect()
}

/// Looks an entry up by id.
pub fn find_prebuilt(id: &str) -> Option<PrebuiltScenario> {
    prebuilt_scenarios().into_iter().find(|s| s.id == id)
}
