//! Prompt rendering for every agent call.
//!
//! Templates live in `prompts/*.md.jinja` and are compiled into the binary.
//! Each [`InputPurpose`] maps to a system template and the content of the
//! final user message.

use minijinja::{Environment, Value as MJValue};
use serde::Serialize;
use sparr_core::agent::{AgentInput, InputPurpose};
use sparr_core::scenario::SCENARIO_OPTION_COUNT;
use thiserror::Error;

const TEMPLATES: &[(&str, &str)] = &[
    ("plan", include_str!("../prompts/plan.md.jinja")),
    ("scenario", include_str!("../prompts/scenario.md.jinja")),
    ("opening_task", include_str!("../prompts/opening_task.md.jinja")),
    ("feedback", include_str!("../prompts/feedback.md.jinja")),
    ("reflection", include_str!("../prompts/reflection.md.jinja")),
    (
        "reflection_opening_task",
        include_str!("../prompts/reflection_opening_task.md.jinja"),
    ),
    ("referee_level", include_str!("../prompts/referee_level.md.jinja")),
    ("referee_rounds", include_str!("../prompts/referee_rounds.md.jinja")),
];

/// Name used for the counterpart when the scenario does not give one.
const DEFAULT_OPPONENT: &str = "the counterpart";

const PLAN_REQUEST: &str = "Create the scenarios now.";
const LEVEL_REQUEST: &str = "Design the opponent now.";
const ROUNDS_REQUEST: &str = "Generate the rounds now.";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Template '{name}' failed: {source}")]
    Render {
        name: &'static str,
        #[source]
        source: minijinja::Error,
    },
    #[error("A scenario prompt needs a selected scenario")]
    MissingScenario,
    #[error("A sparring prompt needs a referee brief")]
    MissingReferee,
}

/// System prompt and final user message for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Serialize)]
struct ProfileEntry {
    name: &'static str,
    value: String,
}

/// Flat view of an [`AgentInput`] the templates render from.
#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    role: &'a str,
    situation: &'a str,
    goal: &'a str,
    difficulty: String,
    option_count: usize,
    title: &'a str,
    summary: &'a str,
    focus: &'a str,
    instructions: &'a str,
    opponent: &'a str,
    profile: Vec<ProfileEntry>,
    scenario_skipped: bool,
    topic_title: &'a str,
    topic_description: &'a str,
    level_number: u32,
    round_count: usize,
    opponent_name: &'a str,
    opponent_role: &'a str,
    attack_style: &'a str,
    weakness: &'a str,
    win_condition: &'a str,
    difficulty_prompt: &'a str,
}

impl<'a> PromptContext<'a> {
    fn from_input(input: &'a AgentInput) -> Self {
        let preparation = input.preparation.as_ref();
        let scenario = input.scenario.as_ref();
        let referee = input.referee.as_ref();
        let level = referee.and_then(|r| r.level.as_ref());
        let profile = input
            .parameters
            .map(|p| {
                let [p1, p2, p3, p4, p5] = p.values();
                vec![
                    entry("p1 (reserved)", p1),
                    entry("p2 confrontation intensity", p2),
                    entry("p3 (reserved)", p3),
                    entry("p4 (reserved)", p4),
                    entry("p5 (reserved)", p5),
                ]
            })
            .unwrap_or_default();

        Self {
            role: preparation.map_or("", |p| p.role.as_str()),
            situation: preparation.map_or("", |p| p.situation.as_str()),
            goal: preparation.map_or("", |p| p.goal.as_str()),
            difficulty: input.difficulty.to_string(),
            option_count: SCENARIO_OPTION_COUNT,
            title: scenario.map_or("", |s| s.title.as_str()),
            summary: scenario.map_or("", |s| s.summary.as_str()),
            focus: scenario.map_or("", |s| s.focus.as_str()),
            instructions: input.instructions.as_str(),
            opponent: scenario
                .and_then(|s| s.opponent_name.as_deref())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(DEFAULT_OPPONENT),
            profile,
            scenario_skipped: input.scenario_skipped,
            topic_title: referee.map_or("", |r| r.topic.title.as_str()),
            topic_description: referee.map_or("", |r| r.topic.description.as_str()),
            level_number: referee.map_or(1, |r| r.level_number),
            round_count: referee.map_or(0, |r| r.round_count),
            opponent_name: level.map_or("", |l| l.opponent_name.as_str()),
            opponent_role: level.map_or("", |l| l.opponent_role.as_str()),
            attack_style: level.map_or("", |l| l.attack_style.as_str()),
            weakness: level.map_or("", |l| l.weakness.as_str()),
            win_condition: level.map_or("", |l| l.win_condition.as_str()),
            difficulty_prompt: level.map_or("", |l| l.difficulty_prompt.as_str()),
        }
    }
}

fn entry(name: &'static str, value: f64) -> ProfileEntry {
    ProfileEntry {
        name,
        value: format!("{value:.2}"),
    }
}

/// Renders prompts from the embedded templates.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for &(name, template) in TEMPLATES {
            env.add_template(name, template)
                .map_err(|source| PromptError::Render { name, source })?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, input: &AgentInput) -> Result<RenderedPrompt, PromptError> {
        let context = PromptContext::from_input(input);
        let value = MJValue::from_serialize(&context);

        let prompt = match input.purpose {
            InputPurpose::Plan => RenderedPrompt {
                system: self.render_template("plan", &value)?,
                user: PLAN_REQUEST.to_string(),
            },
            InputPurpose::OpeningLine => {
                require_scenario(input)?;
                RenderedPrompt {
                    system: self.render_template("scenario", &value)?,
                    user: self.render_template("opening_task", &value)?,
                }
            }
            InputPurpose::Turn => {
                require_scenario(input)?;
                RenderedPrompt {
                    system: self.render_template("scenario", &value)?,
                    user: input.user_message.clone(),
                }
            }
            InputPurpose::Feedback => RenderedPrompt {
                system: self.render_template("feedback", &value)?,
                user: input.user_message.clone(),
            },
            InputPurpose::ReflectionOpening => RenderedPrompt {
                system: self.render_template("reflection", &value)?,
                user: self.render_template("reflection_opening_task", &value)?,
            },
            InputPurpose::ReflectionTurn => RenderedPrompt {
                system: self.render_template("reflection", &value)?,
                user: input.user_message.clone(),
            },
            InputPurpose::SparringLevel => {
                require_referee(input, false)?;
                RenderedPrompt {
                    system: self.render_template("referee_level", &value)?,
                    user: LEVEL_REQUEST.to_string(),
                }
            }
            InputPurpose::SparringRounds => {
                require_referee(input, true)?;
                RenderedPrompt {
                    system: self.render_template("referee_rounds", &value)?,
                    user: ROUNDS_REQUEST.to_string(),
                }
            }
        };
        Ok(prompt)
    }

    fn render_template(&self, name: &'static str, value: &MJValue) -> Result<String, PromptError> {
        let rendered = self
            .env
            .get_template(name)
            .and_then(|template| template.render(value))
            .map_err(|source| PromptError::Render { name, source })?;
        Ok(rendered.trim().to_string())
    }
}

fn require_scenario(input: &AgentInput) -> Result<(), PromptError> {
    if input.scenario.is_some() {
        Ok(())
    } else {
        Err(PromptError::MissingScenario)
    }
}

/// Round prompts also need the opponent.
fn require_referee(input: &AgentInput, needs_level: bool) -> Result<(), PromptError> {
    match &input.referee {
        Some(brief) if !needs_level || brief.level.is_some() => Ok(()),
        _ => Err(PromptError::MissingReferee),
    }
}
