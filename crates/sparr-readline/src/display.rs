//! Colored terminal output.

use colored::Colorize;
use sparr_core::learning::ParameterVector;
use sparr_core::scenario::{FeedbackResult, ScenarioOption, prebuilt_scenarios};
use sparr_core::sparring::{
    Exchange, LADDER_ID, LevelReport, OptionKind, Source, SparringGame, SparringStatus,
    sparring_topics,
};
use sparr_core::stage::{ActionOutcome, StageView};

use crate::command::{COMMANDS, SPAR_COMMANDS};

pub fn banner() {
    println!("{}", "=== SPARR ===".bright_magenta().bold());
    println!(
        "{}",
        "Rehearse a difficult conversation, get feedback, reflect. Type '/help' for commands, 'quit' to exit."
            .bright_black()
    );
    println!();
}

pub fn help() {
    for (name, text) in COMMANDS {
        println!("  {:<10} {}", name.bright_cyan(), text.bright_black());
    }
    println!("  {:<10} {}", "quit".bright_cyan(), "save the run and exit".bright_black());
}

pub fn prebuilt_list() {
    println!("{}", "Ready-made scenarios:".bright_yellow());
    for scenario in prebuilt_scenarios() {
        println!(
            "  {:<14} {} - {}",
            scenario.id.bright_cyan(),
            scenario.option.title.bold(),
            scenario.option.summary
        );
    }
}

pub fn params(parameters: &ParameterVector) {
    let [p1, p2, p3, p4, p5] = parameters.values();
    println!(
        "{}",
        format!("p1 {p1:.2} | p2 {p2:.2} (confrontation) | p3 {p3:.2} | p4 {p4:.2} | p5 {p5:.2}")
            .bright_black()
    );
}

fn options(options: &[ScenarioOption]) {
    println!("{}", "Choose a scenario (type its number):".bright_yellow());
    for (i, option) in options.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).bright_cyan(), option.title.bold());
        println!("      {}", option.summary);
        if !option.focus.is_empty() {
            println!("      {}", format!("Focus: {}", option.focus).bright_black());
        }
    }
}

fn scenario_started(scenario: &ScenarioOption) {
    println!("{}", format!("Scenario: {}", scenario.title).bright_yellow().bold());
    println!("{}", scenario.summary);
    println!(
        "{}",
        "Write your first line, or type '/opening' to let the other side start. '/end' ends the chat."
            .bright_black()
    );
}

fn feedback(feedback: &FeedbackResult) {
    println!("{}", "Feedback".bright_yellow().bold());
    for line in feedback.text.lines() {
        println!("{}", line.bright_blue());
    }
    println!(
        "{}",
        "Type '/reflect' to talk it through, '/finish' to end or '/restart' to try again."
            .bright_black()
    );
}

pub fn agent_said(text: &str) {
    for line in text.lines() {
        println!("{}", line.bright_blue());
    }
}

pub fn view(view: &StageView) {
    match view {
        StageView::Preparation => {
            println!(
                "{}",
                "Type '/prepare' to describe your situation or '/prebuilt' to pick a ready-made scenario."
                    .bright_black()
            );
        }
        StageView::ScenarioSelection { options: list } => options(list),
        StageView::ScenarioChat {
            scenario,
            turn_count,
            ..
        } => {
            scenario_started(scenario);
            println!("{}", format!("{turn_count} turn(s) so far.").bright_black());
        }
        StageView::Feedback { feedback: result } => feedback(result),
        StageView::Reflection { turn_count, .. } => {
            println!(
                "{}",
                format!("Reflection, {turn_count} message(s) so far. '/finish' when done.")
                    .bright_black()
            );
        }
        StageView::Completed { .. } => {
            println!(
                "{}",
                "Run completed. '/restart' to begin a new one.".bright_green()
            );
        }
    }
}

pub fn outcome(outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::OptionsReady { options: list } => options(list),
        ActionOutcome::ScenarioStarted { scenario } => scenario_started(scenario),
        ActionOutcome::AgentSaid { text } => agent_said(text),
        ActionOutcome::FeedbackReady { feedback: result } => feedback(result),
        ActionOutcome::ReflectionStarted => {
            println!("{}", "Reflection".bright_yellow().bold());
        }
        ActionOutcome::Completed => {
            println!(
                "{}",
                "Thanks for practising. All conversation memory has been erased.".bright_green()
            );
        }
        ActionOutcome::Restarted => {
            println!("{}", "Starting over. Memory erased.".bright_green());
        }
    }
}

pub fn spar_help() {
    for (name, text) in SPAR_COMMANDS {
        println!("  {:<10} {}", name.bright_cyan(), text.bright_black());
    }
}

pub fn sparring_topics_list() {
    println!("{}", "Verbal sparring topics (endless):".bright_yellow());
    for topic in sparring_topics() {
        println!(
            "  {} {:<16} {} - {}",
            topic.icon,
            topic.id.bright_cyan(),
            topic.title.bold(),
            topic.description
        );
    }
    println!(
        "  {} {:<16} {}",
        "🌀",
        LADDER_ID.bright_cyan(),
        "Three gaslighters in a row, ending with a boss".bold()
    );
    println!("{}", "Start with '/spar <topic>'.".bright_black());
}

pub fn level_intro(game: &SparringGame, report: &LevelReport) {
    let Some(level) = game.level() else {
        return;
    };
    println!();
    println!(
        "{}",
        format!("{} {} - {}", level.avatar, level.title, level.opponent_name)
            .bright_magenta()
            .bold()
    );
    println!("{}", format!("Style: {}", level.attack_style).bright_black());
    println!("{}", format!("Goal: {}", level.win_condition).bright_black());
    if report.opponent == Source::Fallback || report.rounds == Source::Fallback {
        notice("The referee is unavailable, playing offline material.");
    }
}

fn bar(label: &str, hp: u32, max: u32) -> String {
    const WIDTH: u32 = 20;
    let filled = if max == 0 { 0 } else { (hp.min(max) * WIDTH) / max };
    format!(
        "{label:<14} [{}{}] {hp}",
        "#".repeat(filled as usize),
        "-".repeat((WIDTH - filled) as usize)
    )
}

pub fn health(game: &SparringGame) {
    let Some(level) = game.level() else {
        return;
    };
    println!(
        "{}",
        bar("You", game.player_hp(), level.initial_player_hp).bright_green()
    );
    println!(
        "{}",
        bar(&level.opponent_name, game.opponent_hp(), level.initial_opponent_hp).bright_red()
    );
}

pub fn round(game: &SparringGame) {
    let (Some(level), Some(round)) = (game.level(), game.current_round()) else {
        return;
    };
    println!();
    health(game);
    println!(
        "{}",
        format!(
            "Situation {} of {}: {}",
            game.round_index() + 1,
            game.rounds().len(),
            round.context
        )
        .bright_black()
    );
    println!("{} {}", level.avatar, round.attack.bright_blue());
    for (i, option) in round.options.iter().enumerate() {
        println!("  {} {}", format!("[{}]", i + 1).bright_cyan(), option.text);
    }
}

pub fn exchange(exchange: &Exchange) {
    let option = &exchange.option;
    let verdict = format!(
        "{} (you -{}, opponent -{})",
        option.feedback, option.damage_user, option.damage_opponent
    );
    let line = match option.kind {
        OptionKind::CriticalHit | OptionKind::Good => verdict.bright_green(),
        OptionKind::Weak => verdict.yellow(),
        OptionKind::CriticalFail => verdict.red(),
    };
    println!("{line}");
}

pub fn sparring_status(game: &SparringGame) {
    match game.status() {
        SparringStatus::LevelCleared => println!(
            "{}",
            format!(
                "Level {} cleared! Type '/next' for the next level or '/leave' to stop.",
                game.level_number()
            )
            .bright_green()
        ),
        SparringStatus::Defeated => println!(
            "{}",
            format!(
                "Game over. You made it to level {} with {} points.",
                game.level_number(),
                game.score()
            )
            .red()
            .bold()
        ),
        SparringStatus::LadderComplete => println!(
            "{}",
            "You climbed the whole ladder. Well held!".bright_green().bold()
        ),
        SparringStatus::AwaitingLevel => notice("No level ready. Type '/next' to try again."),
        SparringStatus::InRound => {}
    }
}

pub fn error(message: impl std::fmt::Display) {
    eprintln!("{}", format!("Error: {message}").red());
}

pub fn notice(message: impl std::fmt::Display) {
    println!("{}", message.to_string().yellow());
}
