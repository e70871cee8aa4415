mod cli_helper;
mod command;
mod display;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use sparr_core::agent::AgentInvoker;
use sparr_core::error::{AgentCallError, SparrError};
use sparr_core::memory::AgentMemoryStore;
use sparr_core::scenario::{Difficulty, PreparationInput};
use sparr_core::sparring::{
    LADDER_ID, LevelReport, SparringMode, SparringSession, SparringStatus, find_topic,
};
use sparr_core::stage::{Stage, StageController, UserAction};
use sparr_infrastructure::{
    DirTranscriptStore, SparrPaths, TomlConfigRepository, TomlRunStateRepository,
};
use sparr_interaction::{InvokerSettings, OpenAIApiInvoker};

use crate::cli_helper::CliHelper;
use crate::command::{Command, SparCommand};

type Repl = Editor<CliHelper, DefaultHistory>;

/// Entry point of the SPARR readline REPL.
///
/// Sets up logging, configuration, the transcript store and the OpenAI
/// backend, resumes a saved run if there is one, then drives the stage
/// controller from user input until the user quits.
#[tokio::main]
async fn main() -> Result<()> {
    let paths = SparrPaths::new(env::var_os("SPARR_HOME").map(PathBuf::from).as_deref());
    let _log_guard = init_logging(&paths)?;

    let config = TomlConfigRepository::default_location(&paths)?.load_or_init()?;
    let transcripts_dir = match &config.storage.transcripts_dir {
        Some(dir) => dir.clone(),
        None => paths.transcripts_dir()?,
    };
    let store = Arc::new(DirTranscriptStore::new(&transcripts_dir)?);
    let memory = Arc::new(AgentMemoryStore::new(store.clone()));
    let invoker: Arc<dyn AgentInvoker> =
        Arc::new(OpenAIApiInvoker::new(InvokerSettings::from_env()?, store)?);
    let run_state = TomlRunStateRepository::default_location(&paths)?;

    display::banner();

    let saved = run_state.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unreadable run state");
        None
    });
    let mut controller = match saved {
        Some(saved) => {
            let controller =
                StageController::resume(invoker.clone(), memory.clone(), config, saved).await?;
            display::notice("Resuming your previous run.");
            controller
        }
        None => StageController::new(invoker.clone(), memory.clone(), config)?,
    };
    show_view(&controller);

    let mut rl: Repl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    loop {
        let prompt = format!("{}> ", controller.stage());
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let stage = controller.stage();
                match Command::parse(trimmed, stage) {
                    Command::Quit => {
                        persist(&run_state, &controller);
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Discard => {
                        if let Err(e) = controller.shutdown().await {
                            display::error(e);
                        }
                        if let Err(e) = run_state.clear() {
                            display::error(e);
                        }
                        println!("{}", "Run discarded. Goodbye!".bright_green());
                        break;
                    }
                    Command::Help => display::help(),
                    Command::Params => display::params(&controller.context().parameters),
                    Command::Prebuilt(None) => display::prebuilt_list(),
                    Command::Spar(None) => display::sparring_topics_list(),
                    Command::Spar(Some(id)) if stage == Stage::Preparation => {
                        let mode = if id == LADDER_ID {
                            Some(SparringMode::Ladder)
                        } else {
                            find_topic(&id).map(SparringMode::Endless)
                        };
                        match mode {
                            Some(mode) => {
                                let mut session = SparringSession::new(
                                    invoker.clone(),
                                    memory.clone(),
                                    controller.config().clone(),
                                    mode,
                                )?;
                                run_sparring(&mut rl, &mut session).await?;
                                show_view(&controller);
                            }
                            None => display::notice(format!(
                                "Unknown sparring topic '{id}'. Type '/spar' for the list."
                            )),
                        }
                    }
                    Command::Unknown(input) => {
                        display::notice(format!("Unknown command '{input}'. Type '/help'."))
                    }
                    Command::Prepare if stage == Stage::Preparation => {
                        if let Some(input) = read_preparation(&mut rl)? {
                            display::notice("Planning scenarios...");
                            run_action(&mut controller, UserAction::SubmitPreparation(input))
                                .await;
                        }
                    }
                    command => {
                        let actions = command.actions(stage);
                        if actions.is_empty() {
                            display::notice(format!("Not available in {stage}."));
                            show_view(&controller);
                        }
                        for action in actions {
                            if !run_action(&mut controller, action).await {
                                break;
                            }
                        }
                    }
                }
                persist(&run_state, &controller);
            }
            Err(ReadlineError::Interrupted) => {
                display::notice("CTRL-C detected. Type 'quit' to exit.");
            }
            Err(ReadlineError::Eof) => {
                persist(&run_state, &controller);
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                persist(&run_state, &controller);
                display::error(format!("{err:?}"));
                break;
            }
        }
    }

    Ok(())
}

fn init_logging(paths: &SparrPaths) -> Result<WorkerGuard> {
    let logs_dir = paths.logs_dir()?;
    fs::create_dir_all(&logs_dir)?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, "sparr.log"));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

/// Runs one action, cancelling it on CTRL-C. Returns whether it succeeded.
async fn run_action(controller: &mut StageController, action: UserAction) -> bool {
    let token = controller.arm_cancellation();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    let result = controller.handle(action).await;
    watcher.abort();

    match result {
        Ok(outcome) => {
            display::outcome(&outcome);
            true
        }
        Err(SparrError::AgentCall(AgentCallError::Cancelled)) => {
            display::notice("Cancelled.");
            false
        }
        Err(e) => {
            display::error(&e);
            if e.is_retryable() {
                display::notice("You can try again.");
            }
            false
        }
    }
}

/// Plays a sparring game until the player leaves or it ends.
async fn run_sparring(rl: &mut Repl, session: &mut SparringSession) -> Result<()> {
    display::notice("Preparing your opponent...");
    let mut ready = prepare_sparring(session, false).await;
    display::spar_help();

    loop {
        if ready {
            match session.game().status() {
                SparringStatus::InRound => display::round(session.game()),
                SparringStatus::Defeated | SparringStatus::LadderComplete => break,
                _ => {}
            }
        }
        let line = match rl.readline("spar> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                display::notice("CTRL-C detected. Type '/leave' to stop sparring.");
                ready = false;
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                session.leave().await?;
                return Err(err.into());
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            ready = false;
            continue;
        }
        let _ = rl.add_history_entry(&line);

        ready = match SparCommand::parse(trimmed) {
            SparCommand::Answer(choice) => match session.choose(choice).await {
                Ok(exchange) => {
                    display::exchange(&exchange);
                    display::sparring_status(session.game());
                    true
                }
                Err(e) => {
                    display::error(e);
                    false
                }
            },
            SparCommand::Next => match session.game().status() {
                SparringStatus::AwaitingLevel => prepare_sparring(session, false).await,
                SparringStatus::LevelCleared => prepare_sparring(session, true).await,
                status => {
                    display::notice(format!("Not available while {status:?}."));
                    false
                }
            },
            SparCommand::Leave => break,
            SparCommand::Help => {
                display::spar_help();
                false
            }
            SparCommand::Unknown(input) => {
                display::notice(format!("Unknown input '{input}'. Type 'help'."));
                false
            }
        };
    }

    session.leave().await?;
    display::notice("Sparring over. Back to preparation.");
    Ok(())
}

/// Prepares the current level (or the next one when `advance` is set),
/// cancelling on CTRL-C. Returns whether a round is ready to play.
async fn prepare_sparring(session: &mut SparringSession, advance: bool) -> bool {
    let token = session.arm_cancellation();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    let result: sparr_core::error::Result<LevelReport> = if advance {
        session.next_level().await
    } else {
        session.prepare_level().await
    };
    watcher.abort();

    match result {
        Ok(report) => {
            display::level_intro(session.game(), &report);
            true
        }
        Err(SparrError::AgentCall(AgentCallError::Cancelled)) => {
            display::notice("Cancelled. Type '/next' to try again.");
            false
        }
        Err(e) => {
            display::error(&e);
            display::notice("Type '/next' to try again.");
            false
        }
    }
}

fn show_view(controller: &StageController) {
    match controller.view() {
        Ok(view) => display::view(&view),
        Err(e) => display::error(e),
    }
}

/// Saves the run so a later process can resume it; forgets it once there
/// is nothing left to resume.
fn persist(run_state: &TomlRunStateRepository, controller: &StageController) {
    let context = controller.context();
    let nothing_to_resume = context.stage == Stage::Completed
        || (context.stage == Stage::Preparation && context.active_sessions.is_empty());
    let result = if nothing_to_resume {
        run_state.clear()
    } else {
        run_state.save(context)
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to persist run state");
        display::error(e);
    }
}

fn read_preparation(rl: &mut Repl) -> Result<Option<PreparationInput>> {
    let Some(role) = ask(rl, "Your role: ")? else {
        return Ok(None);
    };
    let Some(situation) = ask(rl, "Situation: ")? else {
        return Ok(None);
    };
    let Some(goal) = ask(rl, "Goal: ")? else {
        return Ok(None);
    };

    let difficulty = loop {
        let Some(answer) = ask(rl, "Difficulty [easy/medium/hard] (medium): ")? else {
            return Ok(None);
        };
        if answer.is_empty() {
            break Difficulty::default();
        }
        match Difficulty::from_str(&answer) {
            Ok(difficulty) => break difficulty,
            Err(_) => display::notice("Please answer easy, medium or hard."),
        }
    };

    Ok(Some(
        PreparationInput::new(role, situation, goal).with_difficulty(difficulty),
    ))
}

/// One answer, or `None` if the user backed out with CTRL-C or CTRL-D.
fn ask(rl: &mut Repl, prompt: &str) -> Result<Option<String>> {
    match rl.readline(prompt) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
