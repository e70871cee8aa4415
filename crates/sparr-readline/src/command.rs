//! Parsing of REPL input into commands, and commands into controller actions.

use sparr_core::stage::{Stage, UserAction};

/// Slash commands with their help text.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/prepare", "describe your own situation and get three scenarios"),
    ("/prebuilt", "list ready-made scenarios, or start one: /prebuilt <id>"),
    ("/opening", "let the other side speak first"),
    ("/end", "end the conversation and get feedback"),
    ("/feedback", "show the feedback again"),
    ("/reflect", "start a reflection chat about the exercise"),
    ("/finish", "finish the run and erase its memory"),
    ("/restart", "start over from preparation"),
    ("/params", "show the learning profile"),
    ("/spar", "list sparring topics, or play one: /spar <topic> or /spar ladder"),
    ("/discard", "erase the run and exit"),
    ("/help", "show this help"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    Params,
    Discard,
    Prepare,
    Prebuilt(Option<String>),
    Spar(Option<String>),
    Opening,
    End,
    Feedback,
    Reflect,
    Finish,
    Restart,
    /// A bare number while choosing a scenario.
    Select(usize),
    Say(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str, stage: Stage) -> Self {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return Command::Quit;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let (name, arg) = match rest.split_once(char::is_whitespace) {
                Some((name, arg)) => (name, Some(arg.trim().to_string())),
                None => (rest, None),
            };
            return match name {
                "help" => Command::Help,
                "params" => Command::Params,
                "discard" => Command::Discard,
                "prepare" => Command::Prepare,
                "prebuilt" => Command::Prebuilt(arg.filter(|a| !a.is_empty())),
                "spar" => Command::Spar(arg.filter(|a| !a.is_empty())),
                "opening" => Command::Opening,
                "end" => Command::End,
                "feedback" => Command::Feedback,
                "reflect" => Command::Reflect,
                "finish" => Command::Finish,
                "restart" => Command::Restart,
                _ => Command::Unknown(line.to_string()),
            };
        }

        if stage == Stage::ScenarioSelection {
            if let Ok(index) = line.parse::<usize>() {
                return Command::Select(index);
            }
        }
        Command::Say(line.to_string())
    }

    /// The controller actions this command stands for in `stage`.
    ///
    /// Empty when the command is handled by the REPL itself or has no
    /// meaning in `stage`.
    pub fn actions(&self, stage: Stage) -> Vec<UserAction> {
        match (self, stage) {
            (Command::Prebuilt(Some(id)), _) => vec![UserAction::StartPrebuilt(id.clone())],
            (Command::Select(index), _) => vec![UserAction::SelectScenario(*index)],
            (Command::Opening, Stage::Reflection) => vec![UserAction::RequestReflectionOpening],
            (Command::Opening, _) => vec![UserAction::RequestOpeningLine],
            (Command::End, _) => vec![UserAction::EndChat],
            (Command::Feedback, _) => vec![UserAction::ViewFeedback],
            (Command::Reflect, _) => vec![
                UserAction::OptIntoReflection,
                UserAction::RequestReflectionOpening,
            ],
            (Command::Finish, _) => vec![UserAction::Finish],
            (Command::Restart, _) => vec![UserAction::Restart],
            (Command::Say(text), Stage::ScenarioChat) => {
                vec![UserAction::SendMessage(text.clone())]
            }
            (Command::Say(text), Stage::Reflection) => {
                vec![UserAction::SendReflectionMessage(text.clone())]
            }
            _ => Vec::new(),
        }
    }
}

/// Sparring commands with their help text.
pub const SPAR_COMMANDS: &[(&str, &str)] = &[
    ("1-4", "answer with that option"),
    ("/next", "go on to the next level, or retry preparing this one"),
    ("/leave", "stop sparring and erase the game's memory"),
    ("/help", "show this help"),
];

/// Input while a sparring game is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SparCommand {
    Answer(usize),
    Next,
    Leave,
    Help,
    Unknown(String),
}

impl SparCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Ok(choice) = line.parse::<usize>() {
            return SparCommand::Answer(choice);
        }
        match line.trim_start_matches('/') {
            "next" => SparCommand::Next,
            "leave" | "quit" | "exit" => SparCommand::Leave,
            "help" => SparCommand::Help,
            _ => SparCommand::Unknown(line.to_string()),
        }
    }
}
