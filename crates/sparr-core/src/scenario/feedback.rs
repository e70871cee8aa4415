//! Feedback produced once the scenario chat ends.

use serde::{Deserialize, Serialize};

use crate::error::AgentCallError;

const SKIPPED_FEEDBACK: &str = "You ended the scenario before it really got going. \
Start a new scenario to get feedback on your conversation.";

/// Cached outcome of the feedback stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// Agent output as received.
    pub text: String,
    /// Bullet points found in the text.
    pub points: Vec<String>,
    /// The concrete tip, when the agent marked one.
    pub tip: Option<String>,
    /// The chat ended before the user said anything; no agent was asked.
    pub skipped: bool,
}

impl FeedbackResult {
    /// Result used when there is no transcript to review.
    pub fn skipped() -> Self {
        Self {
            text: SKIPPED_FEEDBACK.to_string(),
            points: Vec::new(),
            tip: None,
            skipped: true,
        }
    }

    /// Splits an agent reply into bullet points and a tip.
    ///
    /// Bullets are lines starting with `-`, `*`, `•` or `N.`; a line (or
    /// bullet) starting with `Tip:` becomes the tip. Parsing is lenient since
    /// the raw text is kept for display anyway; only a blank reply is an error.
    pub fn parse(raw: &str) -> Result<Self, AgentCallError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(AgentCallError::Malformed("feedback reply is empty".into()));
        }

        let mut points = Vec::new();
        let mut tip = None;
        for line in text.lines() {
            let line = line.trim();
            let (content, is_bullet) = match strip_bullet(line) {
                Some(rest) => (rest, true),
                None => (line, false),
            };
            if let Some(rest) = strip_tip_label(content) {
                if !rest.is_empty() {
                    tip = Some(rest.to_string());
                }
            } else if is_bullet && !content.is_empty() {
                points.push(content.to_string());
            }
        }

        Ok(Self {
            text: text.to_string(),
            points,
            tip,
            skipped: false,
        })
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Some(rest.trim());
        }
    }
    None
}

fn strip_tip_label(content: &str) -> Option<&str> {
    let unbolded = content.trim_start_matches("**");
    let lower = unbolded.to_ascii_lowercase();
    ["tip:", "tip**:", "tips:"]
        .iter()
        .find(|label| lower.starts_with(*label))
        .map(|label| unbolded[label.len()..].trim_start_matches("**").trim())
}
