use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::game::{Exchange, SparringGame, SparringStatus};
use super::model::{SparringLevel, SparringMode, SparringRound, ladder_level};
use super::referee::{parse_level, parse_rounds};
use super::rules::{ROUNDS_PER_LEVEL, fallback_level, fallback_rounds};
use crate::agent::{AgentInput, AgentInvoker, AgentRole, InputPurpose, RefereeBrief, call_bounded};
use crate::config::SparrConfig;
use crate::error::{AgentCallError, Result, SparrError};
use crate::memory::{AgentMemoryStore, ChatTurn, MemorySession};

/// Where a prepared piece of a level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Referee,
    /// Fixed ladder content.
    Catalogue,
    /// The referee failed or answered unusably.
    Fallback,
}

/// How the current level was put together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub opponent: Source,
    pub rounds: Source,
}

/// Drives one sparring game against the referee agent.
///
/// The referee gets a fresh memory session for every level; played
/// exchanges are recorded there and erased with it. Referee failures never
/// end the game: the level falls back to offline content instead. Only a
/// cancellation or a storage failure is reported to the caller.
pub struct SparringSession {
    game: SparringGame,
    memory: Arc<AgentMemoryStore>,
    invoker: Arc<dyn AgentInvoker>,
    config: SparrConfig,
    cancel: CancellationToken,
    /// Source of the installed opponent.
    opponent: Source,
}

impl SparringSession {
    /// # Errors
    ///
    /// Returns [`SparrError::Config`] if `config` does not validate.
    pub fn new(
        invoker: Arc<dyn AgentInvoker>,
        memory: Arc<AgentMemoryStore>,
        config: SparrConfig,
        mode: SparringMode,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            game: SparringGame::new(mode),
            memory,
            invoker,
            config,
            cancel: CancellationToken::new(),
            opponent: Source::Fallback,
        })
    }

    pub fn game(&self) -> &SparringGame {
        &self.game
    }

    /// Token for the next action, with any earlier cancellation discarded.
    pub fn arm_cancellation(&mut self) -> CancellationToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.cancel.clone()
    }

    /// Prepares the opponent and rounds of the current level.
    ///
    /// An opponent kept from an interrupted earlier attempt is reused.
    pub async fn prepare_level(&mut self) -> Result<LevelReport> {
        if self.game.status() != SparringStatus::AwaitingLevel {
            return Err(SparrError::validation("the level is already prepared"));
        }
        self.arm_cancellation();
        let session = self.memory.reset(AgentRole::Referee).await?;

        if self.game.level().is_none() {
            let (level, source) = self.design_level(&session).await?;
            tracing::info!(
                target: "sparr::sparring",
                level_number = self.game.level_number(),
                opponent = %level.opponent_name,
                ?source,
                "Opponent ready"
            );
            self.game.install_level(level);
            self.opponent = source;
        }

        let level = self
            .game
            .level()
            .cloned()
            .ok_or_else(|| SparrError::internal("sparring level missing after install"))?;
        let (rounds, source) = self.write_rounds(&session, &level).await?;
        tracing::info!(
            target: "sparr::sparring",
            rounds = rounds.len(),
            ?source,
            "Rounds ready"
        );
        self.game
            .install_rounds(rounds.into_iter().map(SparringRound::shuffled).collect());

        Ok(LevelReport {
            opponent: self.opponent,
            rounds: source,
        })
    }

    /// Plays answer `choice` (1-based) of the current round.
    ///
    /// The exchange is recorded in the referee session before the game
    /// state changes; if recording fails nothing is applied.
    pub async fn choose(&mut self, choice: usize) -> Result<Exchange> {
        let mut next = self.game.clone();
        let exchange = next.choose(choice)?;

        let session = self.live_session().await?;
        self.memory
            .append(
                &session,
                &[
                    ChatTurn::agent(exchange.attack.clone()),
                    ChatTurn::user(exchange.option.text.clone()),
                ],
            )
            .await?;

        self.game = next;
        tracing::debug!(
            target: "sparr::sparring",
            kind = %exchange.option.kind,
            player_hp = exchange.player_hp,
            opponent_hp = exchange.opponent_hp,
            status = ?exchange.status,
            "Answer played"
        );
        Ok(exchange)
    }

    /// Moves on from a cleared level and prepares the next one.
    pub async fn next_level(&mut self) -> Result<LevelReport> {
        self.game.advance_level()?;
        self.prepare_level().await
    }

    /// Ends the game and erases the referee's memory.
    pub async fn leave(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.memory.delete(AgentRole::Referee).await?;
        tracing::info!(
            target: "sparr::sparring",
            level_number = self.game.level_number(),
            score = self.game.score(),
            "Sparring game left"
        );
        Ok(())
    }

    async fn design_level(&mut self, session: &MemorySession) -> Result<(SparringLevel, Source)> {
        let number = self.game.level_number();
        let topic = match self.game.mode() {
            SparringMode::Ladder => {
                let level = ladder_level(number).ok_or_else(|| {
                    SparrError::internal(format!("no ladder level {number}"))
                })?;
                return Ok((level, Source::Catalogue));
            }
            SparringMode::Endless(topic) => topic.clone(),
        };

        let brief = RefereeBrief {
            topic: topic.clone(),
            level_number: number,
            level: None,
            round_count: ROUNDS_PER_LEVEL,
        };
        let input = AgentInput::new(InputPurpose::SparringLevel, String::new()).with_referee(brief);
        let parsed = self
            .call_referee(session, &input)
            .await?
            .and_then(|raw| parse_level(&raw, &topic, number));
        Ok(match parsed {
            Ok(level) => (level, Source::Referee),
            Err(err) => {
                tracing::warn!(target: "sparr::sparring", error = %err, "Using fallback opponent");
                (fallback_level(&topic, number), Source::Fallback)
            }
        })
    }

    async fn write_rounds(
        &mut self,
        session: &MemorySession,
        level: &SparringLevel,
    ) -> Result<(Vec<SparringRound>, Source)> {
        let brief = RefereeBrief {
            topic: self.game.mode().topic(),
            level_number: self.game.level_number(),
            level: Some(level.clone()),
            round_count: ROUNDS_PER_LEVEL,
        };
        let input = AgentInput::new(InputPurpose::SparringRounds, String::new()).with_referee(brief);
        let parsed = self
            .call_referee(session, &input)
            .await?
            .and_then(|raw| parse_rounds(&raw, ROUNDS_PER_LEVEL));
        Ok(match parsed {
            Ok(rounds) => (rounds, Source::Referee),
            Err(err) => {
                tracing::warn!(target: "sparr::sparring", error = %err, "Using fallback rounds");
                (fallback_rounds(level, ROUNDS_PER_LEVEL), Source::Fallback)
            }
        })
    }

    /// Outer error: the call must not be papered over. Inner error: the
    /// referee failed and the caller should fall back.
    async fn call_referee(
        &mut self,
        session: &MemorySession,
        input: &AgentInput,
    ) -> Result<std::result::Result<String, AgentCallError>> {
        let result = call_bounded(
            self.invoker.as_ref(),
            AgentRole::Referee,
            session.id(),
            input,
            self.config.agent.timeout(),
            &self.cancel,
        )
        .await;
        match result {
            Err(AgentCallError::Cancelled) => {
                self.cancel = CancellationToken::new();
                Err(AgentCallError::Cancelled.into())
            }
            other => Ok(other),
        }
    }

    async fn live_session(&self) -> Result<MemorySession> {
        self.memory
            .get(AgentRole::Referee)
            .await
            .ok_or_else(|| SparrError::internal("no referee memory session"))
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
