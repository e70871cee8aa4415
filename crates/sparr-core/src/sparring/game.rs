use serde::{Deserialize, Serialize};

use super::model::{LADDER_LEN, SparringLevel, SparringMode, SparringOption, SparringRound};
use super::rules::LEVEL_SCORE;
use crate::error::{Result, SparrError};

/// Where a game stands between two player actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SparringStatus {
    /// The next level or its rounds still have to be prepared.
    AwaitingLevel,
    /// A round is waiting for the player's answer.
    InRound,
    /// Every round was played, or the opponent ran out of hit points.
    LevelCleared,
    /// The player ran out of hit points.
    Defeated,
    /// The last ladder level was cleared.
    LadderComplete,
}

/// Result of one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub attack: String,
    pub option: SparringOption,
    pub player_hp: u32,
    pub opponent_hp: u32,
    pub status: SparringStatus,
}

/// State of one sparring game.
///
/// Hit points never drop below zero. The player losing is checked before
/// the level being cleared, so a round that empties both bars is a defeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparringGame {
    mode: SparringMode,
    level_number: u32,
    score: u32,
    level: Option<SparringLevel>,
    player_hp: u32,
    opponent_hp: u32,
    rounds: Vec<SparringRound>,
    round_index: usize,
    history: Vec<Exchange>,
}

impl SparringGame {
    pub fn new(mode: SparringMode) -> Self {
        Self {
            mode,
            level_number: 1,
            score: 0,
            level: None,
            player_hp: 0,
            opponent_hp: 0,
            rounds: Vec::new(),
            round_index: 0,
            history: Vec::new(),
        }
    }

    pub fn mode(&self) -> &SparringMode {
        &self.mode
    }

    pub fn level_number(&self) -> u32 {
        self.level_number
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> Option<&SparringLevel> {
        self.level.as_ref()
    }

    pub fn player_hp(&self) -> u32 {
        self.player_hp
    }

    pub fn opponent_hp(&self) -> u32 {
        self.opponent_hp
    }

    /// Rounds prepared for the current level.
    pub fn rounds(&self) -> &[SparringRound] {
        &self.rounds
    }

    /// 0-based index of the round being played.
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// Answers given on the current level.
    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn status(&self) -> SparringStatus {
        if self.level.is_none() || self.rounds.is_empty() {
            return SparringStatus::AwaitingLevel;
        }
        if self.player_hp == 0 {
            return SparringStatus::Defeated;
        }
        if self.opponent_hp == 0 || self.round_index >= self.rounds.len() {
            let last_rung = self.level_number as usize >= LADDER_LEN;
            return if self.mode == SparringMode::Ladder && last_rung {
                SparringStatus::LadderComplete
            } else {
                SparringStatus::LevelCleared
            };
        }
        SparringStatus::InRound
    }

    pub fn current_round(&self) -> Option<&SparringRound> {
        match self.status() {
            SparringStatus::InRound => self.rounds.get(self.round_index),
            _ => None,
        }
    }

    /// Makes `level` the current opponent and resets both hit point bars.
    ///
    /// Rounds and history of the previous level are dropped.
    pub fn install_level(&mut self, level: SparringLevel) {
        self.player_hp = level.initial_player_hp;
        self.opponent_hp = level.initial_opponent_hp;
        self.level = Some(level);
        self.rounds.clear();
        self.round_index = 0;
        self.history.clear();
    }

    pub fn install_rounds(&mut self, rounds: Vec<SparringRound>) {
        self.rounds = rounds;
        self.round_index = 0;
    }

    /// Plays option `choice` (1-based) of the current round.
    pub fn choose(&mut self, choice: usize) -> Result<Exchange> {
        let round = self.current_round().ok_or_else(|| {
            SparrError::validation(format!("no round to answer while {:?}", self.status()))
        })?;
        let count = round.options.len();
        let option = choice
            .checked_sub(1)
            .and_then(|i| round.options.get(i))
            .cloned()
            .ok_or_else(|| {
                SparrError::validation(format!("answer must be between 1 and {count}, got {choice}"))
            })?;
        let attack = round.attack.clone();

        self.player_hp = self.player_hp.saturating_sub(option.damage_user);
        self.opponent_hp = self.opponent_hp.saturating_sub(option.damage_opponent);
        self.round_index += 1;

        let exchange = Exchange {
            attack,
            option,
            player_hp: self.player_hp,
            opponent_hp: self.opponent_hp,
            status: self.status(),
        };
        self.history.push(exchange.clone());
        Ok(exchange)
    }

    /// Scores the cleared level and moves on to the next one.
    pub fn advance_level(&mut self) -> Result<()> {
        if self.status() != SparringStatus::LevelCleared {
            return Err(SparrError::validation(format!(
                "cannot move on while {:?}",
                self.status()
            )));
        }
        self.score += LEVEL_SCORE;
        self.level_number += 1;
        self.level = None;
        self.rounds.clear();
        self.round_index = 0;
        self.history.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparring::model::{OptionKind, SparringTopic, ladder_level};
    use crate::sparring::rules::{fallback_level, fallback_rounds};

    fn topic() -> SparringTopic {
        SparringTopic {
            id: "gym_guru".to_string(),
            title: "Gym Guru".to_string(),
            description: "Lectures you".to_string(),
            icon: "🏋️".to_string(),
        }
    }

    fn ready(mode: SparringMode, rounds: usize) -> SparringGame {
        let mut game = SparringGame::new(mode.clone());
        let level = match mode {
            SparringMode::Ladder => ladder_level(1).unwrap(),
            SparringMode::Endless(topic) => fallback_level(&topic, 1),
        };
        let prepared = fallback_rounds(&level, rounds);
        game.install_level(level);
        game.install_rounds(prepared);
        game
    }

    /// 1-based position of `kind` in the current round.
    fn pick(game: &SparringGame, kind: OptionKind) -> usize {
        game.current_round()
            .unwrap()
            .options
            .iter()
            .position(|o| o.kind == kind)
            .unwrap()
            + 1
    }

    #[test]
    fn test_new_game_awaits_level() {
        let game = SparringGame::new(SparringMode::Endless(topic()));
        assert_eq!(game.status(), SparringStatus::AwaitingLevel);
        assert_eq!(game.level_number(), 1);
        assert!(game.current_round().is_none());
    }

    #[test]
    fn test_level_without_rounds_still_awaits() {
        let mut game = SparringGame::new(SparringMode::Ladder);
        game.install_level(ladder_level(1).unwrap());
        assert_eq!(game.status(), SparringStatus::AwaitingLevel);
        assert_eq!(game.player_hp(), 100);
    }

    #[test]
    fn test_answer_applies_damage_to_both_sides() {
        let mut game = ready(SparringMode::Endless(topic()), 5);

        let weak = game.choose(pick(&game, OptionKind::Weak)).unwrap();
        assert_eq!(weak.player_hp, 88);
        assert_eq!(weak.opponent_hp, 100);

        let hit = game.choose(pick(&game, OptionKind::CriticalHit)).unwrap();
        assert_eq!(hit.player_hp, 88);
        assert_eq!(hit.opponent_hp, 76);
        assert_eq!(hit.status, SparringStatus::InRound);
        assert_eq!(game.round_index(), 2);
        assert_eq!(game.history().len(), 2);
    }

    #[test]
    fn test_out_of_range_answer_changes_nothing() {
        let mut game = ready(SparringMode::Endless(topic()), 5);
        for choice in [0, 5] {
            assert!(matches!(game.choose(choice), Err(SparrError::Validation(_))));
        }
        assert_eq!(game.round_index(), 0);
        assert_eq!(game.player_hp(), 100);
    }

    #[test]
    fn test_player_at_zero_is_defeated() {
        let mut game = ready(SparringMode::Endless(topic()), 5);
        for _ in 0..4 {
            game.choose(pick(&game, OptionKind::CriticalFail)).unwrap();
        }
        assert_eq!(game.player_hp(), 0);
        assert_eq!(game.status(), SparringStatus::Defeated);
        assert!(game.choose(1).is_err());
        assert!(game.advance_level().is_err());
    }

    #[test]
    fn test_opponent_at_zero_clears_level_early() {
        let mut game = ready(SparringMode::Endless(topic()), 10);
        for _ in 0..5 {
            game.choose(pick(&game, OptionKind::CriticalHit)).unwrap();
        }
        assert_eq!(game.opponent_hp(), 0);
        assert_eq!(game.status(), SparringStatus::LevelCleared);
    }

    #[test]
    fn test_playing_every_round_clears_level_and_scores() {
        let mut game = ready(SparringMode::Endless(topic()), 3);
        for _ in 0..3 {
            game.choose(pick(&game, OptionKind::Good)).unwrap();
        }
        assert_eq!(game.status(), SparringStatus::LevelCleared);

        game.advance_level().unwrap();

        assert_eq!(game.score(), LEVEL_SCORE);
        assert_eq!(game.level_number(), 2);
        assert!(game.level().is_none());
        assert!(game.history().is_empty());
        assert_eq!(game.status(), SparringStatus::AwaitingLevel);
    }

    #[test]
    fn test_install_level_resets_bars() {
        let mut game = ready(SparringMode::Endless(topic()), 5);
        game.choose(pick(&game, OptionKind::CriticalFail)).unwrap();

        game.install_level(fallback_level(&topic(), 7));

        assert_eq!(game.player_hp(), 80);
        assert_eq!(game.opponent_hp(), 120);
        assert!(game.rounds().is_empty());
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_last_ladder_level_completes_the_ladder() {
        let mut game = SparringGame::new(SparringMode::Ladder);
        for number in 1..=LADDER_LEN as u32 {
            let level = ladder_level(number).unwrap();
            let rounds = fallback_rounds(&level, 1);
            game.install_level(level);
            game.install_rounds(rounds);
            game.choose(pick(&game, OptionKind::Good)).unwrap();
            if number < LADDER_LEN as u32 {
                game.advance_level().unwrap();
            }
        }
        assert_eq!(game.status(), SparringStatus::LadderComplete);
        assert!(game.advance_level().is_err());
        assert_eq!(game.score(), LEVEL_SCORE * (LADDER_LEN as u32 - 1));
    }
}
