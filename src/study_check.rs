//! The study check gating a dice roll.
//!
//! A check is started for a die, the player answers `faces / 2` questions, and
//! every wrong answer lowers the highest face the roll can land on. The slot
//! holds at most one check; finishing it is only possible through the
//! [`ActiveStudyCheck`] value handed out by [`StudyCheck::take_active`].

use crate::dice::{DieSpec, RollResult, question_count};
use crate::error::{GameError, StudyCheckViolation};
use crate::game_log::{GameLog, GameLogEntry};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What the front end needs to run the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRequest {
    #[serde(rename = "dieType")]
    pub die: DieSpec,
    pub total_questions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStudyCheck {
    die: DieSpec,
    total_questions: u32,
}

impl ActiveStudyCheck {
    fn new(die: DieSpec) -> Self {
        Self {
            die,
            total_questions: question_count(die),
        }
    }

    pub fn die(&self) -> DieSpec {
        self.die
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn request(&self) -> RollRequest {
        RollRequest {
            die: self.die,
            total_questions: self.total_questions,
        }
    }

    /// Finish the check and roll. Out-of-range answer counts are clamped.
    pub fn complete(
        self,
        correct_answers: i64,
        log: &mut GameLog,
        rng: &mut impl Rng,
    ) -> RollResult {
        let result = RollResult::with_penalty(self.die, self.total_questions, correct_answers, rng);
        log::info!(
            "Study check for {} completed: {}/{} correct, max {}, rolled {}",
            result.die,
            result.correct_answers,
            result.total_questions,
            result.modified_max,
            result.outcome
        );
        log.append(GameLogEntry::roll(&result));
        result
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StudyCheckRecord", into = "StudyCheckRecord")]
pub enum StudyCheck {
    #[default]
    Idle,
    Active(ActiveStudyCheck),
}

impl StudyCheck {
    /// Open a check for `die`. Fails without touching the slot when another
    /// check is still outstanding.
    pub fn start(&mut self, die: DieSpec, log: &mut GameLog) -> Result<RollRequest, GameError> {
        if let StudyCheck::Active(active) = self {
            log::warn!(
                "Refusing to start a {die} study check while a {} check is active",
                active.die
            );
            return Err(GameError::StateContractViolation(
                StudyCheckViolation::AlreadyActive(active.die),
            ));
        }

        let active = ActiveStudyCheck::new(die);
        let request = active.request();
        log.append(GameLogEntry::system(format!(
            "Study check started for {} roll. (Answer {} questions)",
            die, request.total_questions
        )));
        log::info!(
            "Study check started for {die} with {} questions",
            request.total_questions
        );
        *self = StudyCheck::Active(active);
        Ok(request)
    }

    /// Move the outstanding check out of the slot, leaving it idle.
    pub fn take_active(&mut self) -> Option<ActiveStudyCheck> {
        match std::mem::take(self) {
            StudyCheck::Active(active) => Some(active),
            StudyCheck::Idle => None,
        }
    }

    pub fn active(&self) -> Option<&ActiveStudyCheck> {
        match self {
            StudyCheck::Active(active) => Some(active),
            StudyCheck::Idle => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, StudyCheck::Active(_))
    }
}

// Flat save-file shape: `studyCheckActive` / `studyCheckDie`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyCheckRecord {
    #[serde(default)]
    study_check_active: bool,
    #[serde(default)]
    study_check_die: Option<DieSpec>,
}

impl From<StudyCheckRecord> for StudyCheck {
    fn from(record: StudyCheckRecord) -> Self {
        match (record.study_check_active, record.study_check_die) {
            (true, Some(die)) => StudyCheck::Active(ActiveStudyCheck::new(die)),
            _ => StudyCheck::Idle,
        }
    }
}

impl From<StudyCheck> for StudyCheckRecord {
    fn from(check: StudyCheck) -> Self {
        match check {
            StudyCheck::Active(active) => StudyCheckRecord {
                study_check_active: true,
                study_check_die: Some(active.die),
            },
            StudyCheck::Idle => StudyCheckRecord::default(),
        }
    }
}
