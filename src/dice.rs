// Import required modules and crates.
use crate::error::GameError;
use rand::Rng; // RNG utilities from the rand crate for generating random numbers.
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter};

// Points available to a fresh character under the point-buy system.
pub const POINT_BUY_BUDGET: u8 = 27;

// Enum for the die kinds a player can be asked to roll.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DieSpec {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieSpec {
    pub fn faces(&self) -> u32 {
        match self {
            DieSpec::D4 => 4,
            DieSpec::D6 => 6,
            DieSpec::D8 => 8,
            DieSpec::D10 => 10,
            DieSpec::D12 => 12,
            DieSpec::D20 => 20,
            DieSpec::D100 => 100,
        }
    }

    pub fn from_faces(faces: u32) -> Result<Self, GameError> {
        match faces {
            4 => Ok(DieSpec::D4),
            6 => Ok(DieSpec::D6),
            8 => Ok(DieSpec::D8),
            10 => Ok(DieSpec::D10),
            12 => Ok(DieSpec::D12),
            20 => Ok(DieSpec::D20),
            100 => Ok(DieSpec::D100),
            _ => Err(GameError::InvalidDieType(format!("d{faces}"))),
        }
    }

    // Accepts "d20", "D20" or a bare "20".
    pub fn parse(token: &str) -> Result<Self, GameError> {
        let trimmed = token.trim();
        let digits = trimmed.strip_prefix(['d', 'D']).unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map_err(|_| GameError::InvalidDieType(trimmed.to_string()))
            .and_then(|faces| {
                Self::from_faces(faces)
                    .map_err(|_| GameError::InvalidDieType(trimmed.to_string()))
            })
    }
}

impl std::str::FromStr for DieSpec {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DieSpec::parse(s)
    }
}

// Roll a single die with the thread-local generator.
pub fn roll_die(die: DieSpec) -> u32 {
    roll_die_with(die, &mut rand::rng())
}

pub fn roll_die_with(die: DieSpec, rng: &mut impl Rng) -> u32 {
    rng.random_range(1..=die.faces())
}

// Number of study questions gating a roll of this die.
pub fn question_count(die: DieSpec) -> u32 {
    die.faces() / 2
}

// Point-buy cost of a single ability score.
pub fn point_buy_cost(score: u8) -> Result<u8, GameError> {
    match score {
        8 => Ok(0),
        9 => Ok(1),
        10 => Ok(2),
        11 => Ok(3),
        12 => Ok(4),
        13 => Ok(5),
        14 => Ok(7),
        15 => Ok(9),
        _ => Err(GameError::InvalidScore(score)),
    }
}

// Summed point-buy cost of a full set of ability scores.
pub fn total_point_buy_cost(scores: &[u8]) -> Result<u8, GameError> {
    scores
        .iter()
        .try_fold(0u8, |total, &score| Ok(total + point_buy_cost(score)?))
}

pub fn ability_modifier(score: u8) -> i8 {
    ((score as i16 - 10).div_euclid(2)) as i8
}

// Structure holding the outcome of a (possibly study-gated) roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RollRecord")]
pub struct RollResult {
    #[serde(rename = "dieType")]
    pub die: DieSpec,
    #[serde(rename = "originalMax")]
    pub raw_face_count: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub modified_max: u32,
    #[serde(rename = "result")]
    pub outcome: u32,
}

impl RollResult {
    // Roll under the study-check penalty. `correct_answers` is clamped into
    // [0, total_questions] rather than rejected.
    pub fn with_penalty(
        die: DieSpec,
        total_questions: u32,
        correct_answers: i64,
        rng: &mut impl Rng,
    ) -> Self {
        let correct_answers = correct_answers.clamp(0, total_questions as i64) as u32;
        let wrong_answers = total_questions - correct_answers;
        let raw_face_count = die.faces();
        let modified_max = raw_face_count.saturating_sub(wrong_answers).max(1);
        let outcome = rng.random_range(1..=modified_max);

        RollResult {
            die,
            raw_face_count,
            total_questions,
            correct_answers,
            wrong_answers,
            modified_max,
            outcome,
        }
    }

    // Straight roll used when study mode is off: no questions, no penalty.
    pub fn immediate(die: DieSpec, rng: &mut impl Rng) -> Self {
        Self::with_penalty(die, 0, 0, rng)
    }

    // The player line sent back to the Game Master after a roll.
    pub fn feedback_message(&self) -> String {
        format!(
            "I rolled a {} on a {}. (I answered {} out of {} study questions correctly, so my maximum possible roll was {}.)",
            self.outcome, self.die, self.correct_answers, self.total_questions, self.modified_max
        )
    }

    // Short form for logs and the front end.
    pub fn describe(&self) -> String {
        format!(
            "Rolled {} on {} (answered {}/{} correctly, reduced max from {} to {})",
            self.outcome,
            self.die,
            self.correct_answers,
            self.total_questions,
            self.raw_face_count,
            self.modified_max
        )
    }
}

// Save-file shape of a roll. Older saves omit `totalQuestions`, and may omit
// the maxima, so those are rebuilt from what is present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    die_type: DieSpec,
    result: u32,
    #[serde(default)]
    original_max: Option<u32>,
    #[serde(default)]
    total_questions: Option<u32>,
    #[serde(default)]
    correct_answers: u32,
    #[serde(default)]
    wrong_answers: u32,
    #[serde(default)]
    modified_max: Option<u32>,
}

impl From<RollRecord> for RollResult {
    fn from(record: RollRecord) -> Self {
        let raw_face_count = record.original_max.unwrap_or(record.die_type.faces());
        let modified_max = record
            .modified_max
            .unwrap_or_else(|| raw_face_count.saturating_sub(record.wrong_answers).max(1));
        RollResult {
            die: record.die_type,
            raw_face_count,
            total_questions: record
                .total_questions
                .unwrap_or(record.correct_answers + record.wrong_answers),
            correct_answers: record.correct_answers,
            wrong_answers: record.wrong_answers,
            modified_max,
            outcome: record.result,
        }
    }
}
