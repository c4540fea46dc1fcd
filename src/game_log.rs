use crate::dice::{DieSpec, RollResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const GAME_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", from = "GameLogRecord")]
pub enum GameLogEntry {
    System {
        content: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Roll {
        die_type: DieSpec,
        result: u32,
        modified_max: u32,
        timestamp: DateTime<Utc>,
    },
    Message {
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl GameLogEntry {
    pub fn system(content: impl Into<String>) -> Self {
        GameLogEntry::System {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn roll(result: &RollResult) -> Self {
        GameLogEntry::Roll {
            die_type: result.die,
            result: result.outcome,
            modified_max: result.modified_max,
            timestamp: Utc::now(),
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        GameLogEntry::Message {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            GameLogEntry::System { timestamp, .. }
            | GameLogEntry::Roll { timestamp, .. }
            | GameLogEntry::Message { timestamp, .. } => *timestamp,
        }
    }
}

// Save-file shape of a log entry. Direct rolls in older saves carry no
// `modifiedMax`; those were never penalized, so the die's faces stand in.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GameLogRecord {
    System {
        content: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Roll {
        die_type: DieSpec,
        result: u32,
        #[serde(default)]
        modified_max: Option<u32>,
        timestamp: DateTime<Utc>,
    },
    Message {
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl From<GameLogRecord> for GameLogEntry {
    fn from(record: GameLogRecord) -> Self {
        match record {
            GameLogRecord::System { content, timestamp } => {
                GameLogEntry::System { content, timestamp }
            }
            GameLogRecord::Roll {
                die_type,
                result,
                modified_max,
                timestamp,
            } => GameLogEntry::Roll {
                die_type,
                result,
                modified_max: modified_max.unwrap_or(die_type.faces()),
                timestamp,
            },
            GameLogRecord::Message { content, timestamp } => {
                GameLogEntry::Message { content, timestamp }
            }
        }
    }
}

/// Bounded, insertion-ordered record of what happened in the game.
///
/// Appending past [`GAME_LOG_CAPACITY`] evicts the oldest entries. There is no
/// other way to remove or reorder entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GameLogEntry>", into = "Vec<GameLogEntry>")]
pub struct GameLog {
    entries: VecDeque<GameLogEntry>,
}

impl GameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: GameLogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > GAME_LOG_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<GameLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameLogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&GameLogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Loading an oversized log from disk keeps only the newest entries.
impl From<Vec<GameLogEntry>> for GameLog {
    fn from(entries: Vec<GameLogEntry>) -> Self {
        let mut log = GameLog::new();
        entries.into_iter().for_each(|entry| log.append(entry));
        log
    }
}

impl From<GameLog> for Vec<GameLogEntry> {
    fn from(log: GameLog) -> Self {
        log.entries.into()
    }
}
