use crate::dice::{DieSpec, RollResult};
use crate::game_log::{GameLog, GameLogEntry};
use crate::study_check::StudyCheck;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAMPAIGN: &str = "New Adventure";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub campaign_name: String,
    pub current_location: String,
    pub current_quest: String,
    pub npcs: Vec<String>,
    pub inventory: Vec<String>,
    pub game_log: GameLog,
    pub current_roll: Option<RollResult>,
    #[serde(flatten)]
    pub study_check: StudyCheck,
    pub is_game_started: bool,
    pub needs_dice_roll: bool,
    pub requested_dice_type: Option<DieSpec>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            campaign_name: DEFAULT_CAMPAIGN.to_string(),
            current_location: "Starting Town".to_string(),
            current_quest: "Begin your adventure".to_string(),
            npcs: Vec::new(),
            inventory: Vec::new(),
            game_log: GameLog::new(),
            current_roll: None,
            study_check: StudyCheck::Idle,
            is_game_started: false,
            needs_dice_roll: false,
            requested_dice_type: None,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    // Fresh state for a new campaign, with its opening log line.
    pub fn start(campaign_name: impl Into<String>) -> Self {
        let campaign_name = campaign_name.into();
        let mut game_log = GameLog::new();
        game_log.append(GameLogEntry::system(format!(
            "New game started: {campaign_name}"
        )));
        GameState {
            campaign_name,
            game_log,
            is_game_started: true,
            ..Self::default()
        }
    }

    pub fn set_dice_request(&mut self, request: Option<DieSpec>) {
        self.needs_dice_roll = request.is_some();
        self.requested_dice_type = request;
    }

    // The slice of game state the Game Master gets to see.
    pub fn view(&self) -> GameStateView {
        GameStateView {
            campaign_name: self.campaign_name.clone(),
            current_location: self.current_location.clone(),
            current_quest: self.current_quest.clone(),
            npcs: self.npcs.clone(),
            inventory: self.inventory.clone(),
            current_roll: self.current_roll.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub campaign_name: String,
    pub current_location: String,
    pub current_quest: String,
    pub npcs: Vec<String>,
    pub inventory: Vec<String>,
    pub current_roll: Option<RollResult>,
}
