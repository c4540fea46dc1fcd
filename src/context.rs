use serde::{Deserialize, Serialize};

use crate::{
    character::CharacterSheet,
    game_state::{GameState, GameStateView},
    message::{ChatHistory, ChatMessage, Role},
};

// Per-role number of recent messages handed to the Game Master.
pub const CONTEXT_WINDOW: usize = 15;
// History length past which a summary is requested.
pub const SUMMARY_THRESHOLD: usize = 50;

/// Everything the Game Master sees besides the new player line.
///
/// Always derived from the session stores and never kept around; build a
/// fresh one for each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub conversation_summary: Option<String>,
    pub last_user_messages: Vec<ChatMessage>,
    pub last_gm_messages: Vec<ChatMessage>,
    pub character_state: Option<CharacterSheet>,
    pub game_state: GameStateView,
}

pub fn build_context(
    history: &ChatHistory,
    character: Option<&CharacterSheet>,
    game_state: &GameState,
) -> ConversationContext {
    ConversationContext {
        conversation_summary: history.conversation_summary.clone(),
        last_user_messages: history.last_by_role(Role::User, CONTEXT_WINDOW),
        last_gm_messages: history.last_by_role(Role::Assistant, CONTEXT_WINDOW),
        character_state: character.cloned(),
        game_state: game_state.view(),
    }
}

pub fn should_summarize(history: &ChatHistory) -> bool {
    history.len() > SUMMARY_THRESHOLD && history.conversation_summary.is_none()
}
