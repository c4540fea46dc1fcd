pub mod ai;
pub mod ai_response;
pub mod app;
pub mod character;
pub mod context;
pub mod dice;
pub mod error;
pub mod game_log;
pub mod game_state;
pub mod logging;
pub mod message;
pub mod save;
pub mod session;
pub mod settings;
pub mod study_check;

// Re-export commonly used items for easier access
pub use ai::{GameMasterAI, GenerationService};
pub use character::{Ability, CharacterSheet};
pub use dice::{DieSpec, RollResult};
pub use error::{AIError, AppError, GameError, SaveError};
pub use game_state::GameState;
pub use message::{ChatHistory, ChatMessage, Role};
pub use session::{GameSession, RollStart, TurnOutcome};
pub use settings::Settings;
pub use study_check::StudyCheck;
