// ../tests/common/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use study_master::context::ConversationContext;
use study_master::message::ChatMessage;
use study_master::save::SaveManager;
use study_master::{AIError, GameSession, GenerationService, Settings};
use tempfile::TempDir;

/// Generation service that replays canned replies and records what it was asked.
#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Result<String, AIError>>>,
    summary: Mutex<Option<Result<String, AIError>>>,
    pub prompts: Mutex<Vec<(String, ConversationContext)>>,
    pub summarized: Mutex<Vec<usize>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    pub fn fail(self, error: AIError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn with_summary(self, summary: Result<String, AIError>) -> Self {
        *self.summary.lock().unwrap() = Some(summary);
        self
    }

    pub fn push(&self, reply: Result<String, AIError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<(String, ConversationContext)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl GenerationService for ScriptedService {
    async fn generate(
        &self,
        message: &str,
        context: &ConversationContext,
    ) -> Result<String, AIError> {
        self.prompts
            .lock()
            .unwrap()
            .push((message.to_string(), context.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("The world waits quietly.".to_string()))
    }

    async fn summarize(&self, history: &[ChatMessage]) -> Result<String, AIError> {
        self.summarized.lock().unwrap().push(history.len());
        self.summary
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("The hero set out.".to_string()))
    }
}

pub fn settings(study_mode: bool) -> Settings {
    Settings {
        study_mode,
        auto_save: false,
        ..Settings::default()
    }
}

pub fn session_with(
    service: ScriptedService,
    study_mode: bool,
) -> (GameSession<ScriptedService>, Arc<ScriptedService>, TempDir) {
    let save_dir = TempDir::new().expect("Failed to create temp dir");
    let service = Arc::new(service);
    let session = GameSession::new(
        Arc::clone(&service),
        settings(study_mode),
        SaveManager::new(save_dir.path()),
    )
    .with_seed(7);
    (session, service, save_dir)
}
