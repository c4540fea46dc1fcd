//! A single game: character, game state, chat with the Game Master, and the
//! study check slot, all owned by one [`GameSession`].
//!
//! Turns are serialized with a busy flag held by the [`PendingTurn`], so
//! dropping an unfinished turn frees the session. [`GameSession::send_message`]
//! runs a whole turn; callers that share the session behind a lock can instead use
//! [`GameSession::begin_turn`] and [`GameSession::finish_turn`] and call the
//! generation service in between without holding the lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;

use crate::ai::GenerationService;
use crate::ai_response::detect_dice_request;
use crate::character::CharacterSheet;
use crate::context::{ConversationContext, build_context, should_summarize};
use crate::dice::{DieSpec, RollResult};
use crate::error::{AIError, GameError, StudyCheckViolation};
use crate::game_log::{GameLog, GameLogEntry};
use crate::game_state::{DEFAULT_CAMPAIGN, GameState};
use crate::message::{ChatHistory, ChatMessage};
use crate::save::{GameSnapshot, SaveManager};
use crate::settings::Settings;
use crate::study_check::{RollRequest, StudyCheck};

// Clears the busy flag when the turn it belongs to goes away.
#[derive(Debug)]
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A player line that has been recorded and is waiting for the Game Master.
#[derive(Debug)]
pub struct PendingTurn {
    pub message: String,
    pub context: ConversationContext,
    generation: u64,
    guard: BusyGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Narration {
        text: String,
        dice_request: Option<DieSpec>,
    },
    Failed {
        reason: String,
        transient: bool,
    },
}

impl TurnOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TurnOutcome::Failed { .. })
    }
}

/// What happened when the player picked up a die.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollStart {
    /// Study mode is on: the player has to answer the quiz first.
    StudyCheck(RollRequest),
    /// Study mode is off: the die was rolled straight away.
    Immediate(RollResult),
}

/// Result of a background summarization, tagged with the game it belongs to.
#[derive(Debug)]
pub struct SummaryUpdate {
    generation: u64,
    result: Result<String, AIError>,
}

pub struct GameSession<G: GenerationService + 'static> {
    service: Arc<G>,
    settings: Settings,
    character: Option<CharacterSheet>,
    game_state: GameState,
    history: ChatHistory,
    busy: Arc<AtomicBool>,

    // Bumped whenever the game is replaced, so late summaries are dropped.
    generation: u64,
    summary_in_flight: bool,
    summary_sender: mpsc::UnboundedSender<SummaryUpdate>,
    summary_receiver: Option<mpsc::UnboundedReceiver<SummaryUpdate>>,

    save_manager: SaveManager,
    save_name: Option<String>,
    last_saved: Option<Instant>,

    rng: StdRng,
}

impl<G: GenerationService + 'static> GameSession<G> {
    pub fn new(service: Arc<G>, settings: Settings, save_manager: SaveManager) -> Self {
        let (summary_sender, summary_receiver) = mpsc::unbounded_channel();
        Self {
            service,
            settings,
            character: None,
            game_state: GameState::new(),
            history: ChatHistory::new(),
            busy: Arc::new(AtomicBool::new(false)),
            generation: 0,
            summary_in_flight: false,
            summary_sender,
            summary_receiver: Some(summary_receiver),
            save_manager,
            save_name: None,
            last_saved: None,
            rng: StdRng::from_os_rng(),
        }
    }

    // Deterministic dice, for tests and replays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn service(&self) -> Arc<G> {
        Arc::clone(&self.service)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn character(&self) -> Option<&CharacterSheet> {
        self.character.as_ref()
    }

    pub fn character_mut(&mut self) -> Option<&mut CharacterSheet> {
        self.character.as_mut()
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn game_log(&self) -> &GameLog {
        &self.game_state.game_log
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn current_roll(&self) -> Option<&RollResult> {
        self.game_state.current_roll.as_ref()
    }

    pub fn study_check(&self) -> &StudyCheck {
        &self.game_state.study_check
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Name the game was last saved or loaded under.
    pub fn save_name(&self) -> Option<&str> {
        self.save_name.as_deref()
    }

    pub fn save_manager(&self) -> &SaveManager {
        &self.save_manager
    }

    pub fn build_context(&self) -> ConversationContext {
        build_context(&self.history, self.character.as_ref(), &self.game_state)
    }

    // ---- Turns

    /// Record the player's line and freeze the context for the Game Master.
    pub fn begin_turn(&mut self, message: impl Into<String>) -> Result<PendingTurn, GameError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            log::warn!("Rejected a message while the Game Master is still answering");
            return Err(GameError::SessionBusy);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));
        let message = message.into();
        self.history.push(ChatMessage::user(message.clone()));
        Ok(PendingTurn {
            context: self.build_context(),
            message,
            generation: self.generation,
            guard,
        })
    }

    /// Apply the Game Master's answer (or failure) to a pending turn.
    pub fn finish_turn(
        &mut self,
        turn: PendingTurn,
        response: Result<String, AIError>,
    ) -> TurnOutcome {
        drop(turn.guard);
        if turn.generation != self.generation {
            log::warn!("Dropping a Game Master reply for a game that was replaced");
            return TurnOutcome::Failed {
                reason: "The game changed before the Game Master answered".to_string(),
                transient: true,
            };
        }

        let text = match response {
            Ok(text) => text,
            Err(e) => {
                log::error!("Game Master request failed: {e}");
                self.history.push(ChatMessage::error(e.to_string()));
                self.game_state
                    .game_log
                    .append(GameLogEntry::message(format!("Game Master unavailable: {e}")));
                return TurnOutcome::Failed {
                    reason: e.to_string(),
                    transient: e.is_transient(),
                };
            }
        };

        let dice_request = detect_dice_request(&text);
        self.game_state.set_dice_request(dice_request);
        if let Some(die) = dice_request {
            log::info!("Game Master asked for a {die} roll");
            self.game_state
                .game_log
                .append(GameLogEntry::message(format!("The Game Master asks for a {die} roll")));
        }
        self.history.push(ChatMessage::assistant(text.clone()));

        self.maybe_request_summary();
        self.maybe_auto_save();

        TurnOutcome::Narration { text, dice_request }
    }

    /// Run one full turn against the generation service.
    pub async fn send_message(
        &mut self,
        message: impl Into<String>,
    ) -> Result<TurnOutcome, GameError> {
        let turn = self.begin_turn(message)?;
        let response = self.service.generate(&turn.message, &turn.context).await;
        Ok(self.finish_turn(turn, response))
    }

    // ---- Dice

    /// Pick up a die. Reads the study mode setting once per roll.
    pub fn initiate_roll(&mut self, die: DieSpec) -> Result<RollStart, GameError> {
        if self.settings.study_mode {
            let request = self
                .game_state
                .study_check
                .start(die, &mut self.game_state.game_log)?;
            return Ok(RollStart::StudyCheck(request));
        }

        if let Some(active) = self.game_state.study_check.active() {
            return Err(GameError::StateContractViolation(
                StudyCheckViolation::AlreadyActive(active.die()),
            ));
        }
        let result = RollResult::immediate(die, &mut self.rng);
        log::info!("Direct roll without study check: {}", result.describe());
        self.game_state.game_log.append(GameLogEntry::roll(&result));
        self.game_state.current_roll = Some(result.clone());
        Ok(RollStart::Immediate(result))
    }

    /// Finish the outstanding study check with the player's score.
    pub fn answer_study_check(&mut self, correct_answers: i64) -> Result<RollResult, GameError> {
        let active = self.game_state.study_check.take_active().ok_or(
            GameError::StateContractViolation(StudyCheckViolation::NotActive),
        )?;
        let result = active.complete(
            correct_answers,
            &mut self.game_state.game_log,
            &mut self.rng,
        );
        self.game_state.current_roll = Some(result.clone());
        Ok(result)
    }

    /// Tell the Game Master how a roll went.
    pub async fn report_roll(&mut self, result: &RollResult) -> Result<TurnOutcome, GameError> {
        self.send_message(result.feedback_message()).await
    }

    /// Initiate a roll and, when it resolves immediately, report it.
    pub async fn roll(
        &mut self,
        die: DieSpec,
    ) -> Result<(RollStart, Option<TurnOutcome>), GameError> {
        if self.is_busy() {
            return Err(GameError::SessionBusy);
        }
        let start = self.initiate_roll(die)?;
        let outcome = match &start {
            RollStart::Immediate(result) => Some(self.report_roll(result).await?),
            RollStart::StudyCheck(_) => None,
        };
        Ok((start, outcome))
    }

    /// Complete the study check and report the roll.
    pub async fn complete_study_check(
        &mut self,
        correct_answers: i64,
    ) -> Result<(RollResult, TurnOutcome), GameError> {
        // Checked first so a busy session does not swallow the roll.
        if self.is_busy() {
            return Err(GameError::SessionBusy);
        }
        let result = self.answer_study_check(correct_answers)?;
        let outcome = self.report_roll(&result).await?;
        Ok((result, outcome))
    }

    // ---- Game lifecycle

    /// Reset the conversation and open a new campaign with this character.
    pub async fn start_new_game(
        &mut self,
        character: CharacterSheet,
        campaign_name: Option<String>,
    ) -> Result<TurnOutcome, GameError> {
        if self.is_busy() {
            return Err(GameError::SessionBusy);
        }
        let campaign_name = campaign_name.unwrap_or_else(|| DEFAULT_CAMPAIGN.to_string());
        log::info!("Starting new game '{campaign_name}' as {}", character.name);

        let introduction = character.introduction();
        self.replace_game(
            character,
            GameState::start(campaign_name),
            ChatHistory::new(),
        );
        self.save_name = None;
        self.send_message(introduction).await
    }

    fn replace_game(
        &mut self,
        character: CharacterSheet,
        game_state: GameState,
        history: ChatHistory,
    ) {
        self.character = Some(character);
        self.game_state = game_state;
        self.history = history;
        self.generation += 1;
        self.summary_in_flight = false;
        self.last_saved = None;
    }

    pub fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        Ok(GameSnapshot {
            character_state: self.character.clone().ok_or(GameError::NoCharacter)?,
            game_state: self.game_state.clone(),
            chat_state: self.history.clone(),
        })
    }

    pub fn restore(&mut self, snapshot: GameSnapshot) {
        self.replace_game(
            snapshot.character_state,
            snapshot.game_state,
            snapshot.chat_state,
        );
    }

    /// Write the game under `save_name`. Failures are logged, not raised.
    pub fn save_game(&mut self, save_name: &str) -> bool {
        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Nothing to save: {e}");
                return false;
            }
        };
        match self.save_manager.save(save_name, &snapshot) {
            Ok(_) => {
                self.save_name = Some(save_name.to_string());
                self.last_saved = Some(Instant::now());
                true
            }
            Err(e) => {
                log::error!("Failed to save game '{save_name}': {e}");
                false
            }
        }
    }

    /// Replace the current game with a saved one. Failures are logged.
    pub fn load_game(&mut self, save_name: &str) -> bool {
        if self.is_busy() {
            log::warn!("Refusing to load '{save_name}' while the Game Master is answering");
            return false;
        }
        match self.save_manager.load(save_name) {
            Ok(snapshot) => {
                self.restore(snapshot);
                self.save_name = Some(save_name.to_string());
                self.last_saved = Some(Instant::now());
                true
            }
            Err(e) => {
                log::error!("Failed to load game '{save_name}': {e}");
                false
            }
        }
    }

    pub fn available_saves(&mut self) -> Vec<String> {
        self.save_manager.refresh().to_vec()
    }

    fn maybe_auto_save(&mut self) {
        if !self.settings.auto_save {
            return;
        }
        let Some(save_name) = self.save_name.clone() else {
            return;
        };
        let interval = Duration::from_secs(self.settings.auto_save_interval * 60);
        let due = self
            .last_saved
            .is_none_or(|last_saved| last_saved.elapsed() >= interval);
        if due && self.save_game(&save_name) {
            log::debug!("Auto-saved '{save_name}'");
        }
    }

    // ---- Summaries

    fn maybe_request_summary(&mut self) {
        if self.summary_in_flight || !should_summarize(&self.history) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!("No async runtime available, skipping conversation summary");
            return;
        };

        self.summary_in_flight = true;
        let service = Arc::clone(&self.service);
        let sender = self.summary_sender.clone();
        let messages = self.history.messages.clone();
        let generation = self.generation;
        log::info!("Requesting a summary of {} messages", messages.len());

        handle.spawn(async move {
            let result = service.summarize(&messages).await;
            // The receiver only disappears with the session.
            let _ = sender.send(SummaryUpdate { generation, result });
        });
    }

    /// Hand the summary channel to an event loop that wants to `select!` on it.
    pub fn take_summary_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<SummaryUpdate>> {
        self.summary_receiver.take()
    }

    /// Store a finished summary. Returns true when it was kept.
    pub fn apply_summary(&mut self, update: SummaryUpdate) -> bool {
        if update.generation != self.generation {
            log::debug!("Discarding a summary from a previous game");
            return false;
        }
        self.summary_in_flight = false;
        match update.result {
            Ok(summary) if self.history.conversation_summary.is_none() => {
                log::info!("Conversation summary stored");
                self.history.conversation_summary = Some(summary);
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::warn!("Conversation summary failed: {e}");
                false
            }
        }
    }

    /// Apply every summary that has already arrived.
    pub fn apply_pending_summaries(&mut self) -> usize {
        let mut updates = Vec::new();
        if let Some(receiver) = self.summary_receiver.as_mut() {
            while let Ok(update) = receiver.try_recv() {
                updates.push(update);
            }
        }
        updates
            .into_iter()
            .map(|update| self.apply_summary(update))
            .filter(|kept| *kept)
            .count()
    }

    /// Wait for the background summary, if one is running.
    pub async fn wait_for_summary(&mut self) -> bool {
        if !self.summary_in_flight {
            return false;
        }
        let update = match self.summary_receiver.as_mut() {
            Some(receiver) => receiver.recv().await,
            None => None,
        };
        update.is_some_and(|update| self.apply_summary(update))
    }

    /// Ask for a fresh summary now, replacing any existing one.
    pub async fn regenerate_summary(&mut self) -> Result<(), AIError> {
        let summary = self.service.summarize(&self.history.messages).await?;
        self.history.conversation_summary = Some(summary);
        log::info!("Conversation summary regenerated");
        Ok(())
    }
}
