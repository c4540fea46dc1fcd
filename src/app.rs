// /app.rs
use crate::{
    ai::GenerationService,
    character::{Ability, CharacterSheet},
    dice::DieSpec,
    error::GameError,
    game_log::GameLogEntry,
    logging,
    session::{GameSession, RollStart, SummaryUpdate, TurnOutcome},
};

use std::path::PathBuf;
use strum::IntoEnumIterator;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  <text>                               talk to the Game Master
  /roll <die>                          roll d4, d6, d8, d10, d12, d20 or d100
  /answer <n>                          finish a study check with n correct answers
  /new <name> <race> <class> [campaign] start a new game
  /save [name]                         save the game
  /load <name>                         load a saved game
  /saves                               list saved games
  /log                                 show the game log
  /status                              show campaign, location and quest
  /study on|off                        toggle study checks before rolls
  /debug on|off                        toggle debug logging
  /summary                             regenerate the conversation summary
  /help                                show this help
  /quit                                leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Say(String),
    Roll(DieSpec),
    Answer(i64),
    NewGame {
        name: String,
        race: String,
        class: String,
        campaign: Option<String>,
    },
    Save(Option<String>),
    Load(String),
    ListSaves,
    ShowLog,
    Status,
    SetStudyMode(bool),
    SetDebugMode(bool),
    RegenerateSummary,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: /{0} (try /help)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Game(#[from] GameError),
}

fn parse_switch(argument: Option<&str>, usage: &'static str) -> Result<bool, CommandError> {
    match argument.map(str::to_lowercase).as_deref() {
        Some("on") | Some("true") => Ok(true),
        Some("off") | Some("false") => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

// Answer counts are clamped by the roll itself, so out-of-range numbers
// saturate instead of failing to parse.
fn parse_answer_count(word: &str) -> Option<i64> {
    if let Ok(count) = word.parse::<i64>() {
        return Some(count);
    }
    let (negative, digits) = match word.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, word.strip_prefix('+').unwrap_or(word)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

impl Action {
    /// Parse one line of player input. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Action, CommandError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Ok(Action::Say(line.to_string())));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default().to_lowercase();
        let rest: Vec<&str> = words.collect();

        let action = match name.as_str() {
            "quit" | "exit" => Ok(Action::Quit),
            "help" => Ok(Action::Help),
            "roll" => match rest.first() {
                Some(die) => DieSpec::parse(die)
                    .map(Action::Roll)
                    .map_err(CommandError::from),
                None => Err(CommandError::Usage("/roll <die>")),
            },
            "answer" => rest
                .first()
                .and_then(|n| parse_answer_count(n))
                .map(Action::Answer)
                .ok_or(CommandError::Usage("/answer <number of correct answers>")),
            "new" => match rest.as_slice() {
                [name, race, class, campaign @ ..] => Ok(Action::NewGame {
                    name: name.to_string(),
                    race: race.to_string(),
                    class: class.to_string(),
                    campaign: (!campaign.is_empty()).then(|| campaign.join(" ")),
                }),
                _ => Err(CommandError::Usage("/new <name> <race> <class> [campaign]")),
            },
            "save" => Ok(Action::Save((!rest.is_empty()).then(|| rest.join(" ")))),
            "load" if !rest.is_empty() => Ok(Action::Load(rest.join(" "))),
            "load" => Err(CommandError::Usage("/load <name>")),
            "saves" => Ok(Action::ListSaves),
            "log" => Ok(Action::ShowLog),
            "status" => Ok(Action::Status),
            "study" => parse_switch(rest.first().copied(), "/study on|off").map(Action::SetStudyMode),
            "debug" => parse_switch(rest.first().copied(), "/debug on|off").map(Action::SetDebugMode),
            "summary" => Ok(Action::RegenerateSummary),
            other => Err(CommandError::Unknown(other.to_string())),
        };
        Some(action)
    }
}

pub fn describe_log_entry(entry: &GameLogEntry) -> String {
    let time = entry.timestamp().format("%H:%M:%S");
    match entry {
        GameLogEntry::System { content, .. } => format!("[{time}] {content}"),
        GameLogEntry::Roll {
            die_type,
            result,
            modified_max,
            ..
        } => format!("[{time}] Rolled {result} on {die_type} (max {modified_max})"),
        GameLogEntry::Message { content, .. } => format!("[{time}] {content}"),
    }
}

fn describe_outcome(outcome: TurnOutcome) -> Vec<String> {
    match outcome {
        TurnOutcome::Narration { text, dice_request } => {
            let mut lines = vec![format!("GM: {text}")];
            if let Some(die) = dice_request {
                lines.push(format!("(The Game Master asks for a {die}: type /roll {die})"));
            }
            lines
        }
        TurnOutcome::Failed { reason, transient } => {
            let mut lines = vec![format!("Error: {reason}")];
            if transient {
                lines.push("Try again in a moment.".to_string());
            }
            lines
        }
    }
}

fn describe_result(result: Result<TurnOutcome, GameError>) -> Vec<String> {
    match result {
        Ok(outcome) => describe_outcome(outcome),
        Err(e) => vec![e.to_string()],
    }
}

/// Line-oriented front end driving one [`GameSession`].
pub struct App<G: GenerationService + 'static> {
    running: bool,
    session: GameSession<G>,
    // Where setting changes are written; `None` keeps them in memory.
    settings_path: Option<PathBuf>,
}

impl<G: GenerationService + 'static> App<G> {
    pub fn new(session: GameSession<G>) -> Self {
        Self {
            running: true,
            session,
            settings_path: None,
        }
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session(&self) -> &GameSession<G> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession<G> {
        &mut self.session
    }

    /// Parse and run one line. Returns the lines to show the player.
    pub async fn handle_line(&mut self, line: &str) -> Vec<String> {
        match Action::parse(line) {
            None => Vec::new(),
            Some(Ok(action)) => self.handle_action(action).await,
            Some(Err(e)) => vec![e.to_string()],
        }
    }

    pub async fn handle_action(&mut self, action: Action) -> Vec<String> {
        match action {
            Action::Quit => {
                self.quit();
                vec!["Farewell, adventurer.".to_string()]
            }
            Action::Help => vec![HELP.to_string()],
            Action::Say(text) => {
                if self.session.character().is_none() {
                    return vec!["Start a game first: /new <name> <race> <class> [campaign]".to_string()];
                }
                let outcome = self.session.send_message(text).await;
                describe_result(outcome)
            }
            Action::Roll(die) => match self.session.roll(die).await {
                Ok((RollStart::StudyCheck(request), _)) => vec![format!(
                    "Study check for a {}: answer {} questions, then type /answer <correct>.",
                    request.die, request.total_questions
                )],
                Ok((RollStart::Immediate(result), outcome)) => {
                    let mut lines = vec![result.describe()];
                    lines.extend(outcome.into_iter().flat_map(describe_outcome));
                    lines
                }
                Err(e) => vec![e.to_string()],
            },
            Action::Answer(correct) => match self.session.complete_study_check(correct).await {
                Ok((result, outcome)) => {
                    let mut lines = vec![result.describe()];
                    lines.extend(describe_outcome(outcome));
                    lines
                }
                Err(e) => vec![e.to_string()],
            },
            Action::NewGame {
                name,
                race,
                class,
                campaign,
            } => {
                let character = CharacterSheet::new(name, race, class);
                let outcome = self.session.start_new_game(character, campaign).await;
                describe_result(outcome)
            }
            Action::Save(name) => self.save(name),
            Action::Load(name) => {
                if self.session.load_game(&name) {
                    let mut lines = vec![format!("Loaded '{name}'.")];
                    if let Some(last) = self.session.history().last() {
                        lines.push(format!("Last message: {}", last.content));
                    }
                    lines
                } else {
                    vec![format!("Could not load '{name}'. See the log for details.")]
                }
            }
            Action::ListSaves => {
                let saves = self.session.available_saves();
                if saves.is_empty() {
                    vec!["No saved games.".to_string()]
                } else {
                    saves
                }
            }
            Action::ShowLog => {
                let log = self.session.game_log();
                if log.is_empty() {
                    vec!["The game log is empty.".to_string()]
                } else {
                    log.iter().map(describe_log_entry).collect()
                }
            }
            Action::Status => {
                let state = self.session.game_state();
                let mut lines = vec![
                    format!("Campaign: {}", state.campaign_name),
                    format!("Location: {}", state.current_location),
                    format!("Quest: {}", state.current_quest),
                ];
                if let Some(character) = self.session.character() {
                    lines.push(format!(
                        "Character: {}, level {} {} {} ({}/{} HP)",
                        character.name,
                        character.level,
                        character.race,
                        character.class,
                        character.hp.current,
                        character.hp.max
                    ));
                    let scores: Vec<String> = Ability::iter()
                        .map(|ability| {
                            format!(
                                "{} {} ({:+})",
                                &ability.as_ref()[..3],
                                character.attributes.get(ability),
                                character.modifier(ability)
                            )
                        })
                        .collect();
                    lines.push(scores.join(", "));
                }
                if let Some(die) = state.requested_dice_type {
                    lines.push(format!("Waiting for a {die} roll."));
                }
                if let Some(active) = self.session.study_check().active() {
                    lines.push(format!(
                        "Study check in progress for a {} ({} questions).",
                        active.die(),
                        active.total_questions()
                    ));
                }
                lines
            }
            Action::SetStudyMode(enabled) => {
                self.session.settings_mut().study_mode = enabled;
                self.persist_settings();
                vec![format!("Study mode {}.", if enabled { "on" } else { "off" })]
            }
            Action::SetDebugMode(enabled) => {
                self.session.settings_mut().debug_mode = enabled;
                logging::set_debug(enabled);
                self.persist_settings();
                vec![format!("Debug mode {}.", if enabled { "on" } else { "off" })]
            }
            Action::RegenerateSummary => match self.session.regenerate_summary().await {
                Ok(()) => vec!["Conversation summary updated.".to_string()],
                Err(e) => vec![format!("Could not summarize: {e}")],
            },
        }
    }

    fn save(&mut self, name: Option<String>) -> Vec<String> {
        let Some(name) = name.or_else(|| self.session.save_name().map(String::from)) else {
            return vec!["Usage: /save <name>".to_string()];
        };
        if self.session.save_game(&name) {
            vec![format!("Saved as '{name}'.")]
        } else {
            vec![format!("Could not save '{name}'. See the log for details.")]
        }
    }

    pub fn handle_summary(&mut self, update: SummaryUpdate) {
        self.session.apply_summary(update);
    }

    fn persist_settings(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = self.session.settings().save_to_file(path) {
            log::error!("Failed to save settings: {e}");
        }
    }

    fn quit(&mut self) {
        self.running = false;
    }
}
