// ../tests/persistence.rs
mod common;

use common::{ScriptedService, session_with};
use serde_json::json;
use std::fs;
use study_master::app::{Action, App, CommandError};
use study_master::game_log::GameLogEntry;
use study_master::save::{GameSnapshot, SaveManager};
use study_master::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let service = ScriptedService::new().reply("Roll a d20 for initiative!");
    let (mut session, _service, dir) = session_with(service, true);
    session
        .start_new_game(CharacterSheet::new("Brom", "Dwarf", "Fighter"), None)
        .await
        .unwrap();
    session.initiate_roll(DieSpec::D20).unwrap();

    assert!(session.save_game("brom"));
    assert!(dir.path().join("brom.json").is_file());
    assert_eq!(session.available_saves(), vec!["brom".to_string()]);
    let saved = session.snapshot().unwrap();

    // A fresh session sharing the save directory picks the game up again.
    let (mut other, _, _other_dir) = session_with(ScriptedService::new(), true);
    let mut other_saves = SaveManager::new(dir.path());
    assert_eq!(other_saves.refresh(), ["brom".to_string()]);
    let loaded = other_saves.load("brom").unwrap();
    assert_eq!(loaded, saved);

    other.restore(loaded);
    assert_eq!(other.character().unwrap().name, "Brom");
    assert!(other.study_check().is_active());
    assert_eq!(other.game_state().requested_dice_type, Some(DieSpec::D20));
    assert_eq!(other.history().len(), 2);
}

#[tokio::test]
async fn test_save_without_character_fails() {
    let (mut session, _service, dir) = session_with(ScriptedService::new(), true);
    assert!(!session.save_game("empty"));
    assert!(!dir.path().join("empty.json").exists());
    assert!(matches!(session.snapshot(), Err(GameError::NoCharacter)));
}

#[test]
fn test_snapshot_uses_save_file_keys() {
    let snapshot = GameSnapshot {
        character_state: CharacterSheet::new("Ysolde", "Human", "Rogue"),
        game_state: GameState::start("Harbor"),
        chat_state: ChatHistory::new(),
    };
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["characterState"]["name"], "Ysolde");
    assert_eq!(value["gameState"]["campaignName"], "Harbor");
    assert_eq!(value["gameState"]["studyCheckActive"], false);
    assert_eq!(value["gameState"]["gameLog"][0]["type"], "system");
    assert!(value["chatState"]["messages"].is_array());
}

#[test]
fn test_malformed_snapshots_are_rejected() {
    assert!(matches!(
        GameSnapshot::from_value(json!([1, 2, 3])),
        Err(SaveError::MalformedSnapshot(_))
    ));
    assert!(matches!(
        GameSnapshot::from_value(json!({ "gameState": {} })),
        Err(SaveError::MalformedSnapshot(_))
    ));
    assert!(matches!(
        GameSnapshot::from_value(json!({ "characterState": "Brom", "gameState": {} })),
        Err(SaveError::MalformedSnapshot(_))
    ));

    // Missing chat state and unknown fields fall back to defaults.
    let snapshot = GameSnapshot::from_value(json!({
        "characterState": { "name": "Brom" },
        "gameState": { "campaignName": "Mines", "studyCheckActive": true, "studyCheckDie": "d6" },
    }))
    .unwrap();
    assert_eq!(snapshot.character_state.name, "Brom");
    assert_eq!(snapshot.game_state.campaign_name, "Mines");
    assert!(snapshot.game_state.study_check.is_active());
    assert!(snapshot.chat_state.is_empty());
}

#[tokio::test]
async fn test_load_rejects_bad_files_and_keeps_game() {
    let (mut session, _service, dir) = session_with(ScriptedService::new(), true);
    session
        .start_new_game(CharacterSheet::new("Brom", "Dwarf", "Fighter"), None)
        .await
        .unwrap();
    fs::write(dir.path().join("broken.json"), r#"{"characterState": 5}"#).unwrap();

    assert!(!session.load_game("broken"));
    assert!(!session.load_game("missing"));
    assert!(!session.load_game("../escape"));
    assert_eq!(session.character().unwrap().name, "Brom");
}

#[test]
fn test_save_manager_names() {
    let dir = TempDir::new().unwrap();
    let mut manager = SaveManager::new(dir.path());
    let snapshot = GameSnapshot {
        character_state: CharacterSheet::new("A", "Elf", "Bard"),
        game_state: GameState::new(),
        chat_state: ChatHistory::new(),
    };

    assert!(matches!(
        manager.save("", &snapshot),
        Err(SaveError::InvalidName(_))
    ));
    assert!(matches!(
        manager.save("a/b", &snapshot),
        Err(SaveError::InvalidName(_))
    ));
    assert!(matches!(manager.load("nope"), Err(SaveError::NotFound(_))));

    manager.save("zeta", &snapshot).unwrap();
    manager.save("alpha", &snapshot).unwrap();
    assert_eq!(manager.available_saves, vec!["alpha", "zeta"]);

    manager.delete_save("zeta").unwrap();
    assert_eq!(manager.available_saves, vec!["alpha"]);
    assert!(matches!(
        manager.delete_save("zeta"),
        Err(SaveError::NotFound(_))
    ));
}

#[test]
fn test_settings_defaults_and_partial_files() {
    let settings = Settings::default();
    assert!(settings.study_mode);
    assert!(settings.auto_save);
    assert_eq!(settings.auto_save_interval, 5);
    assert_eq!(settings.model, "gpt-4o-mini");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{"study_mode": false, "language": "French"}"#).unwrap();
    let loaded = Settings::load_settings_from_file(&path).unwrap();
    assert!(!loaded.study_mode);
    assert_eq!(loaded.language, "French");
    assert!(loaded.auto_save);

    let mut changed = loaded.clone();
    changed.openai_api_key = Some("sk-test".to_string());
    changed.toggle_debug_mode();
    changed.save_to_file(&path).unwrap();
    assert_eq!(Settings::load_settings_from_file(&path).unwrap(), changed);

    changed.reset();
    assert_eq!(changed.openai_api_key.as_deref(), Some("sk-test"));
    assert!(changed.study_mode);
    assert!(!changed.debug_mode);
}

#[test]
fn test_command_parsing() {
    assert_eq!(Action::parse("   "), None);
    assert_eq!(
        Action::parse("I draw my sword"),
        Some(Ok(Action::Say("I draw my sword".to_string())))
    );
    assert_eq!(Action::parse("/roll D12"), Some(Ok(Action::Roll(DieSpec::D12))));
    assert_eq!(Action::parse("/answer -2"), Some(Ok(Action::Answer(-2))));
    assert_eq!(
        Action::parse("/new Brom Dwarf Fighter The Deep Mines"),
        Some(Ok(Action::NewGame {
            name: "Brom".to_string(),
            race: "Dwarf".to_string(),
            class: "Fighter".to_string(),
            campaign: Some("The Deep Mines".to_string()),
        }))
    );
    assert_eq!(Action::parse("/study off"), Some(Ok(Action::SetStudyMode(false))));
    assert!(matches!(
        Action::parse("/roll d3"),
        Some(Err(CommandError::Game(GameError::InvalidDieType(_))))
    ));
    assert!(matches!(
        Action::parse("/dance"),
        Some(Err(CommandError::Unknown(_)))
    ));
    assert!(matches!(Action::parse("/new Brom"), Some(Err(CommandError::Usage(_)))));
}

#[test]
fn test_answer_counts_saturate() {
    assert_eq!(
        Action::parse("/answer 99999999999999999999"),
        Some(Ok(Action::Answer(i64::MAX)))
    );
    assert_eq!(
        Action::parse("/answer -99999999999999999999"),
        Some(Ok(Action::Answer(i64::MIN)))
    );
    assert!(matches!(
        Action::parse("/answer lots"),
        Some(Err(CommandError::Usage(_)))
    ));
    assert!(matches!(
        Action::parse("/answer -"),
        Some(Err(CommandError::Usage(_)))
    ));
}

#[tokio::test]
async fn test_huge_answer_counts_as_all_correct() {
    let (session, _service, _dir) = session_with(ScriptedService::new(), true);
    let mut app = App::new(session);
    app.handle_line("/new Brom Dwarf Fighter").await;
    app.handle_line("/roll d20").await;

    let lines = app.handle_line("/answer 99999999999999999999").await;
    assert!(lines[0].starts_with("Rolled "));
    let roll = app.session().current_roll().unwrap();
    assert_eq!(roll.correct_answers, 10);
    assert_eq!(roll.modified_max, 20);
}

#[tokio::test]
async fn test_app_drives_a_game() {
    let service = ScriptedService::new().reply("Welcome! Roll a d6 to see how far you fall.");
    let (session, _service, _dir) = session_with(service, true);
    let mut app = App::new(session);

    let lines = app.handle_line("hello?").await;
    assert!(lines[0].starts_with("Start a game first"));

    let lines = app.handle_line("/new Brom Dwarf Fighter").await;
    assert_eq!(lines[0], "GM: Welcome! Roll a d6 to see how far you fall.");
    assert!(lines[1].contains("/roll d6"));

    let lines = app.handle_line("/roll d6").await;
    assert!(lines[0].contains("answer 3 questions"));

    let lines = app.handle_line("/answer 3").await;
    assert!(lines[0].starts_with("Rolled "));
    assert!(app.session().current_roll().is_some());

    let lines = app.handle_line("/answer 1").await;
    assert_eq!(lines, vec!["Study check used out of order: no study check is active"]);

    let lines = app.handle_line("/status").await;
    assert!(lines.iter().any(|line| line.starts_with("str 10 (+0)")));

    app.handle_line("/study off").await;
    assert!(!app.session().settings().study_mode);

    app.handle_line("/quit").await;
    assert!(!app.is_running());
}

#[test]
fn test_loads_legacy_roll_shapes() {
    // Direct roll: no `totalQuestions` on the roll, no `modifiedMax` in the log.
    let direct = GameSnapshot::from_value(json!({
        "characterState": { "name": "Brom" },
        "gameState": {
            "currentRoll": {
                "dieType": "d6",
                "result": 4,
                "originalMax": 6,
                "modifiedMax": 6,
                "correctAnswers": 0,
                "wrongAnswers": 0
            },
            "gameLog": [
                { "type": "roll", "dieType": "d6", "result": 4, "timestamp": "2024-01-01T00:00:00.000Z" }
            ]
        }
    }))
    .unwrap();
    let roll = direct.game_state.current_roll.unwrap();
    assert_eq!(roll.total_questions, 0);
    assert_eq!(roll.modified_max, 6);
    assert_eq!(roll.outcome, 4);
    assert!(matches!(
        direct.game_state.game_log.last(),
        Some(GameLogEntry::Roll { modified_max: 6, result: 4, .. })
    ));

    // Study-check roll: totals rebuilt from the answer counts.
    let studied = GameSnapshot::from_value(json!({
        "characterState": { "name": "Brom" },
        "gameState": {
            "currentRoll": {
                "dieType": "d20",
                "result": 11,
                "originalMax": 20,
                "modifiedMax": 17,
                "correctAnswers": 7,
                "wrongAnswers": 3
            },
            "gameLog": [
                { "type": "system", "content": "Study check started for d20 roll. (Answer 10 questions)", "timestamp": "2024-01-01T00:00:00.000Z" },
                { "type": "roll", "dieType": "d20", "result": 11, "modifiedMax": 17, "timestamp": "2024-01-01T00:01:00.000Z" }
            ]
        }
    }))
    .unwrap();
    let roll = studied.game_state.current_roll.unwrap();
    assert_eq!(roll.total_questions, 10);
    assert_eq!(roll.raw_face_count, 20);
    assert_eq!(roll.modified_max, 17);
    assert_eq!(
        roll.feedback_message(),
        "I rolled a 11 on a d20. (I answered 7 out of 10 study questions correctly, so my maximum possible roll was 17.)"
    );
    assert_eq!(studied.game_state.game_log.len(), 2);
}

#[tokio::test]
async fn test_auto_save_rewrites_current_save() {
    let (mut session, _service, dir) = session_with(ScriptedService::new(), true);
    session
        .start_new_game(CharacterSheet::new("Brom", "Dwarf", "Fighter"), None)
        .await
        .unwrap();
    assert!(session.save_game("brom"));
    session.settings_mut().auto_save = true;
    session.settings_mut().auto_save_interval = 0;

    session.send_message("I light a torch").await.unwrap();
    let on_disk = fs::read_to_string(dir.path().join("brom.json")).unwrap();
    assert!(on_disk.contains("I light a torch"));
}

#[tokio::test]
async fn test_auto_save_off_leaves_save_alone() {
    let (mut session, _service, dir) = session_with(ScriptedService::new(), true);
    session
        .start_new_game(CharacterSheet::new("Brom", "Dwarf", "Fighter"), None)
        .await
        .unwrap();
    assert!(session.save_game("brom"));
    session.settings_mut().auto_save = false;
    session.settings_mut().auto_save_interval = 0;

    session.send_message("I light a torch").await.unwrap();
    let on_disk = fs::read_to_string(dir.path().join("brom.json")).unwrap();
    assert!(!on_disk.contains("I light a torch"));
}
