// ../tests/dice.rs
use rand::SeedableRng;
use rand::rngs::StdRng;
use study_master::ai_response::detect_dice_request;
use study_master::dice::*;
use study_master::error::StudyCheckViolation;
use study_master::game_log::{GAME_LOG_CAPACITY, GameLog, GameLogEntry};
use study_master::*;

const ALL_DICE: [DieSpec; 7] = [
    DieSpec::D4,
    DieSpec::D6,
    DieSpec::D8,
    DieSpec::D10,
    DieSpec::D12,
    DieSpec::D20,
    DieSpec::D100,
];

#[test]
fn test_roll_die_stays_in_range() {
    let mut rng = StdRng::seed_from_u64(42);
    for die in ALL_DICE {
        for _ in 0..500 {
            let roll = roll_die_with(die, &mut rng);
            assert!((1..=die.faces()).contains(&roll), "{die} rolled {roll}");
        }
    }
}

#[test]
fn test_roll_die_hits_every_face() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut seen = [0u32; 6];
    for _ in 0..6000 {
        seen[(roll_die_with(DieSpec::D6, &mut rng) - 1) as usize] += 1;
    }
    // Roughly uniform: each face near 1000.
    assert!(seen.iter().all(|&count| (800..1200).contains(&count)), "{seen:?}");
}

#[test]
fn test_die_parsing() {
    assert_eq!(DieSpec::parse("d20"), Ok(DieSpec::D20));
    assert_eq!(DieSpec::parse("D100"), Ok(DieSpec::D100));
    assert_eq!(DieSpec::parse("8"), Ok(DieSpec::D8));
    assert!(matches!(
        DieSpec::parse("d7"),
        Err(GameError::InvalidDieType(_))
    ));
    assert!(DieSpec::from_faces(3).is_err());
    assert_eq!(DieSpec::D12.to_string(), "d12");
}

#[test]
fn test_question_count_is_half_the_faces() {
    assert_eq!(question_count(DieSpec::D20), 10);
    assert_eq!(question_count(DieSpec::D6), 3);
    assert_eq!(question_count(DieSpec::D4), 2);
    assert_eq!(question_count(DieSpec::D100), 50);
}

#[test]
fn test_point_buy_costs() {
    assert_eq!(point_buy_cost(8), Ok(0));
    assert_eq!(point_buy_cost(13), Ok(5));
    assert_eq!(point_buy_cost(14), Ok(7));
    assert_eq!(point_buy_cost(15), Ok(9));
    assert_eq!(point_buy_cost(7), Err(GameError::InvalidScore(7)));
    assert_eq!(point_buy_cost(16), Err(GameError::InvalidScore(16)));
    assert_eq!(total_point_buy_cost(&[15, 15, 15, 8, 8, 8]), Ok(27));
}

#[test]
fn test_ability_modifier_rounds_down() {
    assert_eq!(ability_modifier(10), 0);
    assert_eq!(ability_modifier(11), 0);
    assert_eq!(ability_modifier(15), 2);
    assert_eq!(ability_modifier(9), -1);
    assert_eq!(ability_modifier(8), -1);
    assert_eq!(ability_modifier(1), -5);
}

#[test]
fn test_penalty_clamps_answers() {
    let mut rng = StdRng::seed_from_u64(3);

    let too_many = RollResult::with_penalty(DieSpec::D20, 10, 999, &mut rng);
    assert_eq!(too_many.correct_answers, 10);
    assert_eq!(too_many.wrong_answers, 0);
    assert_eq!(too_many.modified_max, 20);

    let negative = RollResult::with_penalty(DieSpec::D20, 10, -4, &mut rng);
    assert_eq!(negative.correct_answers, 0);
    assert_eq!(negative.wrong_answers, 10);
    assert_eq!(negative.modified_max, 10);
}

#[test]
fn test_small_die_with_no_correct_answers() {
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..200 {
        let result = RollResult::with_penalty(DieSpec::D4, 2, 0, &mut rng);
        assert_eq!(result.wrong_answers, 2);
        assert_eq!(result.modified_max, 2);
        assert!((1..=2).contains(&result.outcome));
    }
}

#[test]
fn test_feedback_message() {
    let result = RollResult {
        die: DieSpec::D20,
        raw_face_count: 20,
        total_questions: 10,
        correct_answers: 7,
        wrong_answers: 3,
        modified_max: 17,
        outcome: 12,
    };
    assert_eq!(
        result.feedback_message(),
        "I rolled a 12 on a d20. (I answered 7 out of 10 study questions correctly, so my maximum possible roll was 17.)"
    );
}

#[test]
fn test_study_check_lifecycle() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut log = GameLog::new();
    let mut check = StudyCheck::default();

    let request = check.start(DieSpec::D20, &mut log).unwrap();
    assert_eq!(request.total_questions, 10);
    assert!(check.is_active());
    assert_eq!(
        check.start(DieSpec::D6, &mut log),
        Err(GameError::StateContractViolation(
            StudyCheckViolation::AlreadyActive(DieSpec::D20)
        ))
    );

    let active = check.take_active().unwrap();
    assert!(!check.is_active());
    assert!(check.take_active().is_none());

    let result = active.complete(7, &mut log, &mut rng);
    assert_eq!(result.wrong_answers, 3);
    assert_eq!(result.modified_max, 17);
    assert!((1..=17).contains(&result.outcome));

    let entries = log.snapshot();
    assert_eq!(entries.len(), 2);
    match &entries[0] {
        GameLogEntry::System { content, .. } => {
            assert_eq!(content, "Study check started for d20 roll. (Answer 10 questions)")
        }
        other => panic!("unexpected entry {other:?}"),
    }
    assert!(matches!(
        entries[1],
        GameLogEntry::Roll { modified_max: 17, .. }
    ));
}

#[test]
fn test_study_check_serializes_as_flags() {
    let mut log = GameLog::new();
    let mut check = StudyCheck::default();
    check.start(DieSpec::D8, &mut log).unwrap();

    let json = serde_json::to_value(&check).unwrap();
    assert_eq!(json["studyCheckActive"], true);
    assert_eq!(json["studyCheckDie"], "d8");

    let restored: StudyCheck = serde_json::from_value(json).unwrap();
    assert_eq!(restored, check);
}

#[test]
fn test_game_log_keeps_latest_entries() {
    let mut log = GameLog::new();
    for i in 0..60 {
        log.append(GameLogEntry::system(format!("entry {i}")));
    }
    assert_eq!(log.len(), GAME_LOG_CAPACITY);
    match log.iter().next() {
        Some(GameLogEntry::System { content, .. }) => assert_eq!(content, "entry 10"),
        other => panic!("unexpected entry {other:?}"),
    }
    match log.last() {
        Some(GameLogEntry::System { content, .. }) => assert_eq!(content, "entry 59"),
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn test_detect_dice_request() {
    assert_eq!(
        detect_dice_request("Please roll a d20 for perception"),
        Some(DieSpec::D20)
    );
    assert_eq!(detect_dice_request("I walked into the d20 tavern"), None);
    assert_eq!(
        detect_dice_request("Make a Dexterity saving throw with your D12, or a d20 if you prefer."),
        Some(DieSpec::D12)
    );
    // Whole tokens only.
    assert_eq!(detect_dice_request("Roll the d200 of doom"), None);
    assert_eq!(detect_dice_request("Make a check."), None);
}

#[test]
fn test_character_point_buy_accounting() {
    let mut sheet = CharacterSheet::new("Mira", "Elf", "Wizard");
    let starting = sheet.point_buy_remaining;

    sheet.set_attribute(Ability::Intelligence, 15);
    let after_raise = sheet.point_buy_remaining;
    // 15 costs 9, 10 costs 2.
    assert_eq!(starting - after_raise, 7);
    assert_eq!(sheet.modifier(Ability::Intelligence), 2);

    sheet.set_attribute(Ability::Intelligence, 10);
    assert_eq!(sheet.point_buy_remaining, starting);

    // Racial bonuses push scores past the table; they are free.
    sheet.set_attribute(Ability::Strength, 17);
    assert_eq!(sheet.attributes.get(Ability::Strength), 17);
    assert_eq!(sheet.modifier(Ability::Strength), 3);
    assert_eq!(sheet.point_buy_remaining, starting + 2);

    sheet.set_attribute(Ability::Strength, 8);
    assert_eq!(sheet.point_buy_remaining, starting + 2);

    sheet.set_attribute(Ability::Dexterity, 14);
    assert_eq!(sheet.initiative, 2);
}

#[test]
fn test_character_introduction() {
    let sheet = CharacterSheet::new("Mira", "Elf", "Wizard");
    assert_eq!(
        sheet.introduction(),
        "I'm playing as Mira, a level 1 Elf Wizard. Please start our adventure with an engaging introduction to the world and my first scene."
    );
}
