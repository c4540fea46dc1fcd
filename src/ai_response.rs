// src/ai_response.rs
use crate::dice::DieSpec;
use once_cell::sync::Lazy;
use regex::Regex;

// Whole-word die tokens, case-insensitive.
static DIE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(d4|d6|d8|d10|d12|d20|d100)\b").expect("valid regex"));

// Phrases that mark a die mention as an actual request to roll.
pub const ROLL_PHRASES: [&str; 8] = [
    "roll",
    "make a",
    "perform a",
    "check",
    "saving throw",
    "attack roll",
    "skill check",
    "ability check",
];

/// Scan a Game Master reply for a dice-roll request.
///
/// A request needs both a die token and one of [`ROLL_PHRASES`] somewhere in
/// the text; the first die token mentioned wins.
pub fn detect_dice_request(response: &str) -> Option<DieSpec> {
    let first_die = DIE_TOKEN.find(response)?;
    let lowered = response.to_lowercase();
    if !ROLL_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return None;
    }
    DieSpec::parse(first_die.as_str()).ok()
}

// Prompt asking for a recap of the conversation so far.
pub fn summary_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following D&D game conversation into a brief summary that captures the key plot points, character decisions, and significant events. Focus on narrative progression rather than mechanics.\n\nConversation to summarize:\n{transcript}\n\nSummary:"
    )
}
