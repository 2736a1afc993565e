//! Named VOICEVOX characters users can pick with `/voice`

use crate::tts::SpeakerId;

/// Character name → VOICEVOX speaker, in display order
pub const CHARACTERS: &[(&str, u32)] = &[
    ("ずんだもん", 3),
    ("めたん", 2),
    ("ずん子", 1),
    ("つむぎ", 8),
    ("雨晴", 10),
    ("冥鳴", 14),
];

/// Look up a character by exact name
pub fn resolve_character(name: &str) -> Option<SpeakerId> {
    CHARACTERS
        .iter()
        .find(|(n, _)| *n == name.trim())
        .map(|&(_, id)| SpeakerId(id))
}

/// Character names joined for a reply
pub fn character_list() -> String {
    CHARACTERS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join("，")
}
