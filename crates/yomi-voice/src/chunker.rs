//! Splitting text into synthesis-sized pieces

use crate::error::{Result, VoiceError};

/// Split `text` into consecutive pieces of `max_chars` characters.
///
/// Every piece but the last holds exactly `max_chars` characters and the
/// pieces concatenate back to `text`. Empty input yields no pieces.
pub fn chunk_text(text: &str, max_chars: usize) -> Result<Vec<String>> {
    if max_chars == 0 {
        return Err(VoiceError::ConfigError(
            "chunk size must be greater than 0".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let split_at = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());

        let (head, tail) = remaining.split_at(split_at);
        chunks.push(head.to_string());
        remaining = tail;
    }

    Ok(chunks)
}
