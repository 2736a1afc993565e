//! Chat text normalization before speech synthesis

use regex::Regex;

use crate::prefs::Dictionary;
use crate::{Error, Result};

/// Spoken in place of each link
pub const URL_PLACEHOLDER: &str = "URL";
/// Appended to truncated messages
pub const ELLIPSIS: &str = "，以下省略";

/// Turns a chat message into text worth reading aloud
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    max_chars: usize,
    code_block: Regex,
    url: Regex,
    custom_emoji: Regex,
}

impl TextNormalizer {
    /// Create a normalizer truncating beyond `max_chars` characters
    pub fn new(max_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(Error::Config(
                "max_text_length must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            max_chars,
            code_block: compile(r"```[\s\S]*?```")?,
            url: compile(r"https?://[^\s]+")?,
            custom_emoji: compile(r"<a?:.+?:\d+>")?,
        })
    }

    /// Normalize `text`, returning `None` when nothing speakable remains.
    ///
    /// Dictionary entries are applied first, in insertion order, so a later
    /// entry may rewrite the reading inserted by an earlier one.
    pub fn normalize(&self, text: &str, dictionary: &Dictionary) -> Option<String> {
        let text = apply_dictionary(text, dictionary);
        let text = self.code_block.replace_all(&text, "");

        let speakable = self.url.replace_all(&text, "");
        if self.custom_emoji.replace_all(&speakable, "").trim().is_empty() {
            return None;
        }

        let text = self.url.replace_all(&text, URL_PLACEHOLDER);
        let text = self.custom_emoji.replace_all(&text, "");

        Some(truncate(&text, self.max_chars))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("Invalid pattern {}: {}", pattern, e)))
}

/// Literal replacement of every dictionary word by its reading
pub fn apply_dictionary(text: &str, dictionary: &Dictionary) -> String {
    dictionary
        .iter()
        .filter(|(word, _)| !word.is_empty())
        .fold(text.to_string(), |acc, (word, reading)| {
            acc.replace(word.as_str(), reading)
        })
}

/// Keep the first `max_chars` characters, marking the cut with [`ELLIPSIS`]
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
