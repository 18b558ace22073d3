//! Language-tagged value selection.
//!
//! One rule everywhere: the first candidate tagged with the preferred
//! language wins, otherwise the first candidate in source order, otherwise
//! nothing. Display names, titles, phonetic readings and XML summaries all
//! go through [`select_preferred`] with a different tag.

use serde_json::Value;

/// Japanese
pub const JA: &str = "ja";
/// English
pub const EN: &str = "en";
/// Katakana phonetic reading
pub const JA_KANA: &str = "ja-Kana";

/// First candidate whose tag equals `lang`
pub fn select_exact<'a, T, F>(candidates: &'a [T], lang: &str, tag_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    candidates.iter().find(|c| tag_of(*c) == Some(lang))
}

/// First candidate tagged `lang`, else the first candidate
pub fn select_preferred<'a, T, F>(candidates: &'a [T], lang: &str, tag_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    select_exact(candidates, lang, tag_of).or_else(|| candidates.first())
}

/// One `{ "lang": ..., "text": ... }` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedValue<'a> {
    pub language: Option<&'a str>,
    pub text: &'a str,
}

impl<'a> LocalizedValue<'a> {
    /// Read every entry with non-blank string text from a JSON array (or single object)
    pub fn collect(value: Option<&'a Value>) -> Vec<LocalizedValue<'a>> {
        super::as_array(value)
            .iter()
            .filter_map(|entry| {
                let text = entry.get("text")?.as_str()?.trim();
                if text.is_empty() {
                    return None;
                }
                Some(LocalizedValue {
                    language: entry.get("lang").and_then(Value::as_str),
                    text,
                })
            })
            .collect()
    }
}

/// Text preferring `lang`, falling back to the first entry
pub fn resolve_text(value: Option<&Value>, lang: &str) -> Option<String> {
    let candidates = LocalizedValue::collect(value);
    select_preferred(&candidates, lang, |c| c.language).map(|c| c.text.to_string())
}

/// Text tagged exactly `lang`, with no fallback
pub fn resolve_exact_text(value: Option<&Value>, lang: &str) -> Option<String> {
    let candidates = LocalizedValue::collect(value);
    select_exact(&candidates, lang, |c| c.language).map(|c| c.text.to_string())
}
