//! Detection of "the table has no such column" write failures.
//!
//! Structured first: a store error carrying an undefined-column code names
//! the column in its first quoted token, or failing that in the identifier
//! after the word `column`. Only when the store sent no code at
//! all does the message heuristic run, and it is kept narrow: the message
//! must mention `column` and name one of the record's own fields as a whole
//! identifier.

use crate::record::PersistableRecord;
use crate::store::{codes, StoreError};

const UNDEFINED_COLUMN_CODES: &[&str] = &[codes::COLUMN_NOT_IN_SCHEMA_CACHE, codes::UNDEFINED_COLUMN];

/// How a missing column was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    ErrorCode,
    MessageHeuristic,
}

/// A write failure attributed to one column of the written record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    pub column: String,
    pub detection: Detection,
}

/// The column of `record` (a field name, or `media_field` when the record
/// carries media) that `err` reports as missing, if any.
pub fn missing_column(
    err: &StoreError,
    record: &PersistableRecord,
    media_field: Option<&str>,
) -> Option<MissingColumn> {
    let written = |name: &str| {
        record.contains(name) || (record.media().is_some() && media_field == Some(name))
    };

    match err.code.as_deref() {
        Some(code) if UNDEFINED_COLUMN_CODES.contains(&code) => {
            let column = first_quoted(&err.message).or_else(|| after_column_word(&err.message))?;
            let column = column.rsplit('.').next().unwrap_or(column);
            written(column).then(|| MissingColumn {
                column: column.to_string(),
                detection: Detection::ErrorCode,
            })
        }
        Some(_) => None,
        None => {
            if !err.message.to_ascii_lowercase().contains("column") {
                return None;
            }
            let media = record.media().and(media_field);
            record
                .field_names()
                .chain(media)
                .find(|name| contains_identifier(&err.message, name))
                .map(|name| MissingColumn {
                    column: name.to_string(),
                    detection: Detection::MessageHeuristic,
                })
        }
    }
}

fn first_quoted(message: &str) -> Option<&str> {
    let (start, quote) = message
        .char_indices()
        .find(|(_, c)| *c == '\'' || *c == '"')?;
    let rest = &message[start + 1..];
    let end = rest.find(quote)?;
    let token = &rest[..end];
    (!token.is_empty()).then_some(token)
}

/// `column events.description does not exist` names `events.description`.
fn after_column_word(message: &str) -> Option<&str> {
    let lower = message.to_ascii_lowercase();
    lower.match_indices("column").find_map(|(at, word)| {
        let before = lower[..at].chars().next_back();
        if before.map(is_ident_char).unwrap_or(false) {
            return None;
        }
        let rest = &message[at + word.len()..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();
        let end = rest
            .find(|c: char| !(is_ident_char(c) || c == '.'))
            .unwrap_or(rest.len());
        let token = rest[..end].trim_matches('.');
        (!token.is_empty()).then_some(token)
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `needle` occurs in `haystack` with no identifier character on either side.
fn contains_identifier(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        !before.map(is_ident_char).unwrap_or(false) && !after.map(is_ident_char).unwrap_or(false)
    })
}
