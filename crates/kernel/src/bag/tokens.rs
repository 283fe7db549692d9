//! Comma-separated token list validation.
//!
//! Uid lists arrive as free text (`"1, 2,3"`). One parser serves every
//! caller; what happens to malformed tokens is decided by a [`Policy`]
//! chosen per filter.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{BagError, ErrorCode};

/// Digits only, no sign, no whitespace inside.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static POSITIVE_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid regex literal"));

/// Letters, digits, spaces and hyphens (city, country and language names).
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static SAFE_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N} \-]+$").expect("valid regex literal"));

/// How a caller treats malformed tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Any malformed token fails the whole call with `InvalidArgument`.
    Strict,
    /// Malformed tokens are dropped; valid ones are kept.
    Permissive,
}

/// Result of splitting a raw uid list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    /// Every valid, strictly positive uid.
    pub ids: BTreeSet<u32>,
    /// Whether every token was valid.
    pub all_valid: bool,
}

impl TokenList {
    /// True when the raw input held no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.all_valid
    }
}

/// Split `raw` on commas and validate each trimmed token as a positive integer.
///
/// Empty input yields an empty, fully valid list. Zero, signs, embedded
/// characters, empty tokens between commas and values beyond `u32` are all
/// invalid.
pub fn parse_positive_integer_list(raw: &str) -> TokenList {
    let mut list = TokenList {
        ids: BTreeSet::new(),
        all_valid: true,
    };
    if raw.trim().is_empty() {
        return list;
    }

    for token in raw.split(',').map(str::trim) {
        match parse_positive_integer(token) {
            Some(id) => {
                list.ids.insert(id);
            }
            None => list.all_valid = false,
        }
    }
    list
}

fn parse_positive_integer(token: &str) -> Option<u32> {
    if !POSITIVE_INTEGER.is_match(token) {
        return None;
    }
    token.parse::<u32>().ok().filter(|id| *id > 0)
}

/// Parse a uid list under `policy`.
///
/// An empty result means "filter unset" for the caller.
pub fn parse_uid_list(raw: &str, policy: Policy) -> Result<BTreeSet<u32>, BagError> {
    let list = parse_positive_integer_list(raw);
    if list.all_valid {
        return Ok(list.ids);
    }

    match policy {
        Policy::Strict => Err(BagError::invalid_argument(
            ErrorCode::MalformedUidList,
            format!(
                "\"{raw}\" is not a comma-separated list of positive integers, e.g. \"1,2,3\""
            ),
        )),
        Policy::Permissive => {
            tracing::warn!(raw = %raw, kept = list.ids.len(), "dropped malformed uid tokens");
            Ok(list.ids)
        }
    }
}

/// Split `raw` on commas and keep only trimmed, non-empty tokens made of
/// safe characters. Unsafe tokens are dropped, never raised.
pub fn parse_safe_string_list(raw: &str) -> Vec<String> {
    let mut kept = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if SAFE_STRING.is_match(token) {
            if !kept.iter().any(|k| k == token) {
                kept.push(token.to_string());
            }
        } else {
            tracing::warn!(token = %token, "dropped unsafe list token");
        }
    }
    kept
}

/// Require a strictly positive uid.
pub fn require_positive_uid(uid: i64, what: &str) -> Result<u32, BagError> {
    u32::try_from(uid)
        .ok()
        .filter(|uid| *uid > 0)
        .ok_or_else(|| {
            BagError::invalid_argument(
                ErrorCode::NonPositiveUid,
                format!("{what} must be a positive integer, got {uid}"),
            )
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ids(list: &[u32]) -> BTreeSet<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn splits_and_trims() {
        let list = parse_positive_integer_list(" 1, 2 ,3");
        assert!(list.all_valid);
        assert_eq!(list.ids, ids(&[1, 2, 3]));
    }

    #[test]
    fn empty_input_is_valid_and_empty() {
        let list = parse_positive_integer_list("  ");
        assert!(list.is_empty());
    }

    #[test]
    fn zero_and_garbage_are_invalid() {
        for raw in ["0", "-1", "1a", "1;", "1 2", ";", "99999999999"] {
            assert!(
                !parse_positive_integer_list(raw).all_valid,
                "{raw} should be invalid"
            );
        }
    }

    #[test]
    fn strict_rejects_any_bad_token() {
        let err = parse_uid_list("1,;,2", Policy::Strict).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::MalformedUidList));
        assert!(parse_uid_list("0", Policy::Strict).is_err());
    }

    #[test]
    fn permissive_keeps_valid_tokens() {
        let kept = parse_uid_list("5,abc,,7", Policy::Permissive).unwrap();
        assert_eq!(kept, ids(&[5, 7]));
    }

    #[test]
    fn safe_strings_drop_injection_attempts() {
        let kept = parse_safe_string_list("Bonn, Köln,  ' OR 1=1 --, Sankt-Augustin, Bonn");
        assert_eq!(kept, vec!["Bonn", "Köln", "Sankt-Augustin"]);
    }

    #[test]
    fn positive_uid_required() {
        assert_eq!(require_positive_uid(4, "event").unwrap(), 4);
        let err = require_positive_uid(0, "event").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::NonPositiveUid));
        assert!(require_positive_uid(-3, "event").is_err());
    }
}
