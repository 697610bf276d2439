//! Expansion of asset ID specifications such as `143,150-155` into concrete
//! asset identifiers.
//!
//! A specification is either a literal list or the path of a text file that
//! holds one. Tokens are separated by commas (newlines also separate tokens
//! in files). Each token is a single non-negative integer or an inclusive
//! `start-end` range. Bad tokens are reported and skipped; they never abort
//! the expansion.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::freshservice::report::error::Result;

/// Numeric identifier of an asset as shown by the service.
pub type AssetId = u64;

/// Largest `end - start` accepted for a single range token.
pub const MAX_RANGE_SPAN: AssetId = 100_000;

/// One successfully parsed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdToken {
    Single(AssetId),
    Range { start: AssetId, end: AssetId },
}

impl IdToken {
    fn push_into(self, ids: &mut Vec<AssetId>) {
        match self {
            IdToken::Single(id) => ids.push(id),
            IdToken::Range { start, end } => ids.extend(start..=end),
        }
    }
}

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid range '{0}'")]
    InvalidRange(String),
    #[error("invalid ID '{0}'")]
    InvalidId(String),
    #[error("range '{0}' is too large")]
    RangeTooLarge(String),
}

/// Returns the text of `raw`: the file contents when `raw` names an existing
/// file, otherwise `raw` itself.
pub fn resolve_spec(raw: &str) -> Result<String> {
    let path = Path::new(raw);
    if path.is_file() {
        debug!(path = %path.display(), "reading asset IDs from file");
        return Ok(fs::read_to_string(path)?);
    }
    Ok(raw.to_string())
}

/// Parses a single trimmed token.
pub fn parse_token(token: &str) -> std::result::Result<IdToken, TokenError> {
    if let Some((start, end)) = token.split_once('-') {
        let invalid = || TokenError::InvalidRange(token.to_string());
        let start = parse_number(start.trim()).ok_or_else(invalid)?;
        let end = parse_number(end.trim()).ok_or_else(invalid)?;
        if start > end {
            return Err(invalid());
        }
        if end.checked_sub(start).is_none_or(|span| span > MAX_RANGE_SPAN) {
            return Err(TokenError::RangeTooLarge(token.to_string()));
        }
        return Ok(IdToken::Range { start, end });
    }

    parse_number(token)
        .map(IdToken::Single)
        .ok_or_else(|| TokenError::InvalidId(token.to_string()))
}

fn parse_number(text: &str) -> Option<AssetId> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Expands already-resolved specification text into IDs, in input order.
/// Duplicates are kept.
pub fn parse_ids(text: &str) -> Vec<AssetId> {
    let mut ids = Vec::new();
    for token in text.split([',', '\n']).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        match parse_token(token) {
            Ok(parsed) => parsed.push_into(&mut ids),
            Err(error) => warn!(%error, "skipping token"),
        }
    }
    ids
}

/// Expands `spec` and removes every ID that appears in the expansion of
/// `exclude`, keeping the order of what remains.
pub fn expand(spec: &str, exclude: Option<&str>) -> Result<Vec<AssetId>> {
    let mut ids = parse_ids(&resolve_spec(spec)?);

    if let Some(exclude) = exclude {
        let excluded: HashSet<AssetId> = parse_ids(&resolve_spec(exclude)?).into_iter().collect();
        ids.retain(|id| !excluded.contains(id));
    }

    debug!(count = ids.len(), "expanded asset IDs");
    Ok(ids)
}
