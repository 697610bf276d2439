//! Looks up a requester by full name and lists the assets assigned to them.

use tracing::{error, info, instrument};

use crate::freshservice::report::error::{ReportError, Result};
use crate::freshservice::report::model::{Asset, Requester};
use crate::freshservice::report::source::AssetSource;

/// Given name and family name of a requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName {
    pub first_name: String,
    pub last_name: String,
}

impl FullName {
    /// Joins the words with spaces and splits at the first space: the first
    /// word is the given name, the rest is the family name.
    pub fn parse<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        let joined = words
            .iter()
            .map(|word| word.as_ref())
            .collect::<Vec<&str>>()
            .join(" ");
        let trimmed = joined.trim();

        match trimmed.split_once(' ') {
            Some((first, last)) if !last.trim().is_empty() => Ok(Self {
                first_name: first.to_string(),
                last_name: last.trim().to_string(),
            }),
            _ => Err(ReportError::InvalidName(trimmed.to_string())),
        }
    }
}

/// A matched requester and the assets assigned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAssets {
    pub requester: Requester,
    pub assets: Vec<Asset>,
}

/// Finds the first requester called `name` and the assets assigned to them.
/// Service failures are logged and reported as "not found" or "no assets".
#[instrument(level = "info", skip(source))]
pub fn find_user_assets<S: AssetSource + ?Sized>(
    source: &S,
    name: &FullName,
) -> Option<UserAssets> {
    let requester = match source.find_requester(&name.first_name, &name.last_name) {
        Ok(Some(requester)) => requester,
        Ok(None) => {
            info!("no requester matched");
            return None;
        }
        Err(err) => {
            error!(error = %err, "failed to search for requester");
            return None;
        }
    };

    let assets = match requester.id {
        Some(user_id) => source.assets_for_user(user_id).unwrap_or_else(|err| {
            error!(user_id, error = %err, "failed to list assets for requester");
            Vec::new()
        }),
        None => Vec::new(),
    };
    info!(asset_count = assets.len(), "requester resolved");

    Some(UserAssets { requester, assets })
}
