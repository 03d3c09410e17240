//! List and detail composition over the overlay tables.
//!
//! # Responsibility
//! - `compose_list`: filter tombstones out of the remote list, splice
//!   overrides, and surface matching local adds first.
//! - `compose_detail`: resolve one record with tombstone precedence and
//!   fallback to locally-added records.
//!
//! # Invariants
//! - Delete wins over override and add for the same id.
//! - Locally-added records come first so demo edits are visible without
//!   scrolling; remote order is preserved after them.
//! - Remote records with an empty id pass through unidentified and unmerged.

use crate::model::movie::{Movie, MoviePatch};
use crate::repo::overlay_repo::{OverlayRepository, RepoResult};
use std::collections::BTreeMap;

/// Case-insensitive substring filter for list composition.
///
/// Only locally-added records are matched against it; remote records are
/// assumed pre-filtered by the gateway's query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    title: String,
    ubication: String,
}

impl ListFilter {
    /// Components are trimmed once here; the gateway forwards them verbatim
    /// as query parameters and matching lowercases on comparison.
    pub fn new(title: &str, ubication: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            ubication: ubication.trim().to_string(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn ubication(&self) -> &str {
        &self.ubication
    }

    /// An empty filter component always matches; both active components must
    /// match for the record to be included.
    pub fn matches(&self, movie: &Movie) -> bool {
        contains_ci(movie.title.as_deref(), &self.title)
            && contains_ci(movie.ubication.as_deref(), &self.ubication)
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    field
        .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

/// Merges a remote list payload with the overlay into the rendered sequence.
///
/// Matching local adds come first in table iteration order, followed by the
/// tombstone-filtered, override-spliced remote records in remote order.
pub fn compose_list<R: OverlayRepository>(
    remote: &[Movie],
    filter: &ListFilter,
    repo: &R,
) -> RepoResult<Vec<Movie>> {
    let deletes = repo.get_deletes()?;
    let overrides = repo.get_overrides()?;
    let adds = repo.get_adds()?;

    let mut composed: Vec<Movie> = adds
        .into_values()
        .filter(|movie| !deletes.contains(movie.imdb_id.as_str()))
        .filter(|movie| filter.matches(movie))
        .collect();

    for movie in remote {
        let id = movie.imdb_id.as_str();
        if !id.is_empty() && deletes.contains(id) {
            continue;
        }
        composed.push(with_override(movie.clone(), &overrides));
    }

    Ok(composed)
}

/// Merges one remote record (possibly absent) with the overlay.
///
/// Resolution order: explicit `id` argument, then the record's own id. An
/// empty id means there is nothing to reconcile against and the remote value
/// is returned unchanged.
pub fn compose_detail<R: OverlayRepository>(
    remote: Option<Movie>,
    id: &str,
    repo: &R,
) -> RepoResult<Option<Movie>> {
    let id = match id.trim() {
        "" => remote
            .as_ref()
            .map(|movie| movie.imdb_id.clone())
            .unwrap_or_default(),
        explicit => explicit.to_string(),
    };

    if id.is_empty() {
        return Ok(remote);
    }
    if repo.is_deleted(&id)? {
        return Ok(None);
    }

    let mut base = match remote {
        Some(movie) => movie,
        None => match repo.get_add(&id)? {
            Some(added) => added,
            None => return Ok(None),
        },
    };

    // Keyed by the resolved id, not the record's own field, so an override
    // still applies when the remote payload spells its id differently.
    if let Some(patch) = repo.get_overrides()?.get(id.as_str()) {
        patch.apply_to(&mut base);
    }

    Ok(Some(base))
}

fn with_override(mut movie: Movie, overrides: &BTreeMap<String, MoviePatch>) -> Movie {
    if let Some(patch) = overrides.get(movie.imdb_id.as_str()) {
        patch.apply_to(&mut movie);
    }
    movie
}
