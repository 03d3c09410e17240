//! Catalog use-case service: fallback-routed writes and merged reads.
//!
//! # Responsibility
//! - Attempt every write against the remote catalog first.
//! - On a blocked failure class, land the equivalent mutation in the local
//!   overlay and report a degraded success.
//! - Propagate every other failure untouched.
//!
//! # Invariants
//! - This is the only place that decides whether a remote failure is
//!   recoverable; repository and merge code never see the distinction.
//! - A propagated failure leaves the overlay unchanged.
//! - Result messages name the affected id; callers display them verbatim.

use crate::merge::compose::{compose_detail, compose_list, ListFilter};
use crate::model::movie::{Movie, MoviePatch, MovieValidationError};
use crate::remote::gateway::{CatalogGateway, RemoteError};
use crate::repo::overlay_repo::{OverlayRepository, RepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Local precondition violated; nothing was attempted.
    Validation(MovieValidationError),
    /// Overlay persistence failure.
    Repo(RepoError),
    /// Remote failure outside the blocked classification, surfaced verbatim.
    Remote(RemoteError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<MovieValidationError> for ServiceError {
    fn from(value: MovieValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of a fallback-routed write.
///
/// Both variants are success from the UI's point of view; only the message
/// text tells the user whether the write landed remotely or locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    RemoteSuccess { message: String },
    LocalFallback { message: String },
}

impl WriteOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::RemoteSuccess { message } | Self::LocalFallback { message } => message,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::LocalFallback { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum WriteKind {
    Create,
    Update,
    Delete,
}

/// Blocked classification per write method.
///
/// A transport failure is always blocked. The catalog answers 403/405 when a
/// write verb is disabled; updates additionally fall back on any 4xx/5xx.
fn is_blocked(kind: WriteKind, err: &RemoteError) -> bool {
    match err {
        RemoteError::Transport(_) => true,
        RemoteError::Status { status, .. } => match kind {
            WriteKind::Create | WriteKind::Delete => matches!(status, 403 | 405),
            WriteKind::Update => (400..=599).contains(status),
        },
        RemoteError::Decode(_) => false,
    }
}

fn blocked_reason(err: &RemoteError) -> String {
    match err {
        RemoteError::Transport(_) => "network unreachable".to_string(),
        RemoteError::Status { status, .. } => format!("rejected with HTTP {status}"),
        RemoteError::Decode(message) => format!("undecodable response: {message}"),
    }
}

/// Use-case service over an overlay repository and a catalog gateway.
pub struct CatalogService<R, G> {
    repo: R,
    gateway: G,
}

impl<R: OverlayRepository, G: CatalogGateway> CatalogService<R, G> {
    pub fn new(repo: R, gateway: G) -> Self {
        Self { repo, gateway }
    }

    /// Direct access to the overlay for admin-style read-modify-write flows
    /// that bypass reconciliation.
    pub fn overlay(&self) -> &R {
        &self.repo
    }

    /// Creates a record remotely, falling back to a local add when blocked.
    ///
    /// The id is required up front: the local fallback cannot store an
    /// unidentifiable record, and a demo write must not succeed or fail
    /// depending on where it lands.
    pub fn create_movie(&self, movie: &Movie) -> ServiceResult<WriteOutcome> {
        movie.validate()?;
        let id = movie.imdb_id.as_str();

        match self.gateway.create(movie) {
            Ok(()) => Ok(remote_success(
                WriteKind::Create,
                id,
                format!("Movie {id} created in the remote catalog"),
            )),
            Err(err) if is_blocked(WriteKind::Create, &err) => {
                self.repo.add_movie(movie)?;
                Ok(local_fallback(
                    WriteKind::Create,
                    id,
                    &err,
                    format!(
                        "Remote create blocked ({}); movie {id} saved locally",
                        blocked_reason(&err)
                    ),
                ))
            }
            Err(err) => Err(ServiceError::Remote(err)),
        }
    }

    /// Updates a record remotely, falling back to a stored override when
    /// blocked. The override stores exactly the attempted payload.
    pub fn update_movie(&self, id: &str, patch: &MoviePatch) -> ServiceResult<WriteOutcome> {
        let id = require_id(id)?;

        match self.gateway.update_by_id(id, patch) {
            Ok(()) => Ok(remote_success(
                WriteKind::Update,
                id,
                format!("Movie {id} updated in the remote catalog"),
            )),
            Err(err) if is_blocked(WriteKind::Update, &err) => {
                self.repo.set_override(id, patch)?;
                Ok(local_fallback(
                    WriteKind::Update,
                    id,
                    &err,
                    format!(
                        "Remote update blocked ({}); changes for {id} saved locally",
                        blocked_reason(&err)
                    ),
                ))
            }
            Err(err) => Err(ServiceError::Remote(err)),
        }
    }

    /// Deletes a record remotely, falling back to a tombstone when blocked.
    pub fn delete_movie(&self, id: &str) -> ServiceResult<WriteOutcome> {
        let id = require_id(id)?;

        match self.gateway.delete_by_id(id) {
            Ok(()) => Ok(remote_success(
                WriteKind::Delete,
                id,
                format!("Movie {id} deleted from the remote catalog"),
            )),
            Err(err) if is_blocked(WriteKind::Delete, &err) => {
                self.repo.delete(id)?;
                Ok(local_fallback(
                    WriteKind::Delete,
                    id,
                    &err,
                    format!(
                        "Remote delete blocked ({}); movie {id} marked deleted locally",
                        blocked_reason(&err)
                    ),
                ))
            }
            Err(err) => Err(ServiceError::Remote(err)),
        }
    }

    /// Fetches the remote list and merges it with the overlay.
    ///
    /// Remote failures propagate: the caller's error state is distinct from
    /// its empty-result state and the two must not be conflated.
    pub fn fetch_list(&self, filter: &ListFilter) -> ServiceResult<Vec<Movie>> {
        let remote = self
            .gateway
            .list_query(filter)
            .map_err(ServiceError::Remote)?;
        Ok(compose_list(&remote, filter, &self.repo)?)
    }

    /// Fetches one record and merges it with the overlay.
    ///
    /// Remote failures degrade to an absent base so locally-added records
    /// stay reachable while the catalog is down.
    pub fn fetch_detail(&self, id: &str) -> ServiceResult<Option<Movie>> {
        let remote = match self.gateway.get_by_id(id) {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    "event=fetch_detail module=service status=degraded imdb_id={id} error={err}"
                );
                None
            }
        };
        Ok(compose_detail(remote, id, &self.repo)?)
    }

    /// Stores an edit locally: folds the patch into the local add when `id`
    /// was created locally, otherwise records an override.
    pub fn stage_edit(&self, id: &str, patch: &MoviePatch) -> ServiceResult<String> {
        let id = require_id(id)?;

        if let Some(mut added) = self.repo.get_add(id)? {
            patch.apply_to(&mut added);
            self.repo.add_movie(&added)?;
        } else {
            self.repo.set_override(id, patch)?;
        }

        Ok(format!("Saved changes for {id}"))
    }

    /// Removes a record locally: a local add is removed outright, anything
    /// else gets a tombstone.
    pub fn discard_local(&self, id: &str) -> ServiceResult<String> {
        let id = require_id(id)?;

        if self.repo.get_add(id)?.is_some() {
            self.repo.remove_add(id)?;
            Ok(format!("Removed locally added movie {id}"))
        } else {
            self.repo.delete(id)?;
            Ok(format!("Movie {id} marked as deleted"))
        }
    }

    /// Reverts a tombstone.
    pub fn restore(&self, id: &str) -> ServiceResult<String> {
        let id = require_id(id)?;
        self.repo.undelete(id)?;
        Ok(format!("Delete undone for {id}"))
    }

    /// Wipes every local mutation.
    pub fn reset_local(&self) -> ServiceResult<String> {
        self.repo.reset_all()?;
        Ok("Cleared local overrides, adds and deletes".to_string())
    }
}

fn require_id(id: &str) -> Result<&str, ServiceError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ServiceError::Validation(MovieValidationError::MissingId));
    }
    Ok(id)
}

fn remote_success(kind: WriteKind, id: &str, message: String) -> WriteOutcome {
    info!(
        "event=remote_write module=service status=ok op={} imdb_id={id}",
        op_name(kind)
    );
    WriteOutcome::RemoteSuccess { message }
}

fn local_fallback(kind: WriteKind, id: &str, err: &RemoteError, message: String) -> WriteOutcome {
    warn!(
        "event=remote_write module=service status=local_fallback op={} imdb_id={id} error={err}",
        op_name(kind)
    );
    WriteOutcome::LocalFallback { message }
}

fn op_name(kind: WriteKind) -> &'static str {
    match kind {
        WriteKind::Create => "create",
        WriteKind::Update => "update",
        WriteKind::Delete => "delete",
    }
}
