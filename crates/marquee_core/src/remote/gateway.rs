//! HTTP gateway for the remote movie catalog.
//!
//! # Responsibility
//! - Issue the list/detail/create/update/delete requests with the query
//!   parameter names the catalog expects.
//! - Decode loose payloads (single object or one-element array) into typed
//!   records.
//!
//! # Invariants
//! - `get_by_id` treats a non-2xx response as "not found", not as an error.
//! - Write failures carry the status code and raw body text so the caller
//!   can classify and display them.

use crate::merge::compose::ListFilter;
use crate::model::movie::{Movie, MoviePatch};
use log::{debug, warn};
use reqwest::blocking::Client;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Production catalog endpoint.
pub const DEFAULT_BASE_URL: &str = "https://movie.azurewebsites.net/api/cartelera";

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Structured remote failure.
///
/// The write router classifies on these variants; no string heuristics.
#[derive(Debug)]
pub enum RemoteError {
    /// Opaque network-level failure (DNS, refused connection, CORS-style
    /// block, timeout). No response was received.
    Transport(String),
    /// The remote answered with a non-2xx status.
    Status { status: u16, body: String },
    /// The remote answered 2xx but the body was not decodable.
    Decode(String),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "network failure: {message}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Decode(message) => write!(f, "undecodable response body: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Request surface of the remote catalog.
///
/// A trait seam so the write router and read flows can be exercised against
/// scripted doubles without a network.
pub trait CatalogGateway {
    /// GET with `title`/`ubication` query parameters.
    fn list_query(&self, filter: &ListFilter) -> RemoteResult<Vec<Movie>>;
    /// GET with the `imdbID` query parameter.
    fn get_by_id(&self, id: &str) -> RemoteResult<Option<Movie>>;
    /// POST with a JSON record body.
    fn create(&self, movie: &Movie) -> RemoteResult<()>;
    /// PUT with the `imdbID` query parameter and a JSON patch body.
    fn update_by_id(&self, id: &str, patch: &MoviePatch) -> RemoteResult<()>;
    /// DELETE with the `imdbID` query parameter.
    fn delete_by_id(&self, id: &str) -> RemoteResult<()>;
}

/// Blocking HTTP implementation of [`CatalogGateway`].
pub struct HttpCatalogGateway {
    base_url: String,
    client: Client,
}

impl HttpCatalogGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::builder()
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for HttpCatalogGateway {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl CatalogGateway for HttpCatalogGateway {
    fn list_query(&self, filter: &ListFilter) -> RemoteResult<Vec<Movie>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("title", filter.title()), ("ubication", filter.ubication())])
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(decode_list(payload))
    }

    fn get_by_id(&self, id: &str) -> RemoteResult<Option<Movie>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("imdbID", id)])
            .send()
            .map_err(transport)?;

        if !response.status().is_success() {
            debug!(
                "event=remote_get module=remote status=not_found imdb_id={id} http_status={}",
                response.status().as_u16()
            );
            return Ok(None);
        }

        let payload: Value = response
            .json()
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(decode_single(payload))
    }

    fn create(&self, movie: &Movie) -> RemoteResult<()> {
        let response = self
            .client
            .post(&self.base_url)
            .json(movie)
            .send()
            .map_err(transport)?;
        require_success(response)
    }

    fn update_by_id(&self, id: &str, patch: &MoviePatch) -> RemoteResult<()> {
        let response = self
            .client
            .put(&self.base_url)
            .query(&[("imdbID", id)])
            .json(patch)
            .send()
            .map_err(transport)?;
        require_success(response)
    }

    fn delete_by_id(&self, id: &str) -> RemoteResult<()> {
        let response = self
            .client
            .delete(&self.base_url)
            .query(&[("imdbID", id)])
            .send()
            .map_err(transport)?;
        require_success(response)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

fn require_success(response: reqwest::blocking::Response) -> RemoteResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Decodes a list payload; anything other than an array reads as empty, and
/// non-record elements are skipped rather than failing the whole page.
fn decode_list(payload: Value) -> Vec<Movie> {
    let Value::Array(items) = payload else {
        warn!("event=remote_list module=remote status=non_array_payload");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Movie>(item) {
            Ok(movie) => Some(movie),
            Err(err) => {
                warn!("event=remote_list module=remote status=skipped_row error={err}");
                None
            }
        })
        .collect()
}

/// The catalog answers detail queries with either a single record or a
/// one-element array; both unwrap to the first record.
fn decode_single(payload: Value) -> Option<Movie> {
    let record = match payload {
        Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    serde_json::from_value(record).ok()
}
