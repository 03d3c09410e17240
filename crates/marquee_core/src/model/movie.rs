//! Movie record and partial-patch model.
//!
//! # Responsibility
//! - Give the open-ended remote payload a typed shape: known fields plus an
//!   explicit extra-field bag.
//! - Normalize identifier and field-name aliases once, during deserialization.
//!
//! # Invariants
//! - `imdb_id` is the sole key space for overlay tables; it is always the
//!   trimmed string form of whatever scalar the payload carried.
//! - Deserializing a record never fails on loose field types; scalars are
//!   coerced to text, missing fields become `None`.
//! - Applying a patch only adds or replaces fields, never removes one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identifier field names accepted on incoming records, in lookup order.
const ID_ALIASES: [&str; 3] = ["imdbID", "imdbId", "id"];

static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://").expect("valid url scheme regex"));

/// Local precondition failure for record operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieValidationError {
    /// The record carries no usable identifier under any accepted alias.
    MissingId,
}

impl Display for MovieValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "movie record must carry a non-empty imdbID"),
        }
    }
}

impl Error for MovieValidationError {}

/// Canonical catalog record.
///
/// Known fields cover what the catalog UI reads by name; everything else the
/// remote sends lands in `extra` and is copied through the pipeline unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Normalized identifier. Empty means the record is unidentifiable.
    #[serde(
        rename = "imdbID",
        alias = "imdbId",
        alias = "id",
        default,
        deserialize_with = "de_id",
        skip_serializing_if = "String::is_empty"
    )]
    pub imdb_id: String,
    #[serde(
        rename = "Title",
        alias = "title",
        alias = "Nombre",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        rename = "Year",
        alias = "year",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
    /// Serialized as `Type` to match the remote schema naming.
    #[serde(
        rename = "Type",
        alias = "type",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        rename = "Ubication",
        alias = "ubication",
        alias = "ubicacion",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ubication: Option<String>,
    #[serde(
        rename = "description",
        alias = "Descripcion",
        alias = "sinopsis",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        rename = "Poster",
        alias = "poster",
        alias = "image",
        alias = "posterUrl",
        alias = "img",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub poster: Option<String>,
    /// Unrecognized payload fields, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Movie {
    /// Creates a record with the given identifier and no other fields.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            imdb_id: normalize_scalar_id(&Value::String(id.into())),
            ..Self::default()
        }
    }

    /// Checks the record is usable as an overlay key.
    pub fn validate(&self) -> Result<(), MovieValidationError> {
        if self.imdb_id.is_empty() {
            return Err(MovieValidationError::MissingId);
        }
        Ok(())
    }

    /// Returns the poster field only when it is an `http(s)` URL.
    pub fn poster_url(&self) -> Option<&str> {
        self.poster
            .as_deref()
            .filter(|value| HTTP_URL_RE.is_match(value))
    }
}

/// Partial record: the unit stored in the overrides table and sent on update.
///
/// Shares the movie's field aliases so admin-form payloads and remote payloads
/// deserialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoviePatch {
    #[serde(
        rename = "imdbID",
        alias = "imdbId",
        alias = "id",
        default,
        deserialize_with = "de_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub imdb_id: Option<String>,
    #[serde(
        rename = "Title",
        alias = "title",
        alias = "Nombre",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        rename = "Year",
        alias = "year",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<String>,
    #[serde(
        rename = "Type",
        alias = "type",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        rename = "Ubication",
        alias = "ubication",
        alias = "ubicacion",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub ubication: Option<String>,
    #[serde(
        rename = "description",
        alias = "Descripcion",
        alias = "sinopsis",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        rename = "Poster",
        alias = "poster",
        alias = "image",
        alias = "posterUrl",
        alias = "img",
        default,
        deserialize_with = "de_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub poster: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MoviePatch {
    /// Returns whether the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.imdb_id.is_none()
            && self.title.is_none()
            && self.year.is_none()
            && self.kind.is_none()
            && self.ubication.is_none()
            && self.description.is_none()
            && self.poster.is_none()
            && self.extra.is_empty()
    }

    /// Folds `newer` into `self`, newer fields winning per field.
    ///
    /// Fields absent from `newer` keep their current value.
    pub fn merge(&mut self, newer: &MoviePatch) {
        merge_field(&mut self.imdb_id, &newer.imdb_id);
        merge_field(&mut self.title, &newer.title);
        merge_field(&mut self.year, &newer.year);
        merge_field(&mut self.kind, &newer.kind);
        merge_field(&mut self.ubication, &newer.ubication);
        merge_field(&mut self.description, &newer.description);
        merge_field(&mut self.poster, &newer.poster);
        for (key, value) in &newer.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    /// Splices the patch onto a record: patch fields win, absent fields keep
    /// the record's value. Never removes a field.
    pub fn apply_to(&self, movie: &mut Movie) {
        if let Some(id) = &self.imdb_id {
            movie.imdb_id = id.clone();
        }
        apply_field(&mut movie.title, &self.title);
        apply_field(&mut movie.year, &self.year);
        apply_field(&mut movie.kind, &self.kind);
        apply_field(&mut movie.ubication, &self.ubication);
        apply_field(&mut movie.description, &self.description);
        apply_field(&mut movie.poster, &self.poster);
        for (key, value) in &self.extra {
            movie.extra.insert(key.clone(), value.clone());
        }
    }
}

fn merge_field(current: &mut Option<String>, newer: &Option<String>) {
    if newer.is_some() {
        current.clone_from(newer);
    }
}

fn apply_field(target: &mut Option<String>, patch: &Option<String>) {
    if patch.is_some() {
        target.clone_from(patch);
    }
}

/// Extracts the canonical string identifier from a loosely-typed value.
///
/// Accepts either a JSON record (tries `imdbID`, `imdbId`, `id` in order) or
/// a raw scalar. Returns `""` when nothing usable is present. Never fails.
pub fn normalize_id(raw: &Value) -> String {
    match raw {
        Value::Object(map) => ID_ALIASES
            .iter()
            .find_map(|alias| map.get(*alias))
            .map(normalize_scalar_id)
            .unwrap_or_default(),
        other => normalize_scalar_id(other),
    }
}

fn normalize_scalar_id(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_scalar_id(&value))
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(normalize_scalar_id(&value)))
}

fn de_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

/// Coerces a loose scalar to display text, because the remote does not commit
/// to consistent field types (years arrive as both strings and numbers).
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| value_to_text(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}
