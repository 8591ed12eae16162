//! Runtime configuration for the store handle.
//!
//! A `Config` is plain data: it can be built in code, read from JSON, and
//! overlaid with `SHEET_QUERY_*` environment variables. Nothing in the core
//! reads the environment on its own; callers opt in at the outer boundary.
use crate::error::SheetQueryError;
use crate::spreadsheet::DEFAULT_DATE_FORMAT;
use crate::store::DateTimeRenderOption;
use crate::store::ReadOptions;
use crate::store::ValueInputOption;
use crate::store::ValueRenderOption;
use serde::Deserialize;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable naming the document used when no id is given explicitly.
pub const DOCUMENT_ID_ENV: &str = "SHEET_QUERY_DOCUMENT_ID";

const DEFAULT_MAX_RETRIES: u32 = 16;
const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_DELAY_MS: u64 = 64_000;
const DEFAULT_JITTER_MS: u64 = 1_000;
const DEFAULT_GAP_FILL_ROWS: usize = 1;

/// Errors related to configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No document id given and {0} is not set")]
    MissingDocument(&'static str),

    #[error("Configuration must be a JSON object")]
    NotAnObject,

    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

/// Tunables for retries, rendering, typing and write coalescing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Calls made for one rate-limited operation before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound of the uniform random delay added to each backoff.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    #[serde(default)]
    pub value_render_option: ValueRenderOption,
    #[serde(default)]
    pub date_time_render_option: DateTimeRenderOption,
    #[serde(default)]
    pub value_input_option: ValueInputOption,
    /// chrono format used as the "locale string" of dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Heuristic boolean/date typing of text cells.
    #[serde(default = "default_true")]
    pub infer_types: bool,
    /// Ask the store for column type tags on every read.
    #[serde(default = "default_true")]
    pub schema_metadata: bool,
    /// Untouched rows a coalesced column write may bridge.
    #[serde(default = "default_gap_fill_rows")]
    pub gap_fill_rows: usize,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

fn default_jitter_ms() -> u64 {
    DEFAULT_JITTER_MS
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_owned()
}

fn default_true() -> bool {
    true
}

fn default_gap_fill_rows() -> usize {
    DEFAULT_GAP_FILL_ROWS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_ms: DEFAULT_JITTER_MS,
            value_render_option: ValueRenderOption::default(),
            date_time_render_option: DateTimeRenderOption::default(),
            value_input_option: ValueInputOption::default(),
            date_format: default_date_format(),
            infer_types: true,
            schema_metadata: true,
            gap_fill_rows: DEFAULT_GAP_FILL_ROWS,
        }
    }
}

impl Config {
    /// Parses a JSON object; absent fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, SheetQueryError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(ConfigError::NotAnObject.into());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Overlays `SHEET_QUERY_*` environment variables that are set.
    pub fn with_env_overrides(self) -> Result<Self, SheetQueryError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlays values from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, SheetQueryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = configured(&lookup, "SHEET_QUERY_MAX_RETRIES")? {
            self.max_retries = value;
        }
        if let Some(value) = configured(&lookup, "SHEET_QUERY_BASE_DELAY_MS")? {
            self.base_delay_ms = value;
        }
        if let Some(value) = configured(&lookup, "SHEET_QUERY_MAX_DELAY_MS")? {
            self.max_delay_ms = value;
        }
        if let Some(value) = configured(&lookup, "SHEET_QUERY_JITTER_MS")? {
            self.jitter_ms = value;
        }
        if let Some(value) = configured(&lookup, "SHEET_QUERY_INFER_TYPES")? {
            self.infer_types = value;
        }
        if let Some(value) = configured(&lookup, "SHEET_QUERY_SCHEMA_METADATA")? {
            self.schema_metadata = value;
        }
        if let Some(value) = configured(&lookup, "SHEET_QUERY_GAP_FILL_ROWS")? {
            self.gap_fill_rows = value;
        }
        if let Some(value) = lookup("SHEET_QUERY_DATE_FORMAT").filter(|value| !value.is_empty()) {
            self.date_format = value;
        }
        if let Some(value) = configured_option(&lookup, "SHEET_QUERY_VALUE_RENDER_OPTION")? {
            self.value_render_option = value;
        }
        if let Some(value) = configured_option(&lookup, "SHEET_QUERY_DATE_TIME_RENDER_OPTION")? {
            self.date_time_render_option = value;
        }
        if let Some(value) = configured_option(&lookup, "SHEET_QUERY_VALUE_INPUT_OPTION")? {
            self.value_input_option = value;
        }
        Ok(self)
    }

    /// Render options used for every read.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            value_render_option: self.value_render_option,
            date_time_render_option: self.date_time_render_option,
        }
    }
}

/// Parses a scalar override, rejecting values that don't parse.
fn configured<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_owned(),
                value: raw,
            }),
    }
}

/// Parses an enum override spelled like its wire name, e.g. `UNFORMATTED_VALUE`.
fn configured_option<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_uppercase()))
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_owned(),
                value: raw,
            }),
    }
}

/// Picks the document to operate on: the explicit id, else `SHEET_QUERY_DOCUMENT_ID`.
pub fn resolve_document_id(explicit: Option<&str>) -> Result<String, SheetQueryError> {
    resolve_document_id_with(explicit, |name| std::env::var(name).ok())
}

pub(crate) fn resolve_document_id_with<F>(explicit: Option<&str>, lookup: F) -> Result<String, SheetQueryError>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|id| !id.trim().is_empty())
        .map(str::to_owned)
        .or_else(|| lookup(DOCUMENT_ID_ENV).filter(|id| !id.trim().is_empty()))
        .ok_or_else(|| ConfigError::MissingDocument(DOCUMENT_ID_ENV).into())
}
