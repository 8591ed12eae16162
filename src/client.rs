use crate::config::resolve_document_id;
use crate::config::Config;
use crate::database::Table;
use crate::error::SheetQueryError;
use crate::operation::query::TableQuery;
use crate::operation::reader::BatchReader;
use crate::retry::RetryGate;
use crate::spreadsheet::RowCodec;
use crate::store::TabularStore;
use std::collections::HashMap;

/// Entry handle binding a store to one document.
///
/// The document is always explicit; [`SheetQuery::from_env`] is the only place
/// that falls back to the environment.
#[derive(Debug)]
pub struct SheetQuery<S> {
    store: S,
    document_id: String,
    config: Config,
    gate: RetryGate,
    codec: RowCodec,
}

impl<S: TabularStore> SheetQuery<S> {
    pub fn new(store: S, document_id: &str) -> Self {
        Self::with_config(store, document_id, Config::default())
    }

    pub fn with_config(store: S, document_id: &str, config: Config) -> Self {
        SheetQuery {
            gate: RetryGate::from_config(&config),
            codec: RowCodec::new(&config.date_format, config.infer_types),
            store,
            document_id: document_id.to_owned(),
            config,
        }
    }

    /// Uses `document_id` if given, else `SHEET_QUERY_DOCUMENT_ID`, with env-overridden config.
    pub fn from_env(store: S, document_id: Option<&str>) -> Result<Self, SheetQueryError> {
        let document_id = resolve_document_id(document_id)?;
        let config = Config::default().with_env_overrides()?;
        Ok(Self::with_config(store, &document_id, config))
    }

    /// Replaces the retry gate, e.g. to swap the blocking sleep.
    pub fn with_retry_gate(mut self, gate: RetryGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gate(&self) -> &RetryGate {
        &self.gate
    }

    pub fn codec(&self) -> &RowCodec {
        &self.codec
    }

    /// Starts a query against one table.
    pub fn from(&self, table: &str) -> TableQuery<'_, S> {
        TableQuery::new(self, table)
    }

    /// Reads several whole tables in one round trip.
    pub fn get_many<T: AsRef<str>>(&self, tables: &[T]) -> Result<HashMap<String, Table>, SheetQueryError> {
        let names: Vec<String> = tables.iter().map(|name| name.as_ref().to_owned()).collect();
        BatchReader::new(self).fetch_many(&names)
    }
}
