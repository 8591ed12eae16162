//! # Query Pipeline
//!
//! Reads a base table plus every join target in one batch, then applies, in
//! this order: joins (sequentially), the filter, and the column selection.
//!
//! Selection has one join-aware rule: when the selection names a match column
//! of any configured join, every column the joins introduced (and that survived
//! filtering) is appended to the selection. Otherwise exactly the selected
//! columns are returned. Without a selection the base headers are returned
//! even though rows may carry joined fields.
use crate::client::SheetQuery;
use crate::database::table::dedup_headers;
use crate::database::Table;
use crate::error::SheetQueryError;
use crate::operation::append::Appender;
use crate::operation::delete::DeleteResult;
use crate::operation::delete::DeleteSelector;
use crate::operation::filter_rows;
use crate::operation::join::apply_join;
use crate::operation::join::JoinSpec;
use crate::operation::reader::BatchReader;
use crate::operation::resolver::resolve;
use crate::operation::resolver::JoinResolution;
use crate::operation::update::UpdateDiffer;
use crate::operation::update::UpdateResult;
use crate::operation::Predicate;
use crate::spreadsheet::Record;
use crate::spreadsheet::Row;
use crate::spreadsheet::RowCodec;
use crate::store::TabularStore;
use std::collections::HashMap;

/// The read path over already fetched tables.
pub struct QueryPipeline<'q> {
    pub table: &'q str,
    pub filter: Option<&'q Predicate<'q>>,
    pub joins: &'q [JoinSpec],
    pub select: Option<&'q [String]>,
}

impl<'q> QueryPipeline<'q> {
    /// Base table first, then each join target once.
    pub fn tables_to_fetch(&self) -> Vec<String> {
        let names = std::iter::once(self.table.to_owned())
            .chain(self.joins.iter().map(|join| join.table.clone()))
            .collect();
        dedup_headers(names)
    }

    /// Runs joins, filter and selection over fetched tables.
    pub fn run(&self, mut tables: HashMap<String, Table>, codec: &RowCodec) -> Table {
        let base = match tables.remove(self.table) {
            Some(base) if !base.is_empty() => base,
            _ => return Table::empty(),
        };
        // Self-joins read the base snapshot as their target.
        if self.joins.iter().any(|join| join.table == self.table) {
            tables.insert(self.table.to_owned(), base.clone());
        }

        let Table { headers, mut rows } = base;
        let mut introduced: Vec<String> = Vec::new();
        for join in self.joins {
            let (joined, written) = apply_join(rows, join, tables.get(&join.table), codec);
            rows = joined;
            for name in written {
                if !headers.contains(&name) && !introduced.contains(&name) {
                    introduced.push(name);
                }
            }
        }

        let rows = filter_rows(self.table, self.filter, rows);

        match self.select.filter(|select| !select.is_empty()) {
            None => Table::new(headers, rows),
            Some(select) => {
                let mut selected = select.to_vec();
                if select.iter().any(|column| self.joins.iter().any(|join| join.references(column))) {
                    selected.extend(
                        introduced
                            .into_iter()
                            .filter(|column| rows.iter().any(|row| row.contains(column))),
                    );
                }
                let selected = dedup_headers(selected);
                let rows = rows.iter().map(|row| row.project(&selected)).collect();
                Table::new(selected, rows)
            }
        }
    }
}

/// A query against one table, built up before a terminal operation runs it.
pub struct TableQuery<'a, S> {
    client: &'a SheetQuery<S>,
    table: String,
    filter: Option<Box<Predicate<'a>>>,
    joins: Vec<JoinSpec>,
    select: Option<Vec<String>>,
}

impl<'a, S: TabularStore> TableQuery<'a, S> {
    pub fn new(client: &'a SheetQuery<S>, table: &str) -> Self {
        TableQuery {
            client,
            table: table.to_owned(),
            filter: None,
            joins: Vec::new(),
            select: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Restricts the returned columns.
    pub fn select<I, T>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.select = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Keeps rows for which `filter` returns `Ok(true)`.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Row) -> anyhow::Result<bool> + 'a,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Joins `table` rows whose `target_column` equals this table's `source_column`.
    pub fn join(self, table: &str, target_column: &str, source_column: &str) -> Self {
        self.join_with(JoinSpec::new(table, target_column, source_column))
    }

    pub fn join_with(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    fn pipeline(&self) -> QueryPipeline<'_> {
        QueryPipeline {
            table: &self.table,
            filter: self.filter.as_deref(),
            joins: &self.joins,
            select: self.select.as_deref(),
        }
    }

    /// Reads the base table and every join target in one round trip and runs the pipeline.
    pub fn get(&self) -> Result<Table, SheetQueryError> {
        let pipeline = self.pipeline();
        let tables = BatchReader::new(self.client).fetch_many(&pipeline.tables_to_fetch())?;
        Ok(pipeline.run(tables, self.client.codec()))
    }

    /// Merges `transform`'s fields into every (filtered) row of a fresh snapshot and writes the changed cells.
    pub fn update<F>(&self, transform: F) -> Result<UpdateResult, SheetQueryError>
    where
        F: Fn(&Row) -> anyhow::Result<Record>,
    {
        UpdateDiffer::new(self.client, &self.table).run(self.filter.as_deref(), &transform)
    }

    /// Like [`TableQuery::update`], diffing a snapshot the caller already holds.
    pub fn update_rows<F>(&self, snapshot: &Table, transform: F) -> Result<UpdateResult, SheetQueryError>
    where
        F: Fn(&Row) -> anyhow::Result<Record>,
    {
        UpdateDiffer::new(self.client, &self.table).run_on(snapshot, self.filter.as_deref(), &transform)
    }

    /// Deletes the rows the filter matches; without a filter nothing is deleted.
    pub fn delete(&self) -> Result<DeleteResult, SheetQueryError> {
        DeleteSelector::new(self.client, &self.table).run(self.filter.as_deref())
    }

    /// Appends records in header order.
    pub fn append(&self, records: &[Record]) -> Result<Table, SheetQueryError> {
        Appender::new(self.client, &self.table).run(records)
    }

    /// Reads this table and `tables` in one round trip and lets `resolver` shape the result.
    pub fn resolve<T, F>(&self, tables: &[T], resolver: F) -> Result<Table, SheetQueryError>
    where
        T: AsRef<str>,
        F: Fn(&HashMap<String, Vec<Row>>) -> anyhow::Result<JoinResolution>,
    {
        let names: Vec<String> = std::iter::once(self.table.clone())
            .chain(tables.iter().map(|name| name.as_ref().to_owned()))
            .collect();
        let fetched = BatchReader::new(self.client).fetch_many(&names)?;
        Ok(resolve(&self.table, fetched, self.filter.as_deref(), &resolver))
    }
}
