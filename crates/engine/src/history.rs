//! Cost history: one row per saved calculation in `cost_history.csv`.
//!
//! The column set grows over time: every article name ever saved becomes a
//! column. Saving therefore rewrites the whole file, re-projecting every
//! existing row onto the widened header.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;

use crate::{
    ResultEngine, amount,
    util::{csv_reader, csv_writer, open_existing},
};

pub const HISTORY_FILE: &str = "cost_history.csv";
pub const DATE_COLUMN: &str = "Дата";
pub const PROJECT_COLUMN: &str = "Проект";
pub const TOTAL_COLUMN: &str = "Итого";
/// Suffix of the shadow column keeping the literal percent text of an article.
pub const PERCENT_SUFFIX: &str = " (процент)";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A saved calculation, keyed by column name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryRecord {
    fields: BTreeMap<String, String>,
}

impl HistoryRecord {
    /// Fills the date and project columns.
    pub fn stamp(&mut self, timestamp: NaiveDateTime, project: &str) {
        self.set(DATE_COLUMN, timestamp.format(TIMESTAMP_FORMAT).to_string());
        self.set(PROJECT_COLUMN, project);
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.fields.insert(column.to_string(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.fields.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Parsed `Дата` column, `None` when it is missing or malformed.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.get(DATE_COLUMN)?.trim();
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
    }

    pub fn project(&self) -> &str {
        self.get(PROJECT_COLUMN).unwrap_or_default()
    }

    /// Parsed `Итого` column; unreadable totals count as zero.
    pub fn total(&self) -> f64 {
        self.get(TOTAL_COLUMN).map(amount::parse_cell).unwrap_or(0.0)
    }

    /// Article columns in header order, without date, project, total and
    /// percent shadow columns.
    pub fn articles(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(column, _)| !is_reserved(column) && !column.contains(PERCENT_SUFFIX))
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }

    /// Literal percent text saved next to `article`, if any.
    pub fn percent_text(&self, article: &str) -> Option<&str> {
        self.get(&format!("{article}{PERCENT_SUFFIX}"))
    }
}

/// Full content of the history file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryTable {
    pub headers: Vec<String>,
    pub records: Vec<HistoryRecord>,
}

impl HistoryTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The most recent save.
    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// Cells of `record` projected onto this table's header.
    pub fn row<'a>(&'a self, record: &'a HistoryRecord) -> Vec<&'a str> {
        self.headers
            .iter()
            .map(|header| record.get(header).unwrap_or_default())
            .collect()
    }
}

fn is_reserved(column: &str) -> bool {
    column == DATE_COLUMN || column == PROJECT_COLUMN || column == TOTAL_COLUMN
}

/// Header order of the history file: date, project, the remaining columns
/// sorted, total last.
pub fn ordered_headers<'a>(columns: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let rest: BTreeSet<&str> = columns.into_iter().filter(|c| !is_reserved(c)).collect();
    let mut headers = Vec::with_capacity(rest.len() + 3);
    headers.push(DATE_COLUMN.to_string());
    headers.push(PROJECT_COLUMN.to_string());
    headers.extend(rest.into_iter().map(str::to_string));
    headers.push(TOTAL_COLUMN.to_string());
    headers
}

/// Handle on `cost_history.csv` inside a workspace.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file. A missing file is an empty history.
    pub fn load(&self) -> ResultEngine<HistoryTable> {
        let Some(file) = open_existing(&self.path)? else {
            return Ok(HistoryTable::default());
        };
        let mut reader = csv_reader(file, true);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = HistoryRecord::default();
            for (header, cell) in headers.iter().zip(row.iter()) {
                record.set(header, cell);
            }
            records.push(record);
        }

        Ok(HistoryTable { headers, records })
    }

    /// Adds `record` and rewrites the file with the union of all columns.
    ///
    /// The existing file is read first; if that fails nothing is written.
    pub fn append(&self, record: HistoryRecord) -> ResultEngine<()> {
        let mut table = self.load()?;

        let headers = {
            let columns = table
                .headers
                .iter()
                .map(String::as_str)
                .chain(record.columns());
            ordered_headers(columns)
        };
        table.headers = headers;
        table.records.push(record);

        let mut writer = csv_writer(&self.path)?;
        writer.write_record(&table.headers)?;
        for record in &table.records {
            writer.write_record(table.row(record))?;
        }
        writer.flush()?;

        tracing::debug!(
            "history rewritten: {} rows, {} columns",
            table.records.len(),
            table.headers.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> HistoryRecord {
        let mut record = HistoryRecord::default();
        for (column, value) in fields {
            record.set(column, *value);
        }
        record
    }

    #[test]
    fn headers_put_date_project_first_and_total_last() {
        let headers = ordered_headers(["Итого", "Транспорт", "Дата", "Аренда", "Проект"]);
        assert_eq!(headers, ["Дата", "Проект", "Аренда", "Транспорт", "Итого"]);
    }

    #[test]
    fn headers_always_contain_fixed_columns() {
        assert_eq!(ordered_headers(std::iter::empty()), ["Дата", "Проект", "Итого"]);
    }

    #[test]
    fn articles_skip_reserved_and_shadow_columns() {
        let record = record(&[
            ("Дата", "2024-01-02 10:00:00"),
            ("Проект", "Дом"),
            ("Аренда", "100.0"),
            ("Налог", "10.0"),
            ("Налог (процент)", "10%"),
            ("Итого", "110.0"),
        ]);
        let articles: Vec<_> = record.articles().collect();
        assert_eq!(articles, [("Аренда", "100.0"), ("Налог", "10.0")]);
        assert_eq!(record.percent_text("Налог"), Some("10%"));
        assert_eq!(record.percent_text("Аренда"), None);
        assert_eq!(record.total(), 110.0);
        assert_eq!(record.project(), "Дом");
    }

    #[test]
    fn malformed_date_and_total_are_tolerated() {
        let record = record(&[("Дата", "yesterday"), ("Итого", "n/a")]);
        assert!(record.timestamp().is_none());
        assert_eq!(record.total(), 0.0);
        assert_eq!(record.project(), "");
    }

    #[test]
    fn row_fills_absent_cells() {
        let table = HistoryTable {
            headers: ordered_headers(["Аренда"]),
            records: vec![],
        };
        let record = record(&[("Дата", "d"), ("Итого", "1.0")]);
        assert_eq!(table.row(&record), ["d", "", "", "1.0"]);
    }
}
