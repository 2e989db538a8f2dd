//! Internal helpers for the CSV-backed stores.
//!
//! These utilities are **not** part of the public API. They centralize the
//! "missing file means empty dataset" rule and the CSV dialect every store
//! shares.

use std::{fs::File, io::ErrorKind, path::Path};

use crate::{EngineError, ResultEngine};

/// Opens `path` for reading, `None` when the file does not exist.
pub(crate) fn open_existing(path: &Path) -> ResultEngine<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Reader shared by every store: rows may be shorter or longer than the
/// header.
pub(crate) fn csv_reader(file: File, has_headers: bool) -> csv::Reader<File> {
    csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(file)
}

/// Writer that truncates `path`; every save is a full rewrite.
pub(crate) fn csv_writer(path: &Path) -> ResultEngine<csv::Writer<File>> {
    let file = File::create(path)?;
    Ok(csv::WriterBuilder::new().flexible(true).from_writer(file))
}

/// Trimmed name, rejecting empty input.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}
