//! Reference table of typical cost values (`reference_items.csv`).

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    EngineError, ResultEngine,
    util::{csv_reader, csv_writer, open_existing},
};

pub const REFERENCES_FILE: &str = "reference_items.csv";
pub const NAME_COLUMN: &str = "Название";
pub const VALUE_COLUMN: &str = "Значение";

/// Read-only lookup from article name to its default value text.
///
/// Rebuilt wholesale whenever the workspace changes or the reference table
/// is saved; nothing mutates it in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct References {
    values: BTreeMap<String, String>,
}

impl References {
    /// Default value for `name`, matched exactly after trimming.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name.trim()).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for References {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub name: String,
    pub value: String,
}

impl ReferenceEntry {
    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.value.trim().is_empty()
    }
}

/// Editable reference table, in the order the user sees it.
///
/// Every edit marks the sheet dirty until it is saved; switching workspace
/// with a dirty sheet asks what to do with the edits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceSheet {
    entries: Vec<ReferenceEntry>,
    dirty: bool,
}

impl ReferenceSheet {
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn add(&mut self, name: &str, value: &str) {
        self.entries.push(ReferenceEntry {
            name: name.to_string(),
            value: value.to_string(),
        });
        self.dirty = true;
    }

    /// Sets the value of `name`, adding the entry when it does not exist.
    pub fn upsert(&mut self, name: &str, value: &str) {
        let name = name.trim();
        match self.entries.iter_mut().find(|e| e.name.trim() == name) {
            Some(entry) => {
                entry.value = value.to_string();
                self.dirty = true;
            }
            None => self.add(name, value),
        }
    }

    pub fn update(&mut self, index: usize, name: &str, value: &str) -> ResultEngine<()> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| EngineError::KeyNotFound(format!("reference #{index}")))?;
        entry.name = name.to_string();
        entry.value = value.to_string();
        self.dirty = true;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> ResultEngine<()> {
        let name = name.trim();
        let before = self.entries.len();
        self.entries.retain(|e| e.name.trim() != name);
        if self.entries.len() == before {
            return Err(EngineError::KeyNotFound(name.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    /// Lookup built from the complete entries; a later duplicate name wins.
    pub fn to_references(&self) -> References {
        self.entries
            .iter()
            .filter(|e| e.is_complete())
            .map(|e| (e.name.trim(), e.value.trim()))
            .collect()
    }
}

/// Handle on `reference_items.csv` inside a workspace.
#[derive(Clone, Debug)]
pub struct ReferenceStore {
    path: PathBuf,
}

impl ReferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the table; rows without a name are skipped, a missing file is
    /// an empty table.
    pub fn load(&self) -> ResultEngine<ReferenceSheet> {
        let Some(file) = open_existing(&self.path)? else {
            return Ok(ReferenceSheet::default());
        };
        let mut reader = csv_reader(file, true);
        let headers = reader.headers()?.clone();
        let name_idx = headers.iter().position(|h| h.trim() == NAME_COLUMN);
        let value_idx = headers.iter().position(|h| h.trim() == VALUE_COLUMN);

        let mut entries = Vec::new();
        for row in reader.records() {
            let row = row?;
            let cell = |idx: Option<usize>| {
                idx.and_then(|i| row.get(i))
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string()
            };
            let name = cell(name_idx);
            if name.is_empty() {
                continue;
            }
            entries.push(ReferenceEntry {
                name,
                value: cell(value_idx),
            });
        }

        Ok(ReferenceSheet {
            entries,
            dirty: false,
        })
    }

    /// Writes every complete entry and returns the rebuilt lookup.
    ///
    /// A table without a single complete entry is refused rather than
    /// written as an empty file.
    pub fn save(&self, sheet: &mut ReferenceSheet) -> ResultEngine<References> {
        if !sheet.entries.iter().any(ReferenceEntry::is_complete) {
            return Err(EngineError::EmptyReference);
        }

        let mut writer = csv_writer(&self.path)?;
        writer.write_record([NAME_COLUMN, VALUE_COLUMN])?;
        for entry in sheet.entries.iter().filter(|e| e.is_complete()) {
            writer.write_record([entry.name.trim(), entry.value.trim()])?;
        }
        writer.flush()?;

        sheet.dirty = false;
        let references = sheet.to_references();
        tracing::debug!("saved {} reference entries", references.len());
        Ok(references)
    }
}
