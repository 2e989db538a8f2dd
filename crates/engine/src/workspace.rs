//! Workspace directory and the session that owns it.
//!
//! A workspace is a directory holding the history, project and reference
//! files. The [`Session`] is the only owner of the current workspace and of
//! the reference lookup; callers pass it explicitly instead of reaching for
//! shared state.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::{
    AnalysisData, CostSheet, EngineError, HistoryRecord, HistoryStore, HistoryTable,
    ProjectRegistry, ReferenceSheet, ReferenceStore, References, ResultEngine,
    history::HISTORY_FILE, projects::PROJECTS_FILE, references::REFERENCES_FILE,
};

#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens an existing workspace directory. The files inside may be absent.
    pub fn open(path: impl AsRef<Path>) -> ResultEngine<Self> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(EngineError::WorkspaceNotFound(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(self.root.join(HISTORY_FILE))
    }

    pub fn projects(&self) -> ProjectRegistry {
        ProjectRegistry::new(self.root.join(PROJECTS_FILE))
    }

    pub fn references(&self) -> ReferenceStore {
        ReferenceStore::new(self.root.join(REFERENCES_FILE))
    }
}

/// What to do with unsaved reference edits when the workspace changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnsavedReferences {
    Save,
    #[default]
    Discard,
    /// Keep the current workspace and the edits.
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct Session {
    workspace: Option<Workspace>,
    references: References,
    reference_sheet: ReferenceSheet,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with `path` already open.
    pub fn open(path: impl AsRef<Path>) -> ResultEngine<Self> {
        let mut session = Self::new();
        session.switch_workspace(path, UnsavedReferences::Discard)?;
        Ok(session)
    }

    pub fn workspace(&self) -> ResultEngine<&Workspace> {
        self.workspace.as_ref().ok_or(EngineError::NoWorkspace)
    }

    pub fn references(&self) -> &References {
        &self.references
    }

    pub fn reference_sheet(&self) -> &ReferenceSheet {
        &self.reference_sheet
    }

    pub fn reference_sheet_mut(&mut self) -> &mut ReferenceSheet {
        &mut self.reference_sheet
    }

    /// Switches to `path` and reloads the reference table from it.
    ///
    /// Dirty reference edits are handled by `unsaved` first. Under `Save`, a
    /// sheet with no complete entry has nothing to write and the switch goes
    /// on. Nothing about the session changes when the switch fails or is
    /// cancelled.
    pub fn switch_workspace(
        &mut self,
        path: impl AsRef<Path>,
        unsaved: UnsavedReferences,
    ) -> ResultEngine<SwitchOutcome> {
        let next = Workspace::open(path)?;

        if self.reference_sheet.is_dirty() && self.workspace.is_some() {
            match unsaved {
                UnsavedReferences::Cancel => {
                    tracing::info!("workspace switch cancelled: unsaved reference edits");
                    return Ok(SwitchOutcome::Cancelled);
                }
                UnsavedReferences::Save => match self.save_references() {
                    Ok(_) => {}
                    Err(EngineError::EmptyReference) => {
                        tracing::warn!("no complete reference entry to save, switching anyway");
                    }
                    Err(err) => return Err(err),
                },
                UnsavedReferences::Discard => {
                    tracing::warn!("discarding unsaved reference edits");
                }
            }
        }

        let sheet = next.references().load()?;
        self.references = sheet.to_references();
        self.reference_sheet = sheet;
        tracing::info!(
            "workspace {} opened ({} references)",
            next.root().display(),
            self.references.len()
        );
        self.workspace = Some(next);
        Ok(SwitchOutcome::Switched)
    }

    /// Persists the reference sheet and rebuilds the lookup from it.
    pub fn save_references(&mut self) -> ResultEngine<&References> {
        let store = self.workspace()?.references();
        self.references = store.save(&mut self.reference_sheet)?;
        Ok(&self.references)
    }

    /// History table; an unreadable file is logged and shown as empty.
    pub fn history_or_empty(&self) -> ResultEngine<HistoryTable> {
        let store = self.workspace()?.history();
        Ok(store.load().unwrap_or_else(|err| {
            tracing::warn!("cannot read {}: {err}", store.path().display());
            HistoryTable::default()
        }))
    }

    pub fn analysis(&self) -> ResultEngine<AnalysisData> {
        Ok(AnalysisData::from_history(&self.history_or_empty()?))
    }

    /// Lines of the last saved calculation, or an empty sheet.
    pub fn last_sheet(&self) -> ResultEngine<CostSheet> {
        Ok(self
            .history_or_empty()?
            .last()
            .map(CostSheet::from_record)
            .unwrap_or_default())
    }

    /// Saves `sheet` for `project` with the current local time.
    pub fn save_sheet(&self, sheet: &CostSheet, project: &str) -> ResultEngine<HistoryRecord> {
        self.save_sheet_at(sheet, project, Local::now().naive_local())
    }

    pub fn save_sheet_at(
        &self,
        sheet: &CostSheet,
        project: &str,
        timestamp: NaiveDateTime,
    ) -> ResultEngine<HistoryRecord> {
        let workspace = self.workspace()?;
        if project.trim().is_empty() {
            return Err(EngineError::InvalidName(
                "select a project before saving".to_string(),
            ));
        }

        let invalid = sheet.invalid_lines();
        if !invalid.is_empty() {
            let labels: Vec<&str> = invalid
                .iter()
                .filter_map(|idx| sheet.lines().get(*idx))
                .map(|line| line.label.as_str())
                .collect();
            tracing::warn!("saving with unreadable values counted as 0: {labels:?}");
        }

        let record = sheet.to_record(project, timestamp);
        workspace.history().append(record.clone())?;
        tracing::info!(
            "saved calculation for \"{}\": total {}",
            record.project(),
            record.total()
        );
        Ok(record)
    }
}
