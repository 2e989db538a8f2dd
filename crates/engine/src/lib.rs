//! Cost accounting over a workspace of flat CSV files.
//!
//! A [`Session`] opens a [`Workspace`] directory and loads its reference
//! table. A [`CostSheet`] holds the lines being entered and computes their
//! total; saving appends a row to the [`HistoryStore`]. The
//! [`ProjectRegistry`] keeps the project list and [`AnalysisData`] reports
//! over the saved history.

pub use amount::{Amount, LineValue};
pub use analysis::{
    ALL_PROJECTS, AnalysisData, AnalysisFilter, AnalysisReport, CostEntry, ProjectFilter,
    ProjectShare, ProjectStats, export_report,
};
pub use cost_sheet::{CostLine, CostSheet, UNNAMED_ARTICLE, base_total, calculate_total};
pub use error::EngineError;
pub use history::{
    DATE_COLUMN, HistoryRecord, HistoryStore, HistoryTable, PERCENT_SUFFIX, PROJECT_COLUMN,
    TOTAL_COLUMN, ordered_headers,
};
pub use projects::{Project, ProjectRegistry, ProjectStatus};
pub use references::{ReferenceEntry, ReferenceSheet, ReferenceStore, References};
pub use workspace::{Session, SwitchOutcome, UnsavedReferences, Workspace};

mod amount;
mod analysis;
mod cost_sheet;
mod error;
mod history;
mod projects;
mod references;
mod util;
mod workspace;

type ResultEngine<T> = Result<T, EngineError>;
