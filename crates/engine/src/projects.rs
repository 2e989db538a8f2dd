//! Project registry stored in a headerless `projects.csv`.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    EngineError, ResultEngine,
    util::{csv_reader, csv_writer, normalize_required_name, open_existing},
};

pub const PROJECTS_FILE: &str = "projects.csv";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
}

impl ProjectStatus {
    /// Text stored in the status column.
    pub const fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "Активен",
            ProjectStatus::Completed => "Завершён",
        }
    }

    /// Reads a stored status; anything that is not "completed" is active.
    pub fn from_cell(cell: &str) -> Self {
        if cell.trim() == ProjectStatus::Completed.as_str() {
            ProjectStatus::Completed
        } else {
            ProjectStatus::Active
        }
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            ProjectStatus::Active => ProjectStatus::Completed,
            ProjectStatus::Completed => ProjectStatus::Active,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
}

/// Handle on `projects.csv`; every mutation loads, edits and rewrites the
/// whole file.
#[derive(Clone, Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
}

impl ProjectRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> ResultEngine<Vec<Project>> {
        let Some(file) = open_existing(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut reader = csv_reader(file, false);

        let mut projects = Vec::new();
        for row in reader.records() {
            let row = row?;
            let name = row.get(0).map(str::trim).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            projects.push(Project {
                name: name.to_string(),
                description: row.get(1).unwrap_or_default().to_string(),
                status: row.get(2).map(ProjectStatus::from_cell).unwrap_or_default(),
            });
        }
        Ok(projects)
    }

    fn store(&self, projects: &[Project]) -> ResultEngine<()> {
        let mut writer = csv_writer(&self.path)?;
        for project in projects {
            writer.write_record([
                project.name.as_str(),
                project.description.as_str(),
                project.status.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Project names in file order.
    pub fn names(&self) -> ResultEngine<Vec<String>> {
        Ok(self.load()?.into_iter().map(|p| p.name).collect())
    }

    pub fn get(&self, name: &str) -> ResultEngine<Project> {
        let name = name.trim();
        self.load()?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))
    }

    /// Description shown next to the selected project; empty for unknown names.
    pub fn describe(&self, name: &str) -> ResultEngine<String> {
        match self.get(name) {
            Ok(project) => Ok(project.description),
            Err(EngineError::KeyNotFound(_)) => Ok(String::new()),
            Err(err) => Err(err),
        }
    }

    pub fn add(&self, name: &str, description: &str) -> ResultEngine<Project> {
        let name = normalize_required_name(name, "project")?;
        let mut projects = self.load()?;
        if projects.iter().any(|p| p.name == name) {
            return Err(EngineError::ExistingKey(name));
        }

        let project = Project {
            name,
            description: description.trim().to_string(),
            status: ProjectStatus::Active,
        };
        projects.push(project.clone());
        self.store(&projects)?;
        tracing::info!("project \"{}\" added", project.name);
        Ok(project)
    }

    /// Renames and/or redescribes `name`; the status is kept.
    pub fn edit(&self, name: &str, new_name: &str, new_description: &str) -> ResultEngine<Project> {
        let name = name.trim();
        let new_name = normalize_required_name(new_name, "project")?;
        let mut projects = self.load()?;
        if new_name != name && projects.iter().any(|p| p.name == new_name) {
            return Err(EngineError::ExistingKey(new_name));
        }

        let project = projects
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))?;
        project.name = new_name;
        project.description = new_description.trim().to_string();
        let edited = project.clone();

        self.store(&projects)?;
        Ok(edited)
    }

    pub fn delete(&self, name: &str) -> ResultEngine<()> {
        let name = name.trim();
        let mut projects = self.load()?;
        let before = projects.len();
        projects.retain(|p| p.name != name);
        if projects.len() == before {
            return Err(EngineError::KeyNotFound(name.to_string()));
        }
        self.store(&projects)?;
        tracing::info!("project \"{name}\" deleted");
        Ok(())
    }

    /// Flips Active and Completed, returning the new status.
    pub fn toggle_status(&self, name: &str) -> ResultEngine<ProjectStatus> {
        let name = name.trim();
        let mut projects = self.load()?;
        let project = projects
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::KeyNotFound(name.to_string()))?;
        project.status = project.status.toggled();
        let status = project.status;

        self.store(&projects)?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_cell() {
        for status in [ProjectStatus::Active, ProjectStatus::Completed] {
            assert_eq!(ProjectStatus::from_cell(status.as_str()), status);
        }
    }

    #[test]
    fn unknown_status_reads_as_active() {
        assert_eq!(ProjectStatus::from_cell(""), ProjectStatus::Active);
        assert_eq!(ProjectStatus::from_cell("Paused"), ProjectStatus::Active);
        assert_eq!(ProjectStatus::from_cell(" Завершён "), ProjectStatus::Completed);
    }

    #[test]
    fn toggle_flips_between_the_two_states() {
        assert_eq!(ProjectStatus::Active.toggled(), ProjectStatus::Completed);
        assert_eq!(ProjectStatus::Completed.toggled(), ProjectStatus::Active);
    }
}
