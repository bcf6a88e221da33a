use tracing::{info, warn};

use super::data::SavedProject;
use super::storage::{Storage, StorageError, LIBRARY_KEY};

/// The Library holds every saved project, newest first.
///
/// The whole sequence is stored as one JSON document under a single
/// storage key. Every mutation writes the full updated sequence before
/// the in-memory copy changes, so a failed write leaves the library
/// exactly as it was.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectLibrary {
    projects: Vec<SavedProject>,
}

impl ProjectLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the library from storage.
    ///
    /// An unreadable store or a malformed document yields an empty
    /// library; a single bad entry discards the whole document.
    pub fn load(storage: &dyn Storage) -> Self {
        let raw = match storage.get(LIBRARY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                warn!(error = %e, "Could not read project library, starting empty");
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<SavedProject>>(&raw) {
            Ok(projects) => {
                info!(count = projects.len(), "Project library loaded");
                Self { projects }
            }
            Err(e) => {
                warn!(error = %e, "Project library is malformed, starting empty");
                Self::new()
            }
        }
    }

    /// All projects, newest first
    pub fn list(&self) -> &[SavedProject] {
        &self.projects
    }

    /// Find a project by id
    pub fn get(&self, id: &str) -> Option<&SavedProject> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// The first millisecond at or after `millis` that no saved project
    /// uses as its id
    pub fn free_id_millis(&self, millis: i64) -> i64 {
        let mut candidate = millis;
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate
    }

    /// Prepend a project and persist the whole sequence.
    ///
    /// Identical content saved twice produces two entries.
    pub fn save(&mut self, storage: &dyn Storage, project: SavedProject) -> Result<(), StorageError> {
        let id = project.id.clone();

        let mut updated = Vec::with_capacity(self.projects.len() + 1);
        updated.push(project);
        updated.extend(self.projects.iter().cloned());

        self.commit(storage, updated)?;

        info!(project_id = %id, count = self.projects.len(), "Project saved");
        Ok(())
    }

    /// Remove the project with `id` and persist the remaining sequence.
    ///
    /// Returns `false` (and writes nothing) when no project has that id.
    pub fn delete(&mut self, storage: &dyn Storage, id: &str) -> Result<bool, StorageError> {
        let Some(index) = self.projects.iter().position(|p| p.id == id) else {
            return Ok(false);
        };

        let mut updated = self.projects.clone();
        updated.remove(index);

        self.commit(storage, updated)?;

        info!(project_id = %id, count = self.projects.len(), "Project deleted");
        Ok(true)
    }

    fn commit(&mut self, storage: &dyn Storage, updated: Vec<SavedProject>) -> Result<(), StorageError> {
        let json = serde_json::to_string(&updated)?;
        storage.set(LIBRARY_KEY, &json)?;
        self.projects = updated;
        Ok(())
    }
}
