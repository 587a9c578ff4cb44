//! Plan files: YAML documents listing projects, their plates, and the
//! filament each plate needs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::types::FilamentId;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse plan {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl Status {
    pub fn is_completed(self) -> bool {
        self == Status::Completed
    }
}

/// One filament need of a plate.
///
/// `filament_id` is `None` until the free-text name/material has been
/// resolved against the inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filament_id: Option<FilamentId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub material: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,
    /// Grams required.
    pub amount: f64,
}

impl Requirement {
    pub fn label(&self) -> String {
        match (self.name.is_empty(), self.filament_id) {
            (false, _) => self.name.clone(),
            (true, Some(id)) => format!("filament #{id}"),
            (true, None) => format!("unnamed {}", self.material),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub needs: Vec<Requirement>,
}

/// A project is a job: an ordered list of plates printed in sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub plates: Vec<Plate>,
}

impl Project {
    /// Non-completed plates with their index in `plates`.
    pub fn pending_plates(&self) -> impl Iterator<Item = (usize, &Plate)> {
        self.plates
            .iter()
            .enumerate()
            .filter(|(_, plate)| !plate.status.is_completed())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_location: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl PlanFile {
    pub fn from_file(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Non-completed projects with their index in `projects`.
    pub fn pending_projects(&self) -> impl Iterator<Item = (usize, &Project)> {
        self.projects
            .iter()
            .enumerate()
            .filter(|(_, project)| !project.status.is_completed())
    }
}

/// A plan file together with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredPlan {
    pub path: PathBuf,
    pub plan: PlanFile,
}

/// Load every `*.yaml` / `*.yml` plan directly inside `dirs`.
///
/// Files are de-duplicated by canonical path. Unreadable or unparsable
/// files are skipped with a warning, as are plans without projects.
pub fn discover_plans(dirs: &[PathBuf]) -> Vec<DiscoveredPlan> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut plans = Vec::new();

    for dir in dirs {
        let mut entries: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_plan_file(path))
            .collect();
        entries.sort();

        for path in entries {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(canonical.clone()) {
                continue;
            }
            match PlanFile::from_file(&path) {
                Ok(plan) if !plan.projects.is_empty() => {
                    debug!(path = %canonical.display(), "discovered plan");
                    plans.push(DiscoveredPlan {
                        path: canonical,
                        plan,
                    });
                }
                Ok(_) => {}
                Err(err) => warn!("skipping plan: {err}"),
            }
        }
    }

    plans
}

fn is_plan_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}
