mod detector;
mod foundry;
mod hardhat;
mod truffle;

pub use detector::detect;

use std::path::{Path, PathBuf};

use eyre::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum ProjectType {
    Truffle,
    Foundry,
    Hardhat,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::Truffle => write!(f, "Truffle"),
            ProjectType::Foundry => write!(f, "Foundry"),
            ProjectType::Hardhat => write!(f, "Hardhat"),
        }
    }
}

/// Load the project at `path`, detecting its type unless one is forced
pub fn load(path: &Path, project_type: Option<ProjectType>) -> Result<Project> {
    let project = match project_type {
        Some(ProjectType::Truffle) => truffle::load_project(path)?,
        Some(ProjectType::Foundry) => foundry::load_project(path)?,
        Some(ProjectType::Hardhat) => hardhat::load_project(path)?,
        None => detect(path)?,
    };

    tracing::info!(
        project = %project.name,
        kind = %project.project_type,
        artifacts = %project.artifact_dir.display(),
        "Loaded project"
    );
    Ok(project)
}

/// A contracts project: where compiled artifacts live and where deployments are recorded
#[derive(Debug, Clone)]
pub struct Project {
    pub project_type: ProjectType,
    pub name: String,
    pub artifact_dir: PathBuf,
    pub deployments_dir: PathBuf,
}

impl Project {
    fn new(project_type: ProjectType, root: &Path, artifact_dir: PathBuf) -> Self {
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self {
            project_type,
            name,
            artifact_dir,
            deployments_dir: root.join("deployments"),
        }
    }

    /// Location of the compiled artifact for `contract`
    pub fn artifact_path(&self, contract: &str) -> PathBuf {
        match self.project_type {
            ProjectType::Truffle => self.artifact_dir.join(format!("{}.json", contract)),
            ProjectType::Foundry | ProjectType::Hardhat => self
                .artifact_dir
                .join(format!("{}.sol", contract))
                .join(format!("{}.json", contract)),
        }
    }
}
