use std::path::Path;

use eyre::{Result, eyre};

use super::{Project, ProjectType, foundry, hardhat, truffle};

/// Detect the project type based on configuration files present in the directory
pub fn detect(path: &Path) -> Result<Project> {
    match project_type(path) {
        Some(ProjectType::Truffle) => {
            tracing::info!("Detected Truffle project at {:?}", path);
            truffle::load_project(path)
        }
        Some(ProjectType::Foundry) => {
            tracing::info!("Detected Foundry project at {:?}", path);
            foundry::load_project(path)
        }
        Some(ProjectType::Hardhat) => {
            tracing::info!("Detected Hardhat project at {:?}", path);
            hardhat::load_project(path)
        }
        None => Err(eyre!(
            "No Truffle, Foundry or Hardhat project detected at {:?}\n\
             Expected: truffle-config.js, foundry.toml or hardhat.config.(js|ts)",
            path
        )),
    }
}

/// Truffle wins when several config files are present
fn project_type(path: &Path) -> Option<ProjectType> {
    if truffle::CONFIG_FILES.iter().any(|f| path.join(f).exists()) {
        Some(ProjectType::Truffle)
    } else if path.join("foundry.toml").exists() {
        Some(ProjectType::Foundry)
    } else if hardhat::CONFIG_FILES.iter().any(|f| path.join(f).exists()) {
        Some(ProjectType::Hardhat)
    } else {
        None
    }
}
