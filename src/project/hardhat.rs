use std::path::Path;

use eyre::{Result, eyre};

use super::{Project, ProjectType};

pub const CONFIG_FILES: [&str; 2] = ["hardhat.config.js", "hardhat.config.ts"];

/// Load a Hardhat project. Only the conventional artifacts/contracts layout is supported.
pub fn load_project(path: &Path) -> Result<Project> {
    if !CONFIG_FILES.iter().any(|f| path.join(f).exists()) {
        return Err(eyre!(
            "hardhat.config.js or hardhat.config.ts not found at {:?}",
            path
        ));
    }

    Ok(Project::new(
        ProjectType::Hardhat,
        path,
        path.join("artifacts").join("contracts"),
    ))
}
