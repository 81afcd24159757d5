use std::path::Path;

use eyre::{Result, eyre};

use super::{Project, ProjectType};

pub const CONFIG_FILES: [&str; 2] = ["truffle-config.js", "truffle.js"];

/// Load a Truffle project; artifacts are written to build/contracts
pub fn load_project(path: &Path) -> Result<Project> {
    if !CONFIG_FILES.iter().any(|f| path.join(f).exists()) {
        return Err(eyre!("truffle-config.js or truffle.js not found at {:?}", path));
    }

    Ok(Project::new(
        ProjectType::Truffle,
        path,
        path.join("build").join("contracts"),
    ))
}
