//! Initialization helpers for `.tick-runner/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{RunnerConfig, write_config};

/// All canonical paths within `.tick-runner/` for a project root.
#[derive(Debug, Clone)]
pub struct RunnerPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub config_path: PathBuf,
    pub raw_memory_path: PathBuf,
}

impl RunnerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(".tick-runner");
        Self {
            root,
            config_path: state_dir.join("config.toml"),
            raw_memory_path: state_dir.join("raw_memory.json"),
            state_dir,
        }
    }
}

/// Options for `init_runner`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config and clear raw memory.
    pub force: bool,
}

/// Create `.tick-runner/` with a default config.
///
/// Fails if the config already exists unless `options.force` is set.
pub fn init_runner(root: &Path, options: &InitOptions) -> Result<RunnerPaths> {
    let paths = RunnerPaths::new(root);
    if paths.state_dir.exists() && !paths.state_dir.is_dir() {
        return Err(anyhow!(
            "tick-runner init: .tick-runner exists but is not a directory"
        ));
    }
    if paths.config_path.exists() && !options.force {
        return Err(anyhow!(
            "tick-runner init: config already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create {}", paths.state_dir.display()))?;
    write_config(&paths.config_path, &RunnerConfig::default())?;
    if options.force && paths.raw_memory_path.exists() {
        fs::remove_file(&paths.raw_memory_path)
            .with_context(|| format!("remove {}", paths.raw_memory_path.display()))?;
    }

    Ok(paths)
}
