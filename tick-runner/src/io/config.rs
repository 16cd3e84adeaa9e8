//! Runner configuration stored under `.tick-runner/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Runner configuration (TOML).
///
/// Missing fields default to the values in `Default`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Call the module's one-time `setup` after `initialize`.
    pub call_setup: bool,

    /// Mirror runner lines (loading, panics) to the notification sink.
    pub notify: bool,

    /// Emit the `TRACE:` line when a fault carries a backtrace.
    pub include_trace: bool,

    /// Cycles to run when `run` is invoked without `--ticks`.
    pub default_ticks: u32,

    pub sandbox: SandboxConfig,
}

/// Shape of the generated sandbox world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    pub creeps: u32,
    pub creep_capacity: u32,
    pub creep_work: u32,
    pub sources: u32,
    pub source_energy: u32,
    /// Energy in the spawn at the start of a run, spent on new creeps.
    pub spawn_energy: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            creeps: 2,
            creep_capacity: 50,
            creep_work: 2,
            sources: 2,
            source_energy: 300,
            spawn_energy: 300,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            call_setup: true,
            notify: true,
            include_trace: true,
            default_ticks: 10,
            sandbox: SandboxConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_ticks == 0 {
            return Err(anyhow!("default_ticks must be > 0"));
        }
        if self.sandbox.creeps == 0 {
            return Err(anyhow!("sandbox.creeps must be > 0"));
        }
        if self.sandbox.creep_capacity == 0 {
            return Err(anyhow!("sandbox.creep_capacity must be > 0"));
        }
        if self.sandbox.creep_work == 0 {
            return Err(anyhow!("sandbox.creep_work must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        let cfg = RunnerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunnerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RunnerConfig::default());
    }

    #[test]
    fn write_then_load_preserves_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = RunnerConfig {
            call_setup: false,
            sandbox: SandboxConfig {
                creeps: 5,
                ..SandboxConfig::default()
            },
            ..RunnerConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "call_setup = false\n\n[sandbox]\nsources = 1\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert!(!cfg.call_setup);
        assert!(cfg.notify);
        assert_eq!(cfg.sandbox.sources, 1);
        assert_eq!(cfg.sandbox.creeps, SandboxConfig::default().creeps);
    }

    #[test]
    fn zero_ticks_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "default_ticks = 0\n").expect("write");

        let err = load_config(&path).expect_err("invalid config");
        assert!(format!("{err:#}").contains("default_ticks must be > 0"));
    }
}
