//! Versioned raw memory: state that outlives a module reload.
//!
//! The host keeps one raw string across cycles. Logic modules store their
//! state in it wrapped in an envelope carrying [`MEMORY_VERSION`]; a mismatch
//! or unreadable payload yields fresh state rather than an error.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Bump when the persisted layout changes incompatibly.
pub const MEMORY_VERSION: (u8, u8, u8, u8) = (0, 1, 0, 0);

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: (u8, u8, u8, u8),
    data: T,
}

pub fn encode<T: Serialize>(data: &T) -> Result<String> {
    let envelope = Envelope {
        version: MEMORY_VERSION,
        data,
    };
    serde_json::to_string(&envelope).context("serialize raw memory")
}

/// Decode state stored by [`encode`], falling back to `T::default()`.
pub fn decode_or_default<T: DeserializeOwned + Default>(raw: &str) -> T {
    if raw.trim().is_empty() {
        return T::default();
    }
    match serde_json::from_str::<Envelope<T>>(raw) {
        Ok(envelope) if envelope.version == MEMORY_VERSION => envelope.data,
        Ok(envelope) => {
            warn!(
                found = ?envelope.version,
                expected = ?MEMORY_VERSION,
                "raw memory version mismatch; starting fresh"
            );
            T::default()
        }
        Err(err) => {
            warn!(%err, "raw memory unreadable; starting fresh");
            T::default()
        }
    }
}

/// Load the host's raw memory string. A missing file is empty memory.
pub fn load_raw_memory(path: &Path) -> Result<String> {
    if !path.exists() {
        debug!(path = %path.display(), "no raw memory on disk");
        return Ok(String::new());
    }
    fs::read_to_string(path).with_context(|| format!("read raw memory {}", path.display()))
}

/// Atomically write raw memory to disk (temp file + rename).
pub fn write_raw_memory(path: &Path, raw: &str) -> Result<()> {
    debug!(path = %path.display(), bytes = raw.len(), "writing raw memory");
    let parent = path
        .parent()
        .with_context(|| format!("raw memory path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, raw)
        .with_context(|| format!("write temp raw memory {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("replace raw memory {}", path.display()))?;
    Ok(())
}
