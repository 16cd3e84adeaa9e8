//! Per-cycle shared memory blob.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapping exchanged between the runner and the logic module.
///
/// Transient: the runner replaces it with empty mappings at the start of every
/// cycle, whatever the module wrote during the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedMemory {
    pub spawns: BTreeMap<String, Value>,
    pub creeps: BTreeMap<String, Value>,
}

impl SharedMemory {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.creeps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reset_discards_module_writes() {
        let mut memory = SharedMemory::default();
        memory.spawns.insert("spawn".to_string(), json!({"stockpile": 3}));
        memory.creeps.insert("worker-1".to_string(), json!({"task": "harvest"}));
        assert!(!memory.is_empty());

        memory.reset();
        assert!(memory.is_empty());
    }

    #[test]
    fn serializes_both_named_mappings() {
        let memory = SharedMemory::default();
        let value = serde_json::to_value(&memory).expect("serialize");
        assert_eq!(value, json!({"spawns": {}, "creeps": {}}));
    }
}
