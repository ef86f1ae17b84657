//! Spec map validation.
//!
//! Run once when specs are loaded, not per trace. Keys are visited in sorted
//! order so the reported error is the same on every run.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::patch::SpecMap;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("empty fingerprint key in specs")]
    EmptyFingerprint,

    #[error("spec for fp={fingerprint} has empty ID")]
    EmptyId { fingerprint: String },

    #[error("spec ID {id} is used by fp={first} and fp={second}")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },
}

/// Rejects empty fingerprint keys and empty IDs.
pub fn validate_specs(specs: &SpecMap) -> Result<(), SpecError> {
    let mut keys: Vec<&String> = specs.keys().collect();
    keys.sort();
    for fingerprint in keys {
        if fingerprint.is_empty() {
            return Err(SpecError::EmptyFingerprint);
        }
        if specs[fingerprint].id.is_empty() {
            return Err(SpecError::EmptyId {
                fingerprint: fingerprint.clone(),
            });
        }
    }
    Ok(())
}

/// [`validate_specs`], plus: no two fingerprints may share an ID. Recorder
/// observations are keyed by ID, so a shared ID would let one atom's outcome
/// overwrite another's.
pub fn validate_specs_strict(specs: &SpecMap) -> Result<(), SpecError> {
    validate_specs(specs)?;
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    let mut keys: Vec<&String> = specs.keys().collect();
    keys.sort();
    for fingerprint in keys {
        let id = specs[fingerprint].id.as_str();
        if let Some(first) = owners.insert(id, fingerprint) {
            return Err(SpecError::DuplicateId {
                id: id.to_string(),
                first: first.to_string(),
                second: fingerprint.clone(),
            });
        }
    }
    Ok(())
}
