//! Attribute classification

use crate::types::{Dependency, Status};

/// Derive the status of an attribute from its enabled flag and dependencies.
///
/// A referenced attribute is in use even when disabled. Never returns
/// [`Status::Unknown`].
pub fn classify(enabled: bool, dependencies: &[Dependency]) -> Status {
    if !dependencies.is_empty() {
        Status::InUse
    } else if !enabled {
        Status::Orphaned
    } else {
        Status::Safe
    }
}
