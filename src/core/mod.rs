//! Core data structures for tend.
//!
//! This module contains the foundational types used throughout tend:
//! - The manifest document (text plus structural tree)
//! - Buildable units, dependencies and feature flags
//! - Target path conventions
//! - Workspace membership

pub mod convention;
pub mod dependency;
pub mod errors;
pub mod feature;
pub mod manifest;
pub mod target;
pub mod workspace;

pub use dependency::{Dependency, DependencyKind, DependencySet};
pub use errors::ManifestError;
pub use feature::Feature;
pub use manifest::{ManifestDocument, PackageIdentity, MANIFEST_NAME};
pub use target::{Target, TargetKind, TargetOrigin};
pub use workspace::{discover_members, find_manifest, find_workspace_root, Member};
