//! tend - keeps Cargo manifests in agreement with the tree they describe
//!
//! This crate provides the library functionality behind the `tend` CLI:
//! a model of workspace members, buildable units, dependencies and feature
//! flags built from manifests plus filesystem conventions, drift detection
//! against the source tree, and format-preserving manifest edits.

pub mod core;
pub mod editor;
pub mod ops;
pub mod util;

/// Test fixtures for tend unit tests.
///
/// This module is only available when compiling with `--cfg test`.
#[cfg(test)]
pub mod test_support;

pub use core::{
    dependency::{Dependency, DependencyKind},
    manifest::ManifestDocument,
    target::{Target, TargetKind},
    workspace::Member,
};

pub use util::context::GlobalContext;
