//! High-level operations.
//!
//! This module contains the implementation of tend commands: discovery
//! and drift detection (read-only, never failing) and the verified
//! manifest mutations.

pub mod discover;
pub mod drift;
pub mod module_graph;
pub mod register;

pub use discover::{
    discover_dependencies, discover_flags, discover_members, discover_units, member_dir,
};
pub use drift::{
    check, find_flag_references, find_location_mismatches, find_undeclared_flags,
    find_unregistered_files, DriftOptions, DriftReport, FlagReference, LocationMismatch,
    UnregisteredItem,
};
pub use module_graph::ModuleGraph;
pub use register::{
    declare_feature, pin_dependency, register_unit, register_units, unregister_unit, EditResult,
    PinOptions, RegisterOptions, RegisterResult,
};
