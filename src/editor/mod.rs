//! Format-preserving manifest edits.
//!
//! The editor works on manifest text, never on the parsed tree. Each
//! operation takes the whole text and returns new text in which only the
//! edited region differs; comments, key order and unrelated sections are
//! kept byte for byte. Callers re-parse the result to verify it (see
//! [`crate::ops::register`]).

pub mod block;
pub mod errors;
pub mod insert;
pub mod layout;
pub mod remove;
pub mod scalar;

pub use block::Declaration;
pub use errors::EditError;
pub use insert::{insert_declaration, insert_table_entry};
pub use remove::remove_declaration;
pub use scalar::{rewrite_scalar_field, Selector};
