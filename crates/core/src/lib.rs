//! Domain logic for the RevoltWiki backend.
//!
//! Nothing in this crate performs I/O. The database and HTTP crates build on
//! these types and rules.

pub mod access;
pub mod diff;
pub mod error;
pub mod member;
pub mod pagination;
pub mod permissions;
pub mod types;
pub mod wiki;
