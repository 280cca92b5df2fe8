//! HTTP handlers, one module per resource.

pub mod article_versions;
pub mod articles;
pub mod auth;
pub mod categories;
pub mod members;
