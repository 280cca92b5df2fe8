//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated member from a JWT Bearer token.
//! - [`auth::MaybeAuthUser`] -- Same, but anonymous requests are allowed.
//! - [`rbac::RequireStaff`] -- Requires an active staff member.
//! - [`rbac::RequireSuperuser`] -- Requires an active superuser.

pub mod auth;
pub mod rbac;
