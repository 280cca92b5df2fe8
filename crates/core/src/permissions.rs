//! Who may do what to which wiki entity.
//!
//! Reads are public unless an article's access level says otherwise. Writes
//! depend on the caller's roles and, for members, on whose record it is.
//! Handlers call [`authorize`] with the answer of one of the `can_*`
//! functions below. Gates that only look at roles (category writes, member
//! creation) are enforced by the API's role extractors.

use crate::access::{AccessLevel, MemberRoles};
use crate::error::CoreError;
use crate::types::DbId;

/// The kind of operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
}

/// The identity a request runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub member_id: Option<DbId>,
    pub roles: MemberRoles,
}

impl Caller {
    pub const ANONYMOUS: Caller = Caller {
        member_id: None,
        roles: MemberRoles::ANONYMOUS,
    };

    pub fn member(member_id: DbId, roles: MemberRoles) -> Self {
        Self {
            member_id: Some(member_id),
            roles,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.member_id.is_some() && self.roles.is_active
    }
}

/// Members: anyone views, superusers create and delete, a superuser or the
/// member themself updates.
pub fn can_manage_member(caller: &Caller, action: Action, target: Option<DbId>) -> bool {
    match action {
        Action::View => true,
        Action::Create | Action::Delete => caller.roles.superuser(),
        Action::Update => {
            caller.roles.superuser()
                || (caller.is_authenticated() && target.is_some() && caller.member_id == target)
        }
    }
}

/// Articles: viewing follows the access level, any member creates and
/// updates, staff (soft) delete.
pub fn can_manage_article(caller: &Caller, action: Action, access: AccessLevel) -> bool {
    match action {
        Action::View => access.permits(&caller.roles),
        Action::Create => caller.is_authenticated(),
        Action::Update => caller.is_authenticated() && access.permits(&caller.roles),
        Action::Delete => caller.roles.staff() && access.permits(&caller.roles),
    }
}

/// Article versions inherit visibility from their article. Any member adds
/// versions to articles they can see. Versions are never edited or removed.
pub fn can_manage_version(caller: &Caller, action: Action, article_access: AccessLevel) -> bool {
    match action {
        Action::View => article_access.permits(&caller.roles),
        Action::Create => caller.is_authenticated() && article_access.permits(&caller.roles),
        Action::Update | Action::Delete => false,
    }
}

/// Turn a permission answer into a result.
///
/// Anonymous callers get `Unauthorized` so clients know to log in;
/// authenticated callers get `Forbidden`.
pub fn authorize(caller: &Caller, allowed: bool, what: &str) -> Result<(), CoreError> {
    if allowed {
        Ok(())
    } else if caller.is_authenticated() {
        Err(CoreError::Forbidden(format!("Not allowed to {what}")))
    } else {
        Err(CoreError::Unauthorized(format!(
            "Authentication required to {what}"
        )))
    }
}
