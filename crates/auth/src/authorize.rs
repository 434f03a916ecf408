use std::collections::BTreeSet;

use thiserror::Error;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: principal has no roles")]
    NoRoles,

    #[error("forbidden: requires one of [{0}]")]
    MissingRole(String),
}

/// Role guard produced by [`requires`].
///
/// Satisfied when the principal holds at least one of the listed roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    required: BTreeSet<Role>,
}

impl RoleGuard {
    pub fn required(&self) -> &BTreeSet<Role> {
        &self.required
    }

    /// Apply the guard to a principal.
    ///
    /// - No IO
    /// - No panics
    /// - A principal without roles is rejected before any intersection is
    ///   computed, so tokens minted before roles existed never pass.
    pub fn check(&self, principal: &Principal) -> Result<(), AuthzError> {
        let held = principal.roles();
        if held.is_empty() {
            return Err(AuthzError::NoRoles);
        }

        if held.iter().any(|r| self.required.contains(r)) {
            Ok(())
        } else {
            Err(AuthzError::MissingRole(self.describe()))
        }
    }

    fn describe(&self) -> String {
        self.required
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build a guard for an operation gated on any of `roles`.
///
/// ```
/// use keygate_auth::requires;
/// let guard = requires(["admin", "manager"]);
/// assert_eq!(guard.required().len(), 2);
/// ```
pub fn requires<I, R>(roles: I) -> RoleGuard
where
    I: IntoIterator<Item = R>,
    R: Into<Role>,
{
    RoleGuard {
        required: roles.into_iter().map(Into::into).collect(),
    }
}

/// What a protected operation declares about its callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// A verified token is enough.
    Authenticated,
    /// A verified token plus at least one role from the guard.
    Roles(RoleGuard),
}

impl Requirement {
    pub fn any_of<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Role>,
    {
        Self::Roles(requires(roles))
    }
}

/// Authorize a verified principal against an operation's requirement.
pub fn authorize(principal: &Principal, requirement: &Requirement) -> Result<(), AuthzError> {
    match requirement {
        Requirement::Authenticated => Ok(()),
        Requirement::Roles(guard) => guard.check(principal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Claims;
    use keygate_core::UserId;
    use proptest::prelude::*;

    fn principal_with(roles: &[&'static str]) -> Principal {
        Principal::from_claims(Claims {
            sub: UserId::new("u1"),
            email: "a@b.com".into(),
            username: "alice".into(),
            roles: roles.iter().copied().map(Role::from).collect(),
            exp: 4_102_444_800,
            iat: 0,
        })
    }

    #[test]
    fn any_matching_role_is_enough() {
        let guard = requires(["admin", "manager"]);
        assert_eq!(guard.check(&principal_with(&["manager"])), Ok(()));
    }

    #[test]
    fn empty_role_set_is_always_rejected() {
        let guard = requires(["admin", "manager"]);
        assert_eq!(guard.check(&principal_with(&[])), Err(AuthzError::NoRoles));
        // Even a guard with no roles listed does not open the door.
        assert_eq!(
            requires(Vec::<Role>::new()).check(&principal_with(&[])),
            Err(AuthzError::NoRoles)
        );
    }

    #[test]
    fn disjoint_roles_are_rejected() {
        let err = requires(["admin"])
            .check(&principal_with(&["viewer"]))
            .unwrap_err();
        assert_eq!(err, AuthzError::MissingRole("admin".into()));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn authenticated_requirement_skips_role_check() {
        assert_eq!(
            authorize(&principal_with(&[]), &Requirement::Authenticated),
            Ok(())
        );
        assert!(authorize(&principal_with(&[]), &Requirement::any_of(["admin"])).is_err());
    }

    proptest! {
        /// Property: the guard grants access exactly when the role sets
        /// intersect and the principal holds at least one role.
        #[test]
        fn guard_matches_set_intersection(
            held in prop::collection::btree_set("[a-d]", 0..4),
            required in prop::collection::btree_set("[a-d]", 0..4),
        ) {
            let principal = Principal::from_claims(Claims {
                sub: UserId::new("u1"),
                email: "a@b.com".into(),
                username: "alice".into(),
                roles: held.iter().cloned().map(Role::from).collect(),
                exp: 4_102_444_800,
                iat: 0,
            });
            let guard = requires(required.iter().cloned().map(Role::from));

            let expected = !held.is_empty() && held.intersection(&required).next().is_some();
            prop_assert_eq!(guard.check(&principal).is_ok(), expected);
        }
    }
}
