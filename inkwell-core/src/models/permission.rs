// Inkwell - A multi-user blogging platform built with Rust
// Copyright (C) 2025 Inkwell Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

/// The closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    Admin,
    Moderator,
    Blogger,
    User,
    Deny,
}

impl RoleName {
    pub fn all() -> Vec<RoleName> {
        vec![
            RoleName::Admin,
            RoleName::Moderator,
            RoleName::Blogger,
            RoleName::User,
            RoleName::Deny,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "admin",
            RoleName::Moderator => "moderator",
            RoleName::Blogger => "blogger",
            RoleName::User => "user",
            RoleName::Deny => "deny",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RoleName::Admin => "Super administrator",
            RoleName::Moderator => "Moderator",
            RoleName::Blogger => "May write blog posts",
            RoleName::User => "May read blog posts",
            RoleName::Deny => "Access denied",
        }
    }

    /// Role given to every newly registered account
    pub fn default_role() -> RoleName {
        RoleName::User
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(RoleName::Admin),
            "moderator" => Ok(RoleName::Moderator),
            "blogger" => Ok(RoleName::Blogger),
            "user" => Ok(RoleName::User),
            "deny" => Ok(RoleName::Deny),
            other => Err(anyhow!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub id: i64,
    pub name: RoleName,
    pub description: String,
}

/// Who is making a request, and which role needs they provide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identity {
    pub user_id: Option<i64>,
    pub roles: HashSet<RoleName>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: i64, roles: impl IntoIterator<Item = RoleName>) -> Self {
        Self {
            user_id: Some(user_id),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn provides(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }
}

/// A boolean predicate over role needs.
///
/// Trees are built from [`Permission::need`] leaves and combined with
/// `|`, `&` and `!`. Evaluation is pure and short-circuits.
#[derive(Debug, Clone, PartialEq)]
pub enum Permission {
    Need(RoleName),
    Any(Vec<Permission>),
    All(Vec<Permission>),
    Not(Box<Permission>),
}

impl Permission {
    pub fn need(role: RoleName) -> Self {
        Permission::Need(role)
    }

    /// Satisfied when the identity holds at least one of the roles.
    pub fn any_of(roles: &[RoleName]) -> Self {
        Permission::Any(roles.iter().copied().map(Permission::Need).collect())
    }

    pub fn allows(&self, identity: &Identity) -> bool {
        match self {
            Permission::Need(role) => identity.provides(*role),
            Permission::Any(items) => items.iter().any(|p| p.allows(identity)),
            Permission::All(items) => items.iter().all(|p| p.allows(identity)),
            Permission::Not(inner) => !inner.allows(identity),
        }
    }

    /// Holds for everyone not carrying the deny role.
    pub fn deny() -> Self {
        !Permission::need(RoleName::Deny)
    }

    /// Deny overrides admin as well.
    pub fn admin() -> Self {
        Permission::need(RoleName::Admin) & Permission::deny()
    }

    pub fn moderator() -> Self {
        Permission::any_of(&[RoleName::Moderator, RoleName::Admin]) & Permission::deny()
    }

    pub fn blogger() -> Self {
        Permission::any_of(&[RoleName::Blogger, RoleName::Moderator, RoleName::Admin])
            & Permission::deny()
    }

    pub fn user() -> Self {
        Permission::any_of(&[
            RoleName::User,
            RoleName::Blogger,
            RoleName::Moderator,
            RoleName::Admin,
        ]) & Permission::deny()
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        match self {
            Permission::Any(mut items) => {
                items.push(rhs);
                Permission::Any(items)
            }
            other => Permission::Any(vec![other, rhs]),
        }
    }
}

impl BitAnd for Permission {
    type Output = Permission;

    fn bitand(self, rhs: Permission) -> Permission {
        match self {
            Permission::All(mut items) => {
                items.push(rhs);
                Permission::All(items)
            }
            other => Permission::All(vec![other, rhs]),
        }
    }
}

impl Not for Permission {
    type Output = Permission;

    fn not(self) -> Permission {
        match self {
            Permission::Not(inner) => *inner,
            other => Permission::Not(Box::new(other)),
        }
    }
}

/// Flags a template needs to decide which controls to show.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct Capabilities {
    pub is_admin: bool,
    pub is_moderator: bool,
    pub is_blogger: bool,
    pub is_user: bool,
    pub is_denied: bool,
}

impl Capabilities {
    pub fn of(identity: &Identity) -> Self {
        Self {
            is_admin: Permission::admin().allows(identity),
            is_moderator: Permission::moderator().allows(identity),
            is_blogger: Permission::blogger().allows(identity),
            is_user: Permission::user().allows(identity),
            is_denied: identity.provides(RoleName::Deny),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(roles: &[RoleName]) -> Identity {
        Identity::for_user(1, roles.iter().copied())
    }

    #[test]
    fn test_role_name_round_trip() {
        for role in RoleName::all() {
            assert_eq!(role.as_str().parse::<RoleName>().unwrap(), role);
            assert_eq!(role.to_string(), role.as_str());
        }
        assert_eq!("Admin".parse::<RoleName>().unwrap(), RoleName::Admin);
        assert!("owner".parse::<RoleName>().is_err());
    }

    #[test]
    fn test_anonymous_passes_only_deny_guard() {
        let anon = Identity::anonymous();
        assert!(anon.user_id.is_none());
        assert!(Permission::deny().allows(&anon));
        assert!(!Permission::admin().allows(&anon));
        assert!(!Permission::moderator().allows(&anon));
        assert!(!Permission::blogger().allows(&anon));
        assert!(!Permission::user().allows(&anon));
    }

    #[test]
    fn test_role_hierarchy() {
        let admin = identity(&[RoleName::Admin]);
        assert!(Permission::admin().allows(&admin));
        assert!(Permission::moderator().allows(&admin));
        assert!(Permission::blogger().allows(&admin));
        assert!(Permission::user().allows(&admin));

        let moderator = identity(&[RoleName::Moderator]);
        assert!(!Permission::admin().allows(&moderator));
        assert!(Permission::moderator().allows(&moderator));
        assert!(Permission::blogger().allows(&moderator));
        assert!(Permission::user().allows(&moderator));

        let blogger = identity(&[RoleName::Blogger]);
        assert!(!Permission::moderator().allows(&blogger));
        assert!(Permission::blogger().allows(&blogger));
        assert!(Permission::user().allows(&blogger));

        let user = identity(&[RoleName::User]);
        assert!(!Permission::blogger().allows(&user));
        assert!(Permission::user().allows(&user));
    }

    #[test]
    fn test_deny_overrides_everything() {
        let banned = identity(&[
            RoleName::Admin,
            RoleName::Moderator,
            RoleName::Blogger,
            RoleName::User,
            RoleName::Deny,
        ]);
        assert!(!Permission::deny().allows(&banned));
        assert!(!Permission::admin().allows(&banned));
        assert!(!Permission::moderator().allows(&banned));
        assert!(!Permission::blogger().allows(&banned));
        assert!(!Permission::user().allows(&banned));

        let caps = Capabilities::of(&banned);
        assert!(caps.is_denied);
        assert!(!caps.is_admin && !caps.is_user);
    }

    #[test]
    fn test_operators_compose() {
        let p = Permission::need(RoleName::Blogger) | Permission::need(RoleName::User);
        assert!(matches!(&p, Permission::Any(items) if items.len() == 2));
        let p = p | Permission::need(RoleName::Admin);
        assert!(matches!(&p, Permission::Any(items) if items.len() == 3));

        let double_negated = !!Permission::need(RoleName::Admin);
        assert_eq!(double_negated, Permission::need(RoleName::Admin));
    }

    #[test]
    fn test_empty_groups() {
        let anon = Identity::anonymous();
        assert!(!Permission::Any(vec![]).allows(&anon));
        assert!(Permission::All(vec![]).allows(&anon));
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::of(&identity(&[RoleName::Blogger]));
        assert_eq!(
            caps,
            Capabilities {
                is_admin: false,
                is_moderator: false,
                is_blogger: true,
                is_user: true,
                is_denied: false,
            }
        );
    }
}
