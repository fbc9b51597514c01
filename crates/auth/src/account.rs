//! Staff directory entries.
//!
//! Credentials live with the identity provider; the service keeps the roles
//! it should honour and a lock flag it enforces on every request.
//!
//! # Invariants
//! - The primary administrator cannot be edited or locked.
//! - Nobody can lock their own account.
//! - Locked accounts cannot be granted new roles.
//! - Emails are stored trimmed and lower-cased.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_core::{AggregateRoot, DomainError, DomainResult, UserId};

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAccount {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl StaffAccount {
    /// Register an account with one of the assignable roles.
    pub fn create(
        id: UserId,
        email: &str,
        display_name: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !role.is_assignable() {
            return Err(DomainError::validation(format!(
                "role '{role}' cannot be assigned from the directory"
            )));
        }
        Self::build(id, email, display_name, vec![role], now)
    }

    /// The bootstrap administrator, created at startup.
    pub fn primary_admin(id: UserId, email: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::build(id, email, "Administrator", vec![Role::ADMIN], now)
    }

    fn build(
        id: UserId,
        email: &str,
        display_name: &str,
        roles: Vec<Role>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let email = normalize_email(email)?;
        let display_name = match display_name.trim() {
            "" => email.clone(),
            name => name.to_string(),
        };
        Ok(Self {
            id,
            email,
            display_name,
            roles,
            locked: false,
            created_at: now,
            version: 1,
        })
    }

    pub fn is_primary_admin(&self, primary_admin_email: &str) -> bool {
        self.email.eq_ignore_ascii_case(primary_admin_email.trim())
    }

    fn ensure_editable(&self, primary_admin_email: &str) -> DomainResult<()> {
        if self.is_primary_admin(primary_admin_email) {
            return Err(DomainError::conflict("the primary administrator cannot be modified"));
        }
        Ok(())
    }

    pub fn change_email(&mut self, email: &str, primary_admin_email: &str) -> DomainResult<()> {
        self.ensure_editable(primary_admin_email)?;
        self.email = normalize_email(email)?;
        self.version += 1;
        Ok(())
    }

    pub fn assign_role(&mut self, role: Role, primary_admin_email: &str) -> DomainResult<()> {
        self.ensure_editable(primary_admin_email)?;
        if self.locked {
            return Err(DomainError::conflict("locked accounts cannot receive roles"));
        }
        if !role.is_assignable() {
            return Err(DomainError::validation(format!(
                "role '{role}' cannot be assigned from the directory"
            )));
        }
        if self.roles.contains(&role) {
            return Err(DomainError::conflict(format!("role '{role}' already assigned")));
        }
        self.roles.push(role);
        self.version += 1;
        Ok(())
    }

    pub fn revoke_role(&mut self, role: &Role, primary_admin_email: &str) -> DomainResult<()> {
        self.ensure_editable(primary_admin_email)?;
        if !self.roles.contains(role) {
            return Err(DomainError::not_found(format!("role '{role}' on this account")));
        }
        self.roles.retain(|r| r != role);
        self.version += 1;
        Ok(())
    }

    pub fn lock(&mut self, actor: UserId, primary_admin_email: &str) -> DomainResult<()> {
        self.ensure_editable(primary_admin_email)?;
        if actor == self.id {
            return Err(DomainError::validation("you cannot lock your own account"));
        }
        if !self.locked {
            self.locked = true;
            self.version += 1;
        }
        Ok(())
    }

    pub fn unlock(&mut self, primary_admin_email: &str) -> DomainResult<()> {
        self.ensure_editable(primary_admin_email)?;
        if self.locked {
            self.locked = false;
            self.version += 1;
        }
        Ok(())
    }
}

impl AggregateRoot for StaffAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid || email.contains(char::is_whitespace) {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "admin@biblioteca.local";

    fn teacher() -> StaffAccount {
        StaffAccount::create(UserId::new(), " Ana@Escuela.edu ", "Ana", Role::TEACHER, Utc::now())
            .unwrap()
    }

    #[test]
    fn create_normalizes_email_and_defaults_name() {
        let a = teacher();
        assert_eq!(a.email, "ana@escuela.edu");
        let b = StaffAccount::create(UserId::new(), "b@x.org", "  ", Role::STUDENT, Utc::now()).unwrap();
        assert_eq!(b.display_name, "b@x.org");
    }

    #[test]
    fn create_rejects_admin_role_and_bad_email() {
        assert!(StaffAccount::create(UserId::new(), "a@b.c", "", Role::ADMIN, Utc::now()).is_err());
        for bad in ["", "no-at-sign", "@x.org", "a@nodot", "a b@x.org"] {
            match StaffAccount::create(UserId::new(), bad, "", Role::STUDENT, Utc::now()) {
                Err(DomainError::Validation(_)) => {}
                other => panic!("expected validation error for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn primary_admin_is_immutable() {
        let mut admin = StaffAccount::primary_admin(UserId::new(), PRIMARY, Utc::now()).unwrap();
        assert!(admin.change_email("x@y.z", PRIMARY).is_err());
        assert!(admin.lock(UserId::new(), PRIMARY).is_err());
        assert!(admin.assign_role(Role::TEACHER, PRIMARY).is_err());
        assert_eq!(admin.version, 1);
    }

    #[test]
    fn cannot_lock_self() {
        let mut a = teacher();
        let me = a.id;
        assert!(a.lock(me, PRIMARY).is_err());
        a.lock(UserId::new(), PRIMARY).unwrap();
        assert!(a.locked);
    }

    #[test]
    fn locked_accounts_get_no_new_roles() {
        let mut a = teacher();
        a.lock(UserId::new(), PRIMARY).unwrap();
        match a.assign_role(Role::STUDENT, PRIMARY) {
            Err(DomainError::Conflict(_)) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
        a.unlock(PRIMARY).unwrap();
        a.assign_role(Role::STUDENT, PRIMARY).unwrap();
        assert_eq!(a.roles, vec![Role::TEACHER, Role::STUDENT]);
    }

    #[test]
    fn revoke_requires_assigned_role() {
        let mut a = teacher();
        assert!(matches!(
            a.revoke_role(&Role::STUDENT, PRIMARY),
            Err(DomainError::NotFound(_))
        ));
        a.revoke_role(&Role::TEACHER, PRIMARY).unwrap();
        assert!(a.roles.is_empty());
    }

    #[test]
    fn duplicate_role_is_a_conflict() {
        let mut a = teacher();
        assert!(matches!(
            a.assign_role(Role::TEACHER, PRIMARY),
            Err(DomainError::Conflict(_))
        ));
    }
}
