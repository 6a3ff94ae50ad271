// src/models/user.rs

use serde::{Deserialize, Serialize};

/// User role as carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Identity resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Only the creator may edit a post; admins get no override here.
    pub fn can_edit(&self, creator_id: &str) -> bool {
        self.id == creator_id
    }

    /// The creator or any admin may delete a post.
    pub fn can_delete(&self, creator_id: &str) -> bool {
        self.id == creator_id || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str, role: Role) -> Caller {
        Caller {
            id: id.to_string(),
            name: id.to_string(),
            role,
        }
    }

    #[test]
    fn admin_cannot_edit_foreign_post() {
        assert!(!caller("admin", Role::Admin).can_edit("u1"));
        assert!(caller("u1", Role::User).can_edit("u1"));
    }

    #[test]
    fn admin_can_delete_any_post() {
        assert!(caller("admin", Role::Admin).can_delete("u1"));
        assert!(caller("u1", Role::User).can_delete("u1"));
        assert!(!caller("u2", Role::User).can_delete("u1"));
    }

    #[test]
    fn role_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(Role::User.as_str(), "user");
    }
}
