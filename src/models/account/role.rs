//! Account roles and the capabilities they grant.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadOwnMailbox,
    ReadAnyMailbox,
    DeleteEmail,
    TriggerSync,
}

impl Role {
    /// Decode the `users.role_id` column.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(Role::SuperAdmin),
            1 => Some(Role::User),
            2 => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Role::SuperAdmin => 0,
            Role::User => 1,
            Role::Admin => 2,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::ReadOwnMailbox => true,
            Capability::ReadAnyMailbox | Capability::DeleteEmail | Capability::TriggerSync => {
                matches!(self, Role::SuperAdmin | Role::Admin)
            }
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "superadmin" | "super_admin" | "0" => Ok(Role::SuperAdmin),
            "user" | "1" => Ok(Role::User),
            "admin" | "2" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
