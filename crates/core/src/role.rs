//! Roles and the authenticated caller.
//!
//! Role names arrive as display strings ("Admin", "Dosen Wali", "Mahasiswa")
//! from the token issuer and the user directory. They are parsed into [`Role`]
//! once at that boundary; everything downstream matches on the enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    /// Academic advisor (Dosen Wali).
    Advisor,
    /// Student (Mahasiswa).
    Student,
}

impl Role {
    /// The display name used on the wire.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Advisor => "Dosen Wali",
            Role::Student => "Mahasiswa",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    /// Accepts the display names and the lowercase English aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Admin" | "admin" => Ok(Role::Admin),
            "Dosen Wali" | "advisor" => Ok(Role::Advisor),
            "Mahasiswa" | "student" => Ok(Role::Student),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The authenticated identity driving a workflow operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
            permissions: Vec::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_and_aliases() {
        assert_eq!("Dosen Wali".parse::<Role>().unwrap(), Role::Advisor);
        assert_eq!("advisor".parse::<Role>().unwrap(), Role::Advisor);
        assert_eq!("Mahasiswa".parse::<Role>().unwrap(), Role::Student);
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn rejects_near_misses() {
        assert!("dosen wali".parse::<Role>().is_err());
        assert!("ADMIN".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_as_display_name() {
        let caller = Caller::new("u-1", "budi", Role::Advisor);
        let json = serde_json::to_value(&caller).unwrap();
        assert_eq!(json["role"], "Dosen Wali");
        let back: Caller = serde_json::from_value(json).unwrap();
        assert_eq!(back.role, Role::Advisor);
    }
}
