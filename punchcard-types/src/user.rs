//! Enrolled user records

use std::fmt;

use serde::Serialize;

/// User privilege level
///
/// Stored as a single byte in the user record. Codes other than the
/// four documented levels are preserved as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Privilege {
    User,
    Enroller,
    Admin,
    SuperAdmin,
    Other(u8),
}

impl Privilege {
    /// Raw privilege code as stored on the device
    pub fn code(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Enroller => 2,
            Self::Admin => 6,
            Self::SuperAdmin => 14,
            Self::Other(code) => code,
        }
    }
}

impl From<u8> for Privilege {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::User,
            2 => Self::Enroller,
            6 => Self::Admin,
            14 => Self::SuperAdmin,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Enroller => write!(f, "Enroller"),
            Self::Admin => write!(f, "Admin"),
            Self::SuperAdmin => write!(f, "Super Admin"),
            Self::Other(code) => write!(f, "Other({code})"),
        }
    }
}

/// One enrolled user, decoded from a fixed-width slice of the user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    /// Device-local slot number, unique per device snapshot
    pub uid: u16,

    /// External user identifier (badge / payroll number)
    pub user_id: String,

    /// Display name
    pub name: String,

    /// Privilege level
    pub privilege: Privilege,

    /// Device-local verification password
    pub password: String,

    /// Group number
    pub group_id: u8,

    /// Card number (0 when no card is enrolled)
    pub card: u32,
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User[uid={}, id={}, name={}, privilege={}]",
            self.uid, self.user_id, self.name, self.privilege
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_privilege_round_trip() {
        for code in [0u8, 2, 6, 14, 5] {
            assert_eq!(Privilege::from(code).code(), code);
        }
    }

    #[test]
    fn test_privilege_from_known_codes() {
        assert_eq!(Privilege::from(0), Privilege::User);
        assert_eq!(Privilege::from(2), Privilege::Enroller);
        assert_eq!(Privilege::from(6), Privilege::Admin);
        assert_eq!(Privilege::from(14), Privilege::SuperAdmin);
        assert_eq!(Privilege::from(9), Privilege::Other(9));
    }
}
