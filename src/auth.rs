use std::str::FromStr;

// ============================================================================
// Login Gate
// ============================================================================
//
// Role-scoped credential check guarding the console. The credentials are the
// placeholder pairs the product shipped with; a real deployment fronts this
// with its own identity provider. Kept to one module so nothing else in the
// codebase knows about passwords.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    CallCenter,
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "admin" => Ok(Role::Admin),
            "call-center" | "call_center" => Ok(Role::CallCenter),
            _ => Err(AuthError::UnknownRole(raw.to_string())),
        }
    }
}

/// Where a successful login lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Admin menu: driver directory or analytics.
    AdminMenu,
    /// The live dispatch board.
    Dashboard,
}

impl Destination {
    pub fn route(&self) -> &'static str {
        match self {
            Destination::AdminMenu => "/admin-choice",
            Destination::Dashboard => "/dashboard",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials for selected role")]
    InvalidCredentials,
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

pub fn authenticate(role: Role, username: &str, password: &str) -> Result<Destination, AuthError> {
    match (role, username, password) {
        (Role::Admin, "admin", "admin123") => Ok(Destination::AdminMenu),
        (Role::CallCenter, "call", "call123") => Ok(Destination::Dashboard),
        _ => Err(AuthError::InvalidCredentials),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_lands_on_admin_menu() {
        let destination = authenticate(Role::Admin, "admin", "admin123").unwrap();
        assert_eq!(destination, Destination::AdminMenu);
        assert_eq!(destination.route(), "/admin-choice");
    }

    #[test]
    fn test_call_center_lands_on_dashboard() {
        let destination = authenticate(Role::CallCenter, "call", "call123").unwrap();
        assert_eq!(destination, Destination::Dashboard);
        assert_eq!(destination.route(), "/dashboard");
    }

    #[test]
    fn test_wrong_password_rejected() {
        assert_eq!(
            authenticate(Role::Admin, "admin", "hunter2"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_credentials_are_role_scoped() {
        // Valid admin pair under the wrong role must not pass.
        assert_eq!(
            authenticate(Role::CallCenter, "admin", "admin123"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            authenticate(Role::Admin, "call", "call123"),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_role_parses_both_spellings() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("call-center".parse::<Role>(), Ok(Role::CallCenter));
        assert_eq!("call_center".parse::<Role>(), Ok(Role::CallCenter));
        assert!("dispatcher".parse::<Role>().is_err());
    }
}
