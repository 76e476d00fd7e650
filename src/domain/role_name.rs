#[derive(Debug, thiserror::Error)]
pub enum RoleNameError {
    #[error("Role name cannot be empty")]
    Empty,
    #[error("Role name cannot be longer than 80 characters")]
    TooLong,
}

#[derive(Debug, Clone)]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(s: String) -> Result<RoleName, RoleNameError> {
        let s = s.trim();

        if s.is_empty() {
            Err(RoleNameError::Empty)
        } else if s.chars().count() > 80 {
            Err(RoleNameError::TooLong)
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
