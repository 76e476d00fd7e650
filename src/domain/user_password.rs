use secrecy::{ExposeSecret, Secret};

#[derive(Debug, thiserror::Error)]
#[error("Password must contain at least 8 and up to 64 characters.")]
pub struct UserPasswordError;

#[derive(Debug)]
pub struct UserPassword(Secret<String>);

impl UserPassword {
    pub fn parse(s: Secret<String>) -> Result<UserPassword, UserPasswordError> {
        if (8..=64).contains(&s.expose_secret().chars().count()) {
            Ok(Self(s))
        } else {
            Err(UserPasswordError)
        }
    }

    pub fn into_secret(self) -> Secret<String> {
        self.0
    }
}
