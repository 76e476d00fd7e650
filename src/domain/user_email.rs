use validator::validate_email;

#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid e-mail address")]
pub struct UserEmailError(String);

#[derive(Debug, Clone)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(s: String) -> Result<UserEmail, UserEmailError> {
        let s = s.trim().to_string();

        if validate_email(&s) {
            Ok(Self(s))
        } else {
            Err(UserEmailError(s))
        }
    }
}

impl std::fmt::Display for UserEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for UserEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
