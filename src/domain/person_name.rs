use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, thiserror::Error)]
#[error("{0} is not a valid name")]
pub struct PersonNameError(String);

#[derive(Debug, Clone)]
pub struct PersonName(String);

const FORBIDDEN_CHARS: &[char] = &['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

impl PersonName {
    pub fn parse(s: String) -> Result<PersonName, PersonNameError> {
        let is_empty_or_whitespace = s.trim().is_empty();

        // Matches the VARCHAR(255) columns.
        let is_too_long = s.graphemes(true).nth(255).is_some();

        let contains_forbidden_chars = s.chars().any(|g| FORBIDDEN_CHARS.contains(&g));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_chars {
            Err(PersonNameError(s))
        } else {
            Ok(Self(s.trim().to_string()))
        }
    }

    /// Names are optional: a blank input means "no name".
    pub fn parse_optional(s: Option<String>) -> Result<Option<PersonName>, PersonNameError> {
        match s {
            Some(s) if !s.trim().is_empty() => Self::parse(s).map(Some),
            _ => Ok(None),
        }
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
