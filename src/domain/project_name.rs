#[derive(Debug, thiserror::Error)]
pub enum ProjectNameError {
    #[error("Project name cannot be empty")]
    Empty,
    #[error("Project name cannot be longer than 255 characters")]
    TooLong,
}

#[derive(Debug, Clone)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(s: String) -> Result<ProjectName, ProjectNameError> {
        let s = s.trim();

        if s.is_empty() {
            Err(ProjectNameError::Empty)
        } else if s.chars().count() > 255 {
            Err(ProjectNameError::TooLong)
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
