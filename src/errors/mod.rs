use std::fmt;

#[derive(Debug)]
pub enum AppError {
    IoError(std::io::Error),
    TomlError(toml::de::Error),
    JsonError(serde_json::Error),
    ZipError(zip::result::ZipError),
    VersionNotFound(String),
    FileNotFound(String),
    NoVersions,
    MissingPrompt,
    InvalidInput(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::IoError(e) => write!(f, "IO error: {}", e),
            AppError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            AppError::JsonError(e) => write!(f, "Session file error: {}", e),
            AppError::ZipError(e) => write!(f, "Zip error: {}", e),
            AppError::VersionNotFound(id) => write!(f, "Version not found: {}", id),
            AppError::FileNotFound(path) => write!(f, "File not found: {}", path),
            AppError::NoVersions => write!(f, "No versions yet; send a prompt first"),
            AppError::MissingPrompt => write!(f, "Prompt is required"),
            AppError::InvalidInput(e) => write!(f, "Invalid input: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::TomlError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        AppError::ZipError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_lookup() {
        assert_eq!(
            AppError::VersionNotFound("v9".to_string()).to_string(),
            "Version not found: v9"
        );
        let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.to_string(), "IO error: gone");
    }
}
