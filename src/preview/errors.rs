use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    #[error("{filename}:{line}: {message}")]
    Compile {
        filename: String,
        line: usize,
        message: String,
    },
    #[error("{filename}: {message}")]
    Runtime { filename: String, message: String },
    #[error("mount failed: {0}")]
    Mount(String),
}
