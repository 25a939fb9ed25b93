use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("remote path has no file name: {0:?}")]
    NoFileName(String),
}

/// Final `/`-separated segment of a listed path.
pub fn file_name_of(remote_path: &str) -> Result<&str, PathError> {
    let name = remote_path.rsplit('/').next().unwrap_or_default();
    match name {
        "" | "." | ".." => Err(PathError::NoFileName(remote_path.to_string())),
        // A backslash is a separator on Windows and must not reach `Path::join`.
        name if name.contains('\\') => Err(PathError::NoFileName(remote_path.to_string())),
        name => Ok(name),
    }
}
