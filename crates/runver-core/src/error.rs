use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{field} is required")]
    MissingParameter { field: &'static str },

    // ── Resource naming ──
    #[error("invalid version name {version:?}: {reason}")]
    InvalidVersion {
        version: String,
        reason: &'static str,
    },

    #[error("project ID {project_id:?} is {len} characters, exceeds {max} characters")]
    InvalidProjectId {
        project_id: String,
        len: usize,
        max: usize,
    },

    #[error(
        "service name {name:?} is {len} characters, exceeds {max} characters; \
         use a shorter project ID ({project_len} chars) or version name ({version_len} chars)"
    )]
    NameTooLong {
        name: String,
        len: usize,
        max: usize,
        project_len: usize,
        version_len: usize,
    },

    #[error(
        "service account ID {id:?} is {len} characters, must be between {min} and {max} characters"
    )]
    InvalidServiceAccountId {
        id: String,
        len: usize,
        min: usize,
        max: usize,
    },
}
