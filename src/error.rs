use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for montage operations
#[derive(Error, Diagnostic, Debug)]
pub enum MontageError {
    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(montage::io))]
    Io { path: PathBuf, message: String },

    #[error("Parse error: {message}")]
    #[diagnostic(code(montage::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Couldn't find a montage.yaml in {start} or any parent directory")]
    #[diagnostic(
        code(montage::missing_project),
        help("Run `montage init` in your project root to create one")
    )]
    MissingProject { start: PathBuf },

    #[error("Sprite `{sprite}` references {path}, which does not exist")]
    #[diagnostic(code(montage::missing_source))]
    MissingSource { sprite: String, path: PathBuf },

    #[error("Sprite pattern `{pattern}` captures :name and also sets an explicit name")]
    #[diagnostic(
        code(montage::naming_conflict),
        help("Remove the `name` option, or replace :name in the pattern with a wildcard")
    )]
    NamingConflict { pattern: String },

    #[error("Sprite pattern `{pattern}` {message}")]
    #[diagnostic(code(montage::missing_name))]
    MissingName { pattern: String, message: String },

    #[error("More than one sprite is named `{name}`")]
    #[diagnostic(
        code(montage::duplicate_sprite),
        help("Sprite names must be unique within a project")
    )]
    DuplicateSprite { name: String },

    #[error("Can't write to {path}")]
    #[diagnostic(code(montage::target_not_writable), help("Check the directory permissions"))]
    TargetNotWritable { path: PathBuf },

    #[error("Image error with {path}: {message}")]
    #[diagnostic(code(montage::image))]
    Image { path: PathBuf, message: String },

    #[error("{tool} failed: {message}")]
    #[diagnostic(code(montage::tool))]
    Tool { tool: String, message: String },

    #[error("Build error: {message}")]
    #[diagnostic(code(montage::build))]
    Build {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl MontageError {
    /// Wrap an IO error for `path`, promoting permission failures to
    /// `TargetNotWritable`.
    pub(crate) fn write_failed(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            MontageError::TargetNotWritable {
                path: path.to_path_buf(),
            }
        } else {
            MontageError::Io {
                path: path.to_path_buf(),
                message: format!("Failed to write: {}", err),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MontageError>;
