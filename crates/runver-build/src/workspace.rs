use std::path::{Path, PathBuf};

use crate::DeploymentFiles;

/// Staging directory the artifacts are written to before being copied to
/// the project root.
pub const WORKSPACE_DIR: &str = "workspace";

/// Directories the Next.js standalone build and the Dockerfile expect.
const REQUIRED_DIRS: &[&str] = &["public", ".next/standalone", ".next/static", WORKSPACE_DIR];

/// Creates the directories a deployment needs under `project_dir`.
pub fn prepare_workspace(project_dir: &Path) -> Result<(), WorkspaceError> {
    for dir in REQUIRED_DIRS {
        let path = project_dir.join(dir);
        std::fs::create_dir_all(&path).map_err(|e| WorkspaceError::Create { path, source: e })?;
    }
    Ok(())
}

/// Writes every artifact into `workspace/`, then copies it to the project
/// root where Cloud Build picks it up. Shell scripts are made executable.
///
/// Returns the paths of the copies in the project root.
pub fn write_deployment_files(
    project_dir: &Path,
    files: &DeploymentFiles,
) -> Result<Vec<PathBuf>, WorkspaceError> {
    let workspace = project_dir.join(WORKSPACE_DIR);
    std::fs::create_dir_all(&workspace).map_err(|e| WorkspaceError::Create {
        path: workspace.clone(),
        source: e,
    })?;

    let mut written = Vec::new();
    for (name, content) in files.entries() {
        let staged = workspace.join(name.file_name());
        std::fs::write(&staged, content).map_err(|e| WorkspaceError::Write {
            path: staged.clone(),
            source: e,
        })?;

        let dst = project_dir.join(name.file_name());
        std::fs::copy(&staged, &dst).map_err(|e| WorkspaceError::CopyFile {
            path: dst.clone(),
            source: e,
        })?;

        if name.file_name().ends_with(".sh") {
            make_executable(&dst)?;
        }

        tracing::debug!(path = %dst.display(), "wrote deployment file");
        written.push(dst);
    }

    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), WorkspaceError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
        WorkspaceError::Permissions {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), WorkspaceError> {
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to create directory {path}")]
    Create {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file to {path}")]
    CopyFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to set permissions on {path}")]
    Permissions {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
