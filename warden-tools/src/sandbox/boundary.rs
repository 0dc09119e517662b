use crate::error::ToolError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Confines side-effecting paths to one canonical root directory.
#[derive(Debug, Clone)]
pub struct SandboxBoundary {
    root: PathBuf,
}

impl SandboxBoundary {
    /// Creates the root if needed and pins its canonical form.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .map_err(|e| ToolError::ValidationError(format!("Invalid sandbox root: {}", e)))?;
        let root = fs::canonicalize(root)
            .map_err(|e| ToolError::ValidationError(format!("Invalid sandbox root: {}", e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `relative` under the root. Absolute paths, `..` segments and
    /// symlinks leading outside the root fail with `PathTraversal` before the
    /// target itself is touched.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> Result<PathBuf, ToolError> {
        let relative = relative.as_ref();
        let display = relative.to_string_lossy().to_string();

        let mut normal = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => normal.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(ToolError::PathTraversal(display));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ToolError::PathTraversal(format!(
                        "absolute path not allowed: {}",
                        display
                    )));
                }
            }
        }

        if normal.is_empty() {
            return Err(ToolError::ValidationError("Empty sandbox path".into()));
        }

        // Every existing prefix must canonicalize inside the root, so a
        // symlinked directory cannot redirect the final component.
        let mut current = self.root.clone();
        for part in normal {
            current.push(part);
            if fs::symlink_metadata(&current).is_ok() {
                let canonical = fs::canonicalize(&current)
                    .map_err(|_| ToolError::PathTraversal(format!("unresolvable: {}", display)))?;
                if !canonical.starts_with(&self.root) {
                    return Err(ToolError::PathTraversal(format!(
                        "escapes sandbox: {}",
                        display
                    )));
                }
            }
        }

        match fs::canonicalize(&current) {
            Ok(canonical) => Ok(canonical),
            Err(_) => Ok(current),
        }
    }
}
