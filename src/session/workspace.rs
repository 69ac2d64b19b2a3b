/// Ephemeral per-request workspaces.
///
/// One workspace is exclusively owned by one session for the duration of a
/// call. Removal is guaranteed on every exit path: `cleanup()` is invoked
/// explicitly by the session and `Drop` is the backstop.
use crate::config::types::{Result, SandboxError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct Workspace {
    run_id: String,
    run_dir: PathBuf,
}

impl Workspace {
    /// Create a fresh uuid-named workspace under `base_dir`.
    pub fn create(base_dir: &Path) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let run_dir = base_dir.join(&run_id);

        fs::create_dir_all(&run_dir).map_err(|e| {
            SandboxError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create workspace {}: {}", run_dir.display(), e),
            ))
        })?;

        log::debug!("workspace {} created at {}", run_id, run_dir.display());
        Ok(Self { run_id, run_dir })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.run_dir
    }

    /// Write a file inside the workspace. Filenames are restricted to plain
    /// names: anything with a path separator or parent reference is rejected
    /// before touching the filesystem.
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        validate_filename(name)?;
        let path = self.run_dir.join(name);
        fs::write(&path, content).map_err(|e| {
            SandboxError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to write {}: {}", path.display(), e),
            ))
        })?;
        Ok(path)
    }

    /// Remove the workspace tree. Idempotent; failures are logged, not
    /// raised, since this runs on every path out of a session.
    pub fn cleanup(&self) {
        if self.run_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&self.run_dir) {
                log::warn!(
                    "failed to remove workspace {}: {}",
                    self.run_dir.display(),
                    e
                );
            } else {
                log::debug!("workspace {} removed", self.run_id);
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn validate_filename(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name.contains("..");
    if bad {
        return Err(SandboxError::Config(format!(
            "invalid auxiliary filename '{}'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_base() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("runbox-ws-test-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn create_write_cleanup() {
        let base = test_base();
        let ws = Workspace::create(&base).unwrap();
        assert!(ws.dir().exists());

        let path = ws.write_file("prog.py", "print('hi')\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "print('hi')\n");

        ws.cleanup();
        assert!(!path.exists());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let base = test_base();
        let ws = Workspace::create(&base).unwrap();
        ws.cleanup();
        ws.cleanup();
        assert!(!ws.dir().exists());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn drop_removes_workspace() {
        let base = test_base();
        let dir = {
            let ws = Workspace::create(&base).unwrap();
            ws.dir().to_path_buf()
        };
        assert!(!dir.exists());
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_traversal_filenames() {
        let base = test_base();
        let ws = Workspace::create(&base).unwrap();
        for name in ["../evil", "a/b", "..", ""] {
            let err = ws.write_file(name, "x").unwrap_err();
            assert!(matches!(err, SandboxError::Config(_)), "name: {:?}", name);
        }
        let _ = fs::remove_dir_all(&base);
    }
}
