//! Where the CLI keeps the token of the logged-in session.
//!
//! # Invariants
//! - The file holds exactly one UUID; anything else reads as logged out.
//! - On unix the file is created with mode `0600`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use uuid::Uuid;

pub trait SessionStore {
    fn load(&self) -> Result<Option<Uuid>>;
    fn save(&mut self, token: Uuid) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Token persisted across invocations in a small file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Uuid>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("cannot read session file `{}`", self.path.display())
                })
            }
        };
        Ok(Uuid::parse_str(raw.trim()).ok())
    }

    fn save(&mut self, token: Uuid) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create `{}`", parent.display()))?;
        }
        write_private(&self.path, token.to_string().as_bytes())
            .with_context(|| format!("cannot write session file `{}`", self.path.display()))
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("cannot remove session file `{}`", self.path.display())),
        }
    }
}

/// Token held for the lifetime of one process (`shell --ephemeral`).
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: Option<Uuid>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Uuid>> {
        Ok(self.token)
    }

    fn save(&mut self, token: Uuid) -> Result<()> {
        self.token = Some(token);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.token = None;
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &std::path::Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &std::path::Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}
