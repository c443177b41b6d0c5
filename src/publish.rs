//! Atomic publication of rendered output.
//!
//! Output is written to a randomly named temporary file next to the
//! destination (or in an explicit scratch directory), flushed to disk, then
//! renamed over the destination in one step. A failure before the rename
//! removes the temporary file and leaves the destination untouched.

use std::fs::Permissions;
use std::io::{self, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::{self, Gid, Uid};
use thiserror::Error;
use tracing::debug;

use crate::config::TemplateSpec;

/// Mode applied when a template does not specify `permissions`.
pub const DEFAULT_MODE: u32 = 0o644;

const TEMP_PREFIX: &str = ".confx";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PublishError {
    #[error("invalid value for permissions: '{0}'")]
    InvalidPermissions(String),

    #[error("could not create temporary file in '{dir}': {source}")]
    TempFile { dir: PathBuf, source: io::Error },

    #[error("could not write temporary file: {0}")]
    Write(#[source] io::Error),

    #[error("could not move output to '{dest}': {source}")]
    Persist { dest: PathBuf, source: io::Error },

    #[error("could not set uid/gid {uid}:{gid} on '{dest}': {source}")]
    Ownership {
        dest: PathBuf,
        uid: u32,
        gid: u32,
        source: nix::Error,
    },
}

/// Parses an octal permission string such as `"0640"`, `"640"`, or `"0o640"`.
pub fn parse_mode(value: &str) -> Result<u32, PublishError> {
    let invalid = || PublishError::InvalidPermissions(value.to_string());

    let digits = value.trim();
    let digits = digits.strip_prefix("0o").unwrap_or(digits);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        _ => Err(invalid()),
    }
}

/// File mode and ownership for a published file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub mode: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mode: DEFAULT_MODE,
            uid: None,
            gid: None,
        }
    }
}

impl Policy {
    /// Builds the policy declared by a template section.
    pub fn from_template(template: &TemplateSpec) -> Result<Self, PublishError> {
        let mode = match &template.permissions {
            Some(permissions) => parse_mode(permissions)?,
            None => DEFAULT_MODE,
        };

        Ok(Self {
            mode,
            uid: template.owner_uid,
            gid: template.owner_gid,
        })
    }

    /// Owner to apply, if any was requested.
    ///
    /// A missing half is filled in from the invoking process.
    fn ownership(&self) -> Option<(Uid, Gid)> {
        if self.uid.is_none() && self.gid.is_none() {
            return None;
        }

        let uid = self.uid.map(Uid::from_raw).unwrap_or_else(unistd::getuid);
        let gid = self.gid.map(Gid::from_raw).unwrap_or_else(unistd::getgid);
        Some((uid, gid))
    }
}

/// Writes files atomically.
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    scratch_dir: Option<PathBuf>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates temporary files in `dir` instead of next to the destination.
    ///
    /// `dir` must be on the same filesystem as every destination, or the
    /// final rename fails.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    fn scratch_dir_for(&self, dest: &Path) -> PathBuf {
        if let Some(dir) = &self.scratch_dir {
            return dir.clone();
        }

        match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Publishes the output of `render` at `dest`.
    ///
    /// `render` writes the full contents into the sink it is given. Errors
    /// from `render` are returned unchanged and leave `dest` as it was.
    pub fn publish<F, E>(&self, dest: &Path, policy: &Policy, render: F) -> Result<(), E>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), E>,
        E: From<PublishError>,
    {
        let dir = self.scratch_dir_for(dest);
        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&dir)
            .map_err(|source| PublishError::TempFile {
                dir: dir.clone(),
                source,
            })?;

        // Set explicitly so the umask does not apply.
        temp.as_file()
            .set_permissions(Permissions::from_mode(policy.mode))
            .map_err(PublishError::Write)?;

        debug!(temp = %temp.path().display(), dest = %dest.display(), "rendering to temporary file");

        {
            let mut writer = BufWriter::new(temp.as_file());
            render(&mut writer)?;
            writer.flush().map_err(PublishError::Write)?;
        }
        temp.as_file().sync_all().map_err(PublishError::Write)?;

        temp.persist(dest).map_err(|e| PublishError::Persist {
            dest: dest.to_path_buf(),
            source: e.error,
        })?;

        if let Some((uid, gid)) = policy.ownership() {
            unistd::chown(dest, Some(uid), Some(gid)).map_err(|source| {
                PublishError::Ownership {
                    dest: dest.to_path_buf(),
                    uid: uid.as_raw(),
                    gid: gid.as_raw(),
                    source,
                }
            })?;
        }

        Ok(())
    }
}
