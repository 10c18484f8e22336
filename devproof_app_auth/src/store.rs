//
// Copyright 2025 The Project Oak Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use devproof_crypto::Address;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::{
    engine::HashState,
    identity::{DeviceId, IdentityHash},
};

/// Serializable snapshot of an [`crate::AppAuth`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAuthState {
    pub owner: Address,
    /// In seconds.
    pub notice_period: u64,
    pub allow_any_device: bool,
    #[serde(default)]
    pub hashes: BTreeMap<IdentityHash, HashState>,
    #[serde(default)]
    pub devices: BTreeSet<DeviceId>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("state store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state store lock is poisoned")]
    Poisoned,
}

/// Durable home of the whitelist state. `save` either stores the whole
/// snapshot or leaves the previous one in place.
pub trait StateStore: Send + Sync {
    /// Returns `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<AppAuthState>, StoreError>;

    fn save(&self, state: &AppAuthState) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<AppAuthState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AppAuthState>, StoreError> {
        Ok(self.state.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn save(&self, state: &AppAuthState) -> Result<(), StoreError> {
        *self.state.lock().map_err(|_| StoreError::Poisoned)? = Some(state.clone());
        Ok(())
    }
}

/// Stores the snapshot as pretty-printed JSON.
///
/// Each save writes a fresh temporary file next to the target, syncs it,
/// renames it over the target and syncs the directory. Processes sharing a
/// state file serialize their load, apply and save steps with
/// [`FileStore::lock`].
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

/// Exclusive lock on a state file, released on drop.
#[derive(Debug)]
pub struct StateLock {
    _file: fs::File,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocks until this process holds the advisory lock on `<state>.lock`.
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        flock_exclusive(&file)?;
        Ok(StateLock { _file: file })
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Result<Option<AppAuthState>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, state: &AppAuthState) -> Result<(), StoreError> {
        let mut file = NamedTempFile::new_in(self.directory())?;
        serde_json::to_writer_pretty(&mut file, state)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        sync_directory(self.directory())?;
        Ok(())
    }
}

#[cfg(unix)]
fn flock_exclusive(file: &fs::File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        // SAFETY: `file` owns a valid descriptor for the duration of the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if result == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn flock_exclusive(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn sync_directory(directory: &Path) -> io::Result<()> {
    fs::File::open(directory)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> io::Result<()> {
    Ok(())
}
