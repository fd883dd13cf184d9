//! File-based key/value store for persistent runs.

use crate::error::{StorageError, StorageResult};
use crate::store::KvStore;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

const VALUE_EXT: &str = "val";
const TEMP_EXT: &str = "tmp";

/// A directory-backed key/value store.
///
/// Every key is one file inside the store directory. Data survives process
/// restarts, which is what lets a migration resume in a later request.
///
/// # Durability
///
/// `set` writes the value to a temporary file, syncs it, then renames it
/// over the previous value. A crash mid-write leaves either the old value
/// or the new one, never a torn value.
///
/// # Key encoding
///
/// ASCII letters, digits, `.`, `_` and `-` are kept as-is; every other
/// byte is written as `%XX`.
///
/// # Example
///
/// ```no_run
/// use shopmove_storage::{FileStore, KvStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("state")).unwrap();
/// store.set("importer.current_task", b"\x05").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Opens or creates a store in the given directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{VALUE_EXT}", encode_key(key))))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.value_path(key)?;
        let _guard = self.lock.read();

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(Some(buffer))
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.value_path(key)?;
        let temp = path.with_extension(TEMP_EXT);
        let _guard = self.lock.write();

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;
        let _guard = self.lock.write();

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let _guard = self.lock.read();
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_key)
            {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}
