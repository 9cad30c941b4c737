//! Photolock - Key-Material Files
//!
//! Small binary files under an app-private directory: the wrapped device
//! salt, plus one wrapped data-encryption-key file per distinct PIN hash.
//! DEK files are named by a hash of the PIN's hash so the primary and duress
//! PINs get independent, non-colliding files. Writes are atomic (temp then
//! rename) so a crash cannot leave a half-wrapped key file; deletes overwrite
//! with zeros first.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::LockResult;

/// Filename for the wrapped device salt (hardware ephemeral mode).
const DEVICE_SALT_FILE: &str = "device.salt";

/// Key-material directory handler.
pub struct KeyFileStore {
    root: PathBuf,
}

impl KeyFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// DEK filename for one PIN hash: `hex(sha256(hash))[..16].dek`.
    pub fn dek_file_name(pin_hash: &[u8]) -> String {
        let digest = Sha256::digest(pin_hash);
        format!("{}.dek", &hex::encode(digest)[..16])
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write a file atomically: temp file, fsync, rename.
    pub fn write(&self, name: &str, data: &[u8]) -> LockResult<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.full_path(name);
        let temp_path = path.with_extension("tmp");

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;

        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    pub fn read(&self, name: &str) -> LockResult<Vec<u8>> {
        let mut file = File::open(self.full_path(name))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.full_path(name).exists()
    }

    /// Delete a file, overwriting its contents with zeros first.
    pub fn delete(&self, name: &str) -> LockResult<()> {
        let path = self.full_path(name);
        if !path.exists() {
            return Ok(());
        }

        if let Ok(metadata) = fs::metadata(&path) {
            let size = metadata.len() as usize;
            if size > 0 {
                if let Ok(mut file) = OpenOptions::new().write(true).open(&path) {
                    let zeros = vec![0u8; size.min(64 * 1024)];
                    let mut remaining = size;
                    while remaining > 0 {
                        let to_write = remaining.min(zeros.len());
                        let _ = file.write_all(&zeros[..to_write]);
                        remaining -= to_write;
                    }
                    let _ = file.sync_all();
                }
            }
        }

        fs::remove_file(&path)?;
        Ok(())
    }

    pub fn rename(&self, from: &str, to: &str) -> LockResult<()> {
        fs::rename(self.full_path(from), self.full_path(to))?;
        Ok(())
    }

    /// Delete every DEK file. Used by the full security reset.
    pub fn delete_all_deks(&self) -> LockResult<usize> {
        let mut count = 0;
        if self.root.exists() {
            let names: Vec<String> = fs::read_dir(&self.root)?
                .flatten()
                .filter_map(|e| e.file_name().to_str().map(String::from))
                .filter(|n| n.ends_with(".dek"))
                .collect();
            for name in names {
                self.delete(&name)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Delete everything, device salt included.
    pub fn wipe(&self) -> LockResult<()> {
        self.delete_all_deks()?;
        self.delete(DEVICE_SALT_FILE)?;
        Ok(())
    }

    pub fn device_salt_file(&self) -> &'static str {
        DEVICE_SALT_FILE
    }
}
