//! Credential stores.
//!
//! Connections never read the process environment directly; they receive a
//! `CredentialStore` and read their token on each request, so a credential
//! written by `configure` is picked up without rebuilding the connection.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::error::{ConnectionError, Result};

/// Read/write access to persisted credentials.
pub trait CredentialStore: Send + Sync {
    /// Current value for `key`, if any. Empty values count as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Persist several values together. On error none of them is left in
    /// place: keys already written are restored to their previous value
    /// (absent keys are reset to empty, which reads as absent).
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut written: Vec<(&str, Option<String>)> = Vec::new();
        for &(key, value) in entries {
            let previous = self.get(key);
            if let Err(e) = self.set(key, value) {
                for (key, previous) in written.iter().rev() {
                    if let Err(restore) = self.set(key, previous.as_deref().unwrap_or_default()) {
                        log::error!("Could not restore {}: {}", key, restore);
                    }
                }
                return Err(e);
            }
            written.push((key, previous));
        }
        Ok(())
    }
}

/// In-memory store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values.write().insert(key.to_string(), value.to_string());
        self
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut values = self.values.write();
        for &(key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Store backed by a `.env` file.
///
/// Reads parse the file with `dotenvy`; keys missing from the file fall back
/// to the process environment unless disabled. Writes create the file when
/// needed and replace or append the `KEY='value'` line.
#[derive(Debug)]
pub struct EnvFileCredentialStore {
    path: PathBuf,
    process_env_fallback: bool,
    write_lock: Mutex<()>,
}

impl EnvFileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            process_env_fallback: true,
            write_lock: Mutex::new(()),
        }
    }

    /// Only consult the file, never the process environment.
    pub fn file_only(mut self) -> Self {
        self.process_env_fallback = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self, key: &str) -> Option<String> {
        let iter = match dotenvy::from_path_iter(&self.path) {
            Ok(iter) => iter,
            Err(e) => {
                log::debug!("Could not read {}: {}", self.path.display(), e);
                return None;
            }
        };

        // Later assignments win, as when sourcing the file.
        let mut found = None;
        for item in iter {
            match item {
                Ok((k, v)) if k == key => found = Some(v),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping malformed line in {}: {}", self.path.display(), e),
            }
        }
        found
    }
}

impl CredentialStore for EnvFileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        let value = self.read_file(key).or_else(|| {
            if self.process_env_fallback {
                std::env::var(key).ok()
            } else {
                None
            }
        });
        value.filter(|v| !v.is_empty())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    /// Rewrites the file once with every entry applied.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let existing = if self.path.exists() {
            fs::read_to_string(&self.path)?
        } else {
            String::new()
        };

        let mut lines: Vec<String> = existing.lines().map(String::from).collect();
        for &(key, value) in entries {
            let line = format!("{}={}", key, quote(value));
            match lines.iter_mut().find(|l| assigns(l.as_str(), key)) {
                Some(slot) => *slot = line,
                None => lines.push(line),
            }
        }

        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&self.path, content).map_err(|e| {
            ConnectionError::Credential(format!("writing {}: {}", self.path.display(), e))
        })?;

        for &(key, _) in entries {
            log::info!("Stored {} in {}", key, self.path.display());
        }
        Ok(())
    }
}

/// Whether an env-file line assigns `key`.
fn assigns(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    trimmed
        .strip_prefix(key)
        .map_or(false, |rest| rest.trim_start().starts_with('='))
}

fn quote(value: &str) -> String {
    if value.contains('\'') {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{}\"", escaped)
    } else {
        format!("'{}'", value)
    }
}
