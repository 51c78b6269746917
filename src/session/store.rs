use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

/// Session cookie file name in the state directory
const COOKIE_FILE: &str = "alexa-cookie.txt";

/// Device-management token file name in the state directory
const MAC_DMS_FILE: &str = "macDms.txt";

/// Persists the two opaque credential blobs as whole-file JSON.
///
/// Reads never fail: a missing file is silently `None`, any other I/O or
/// parse error is logged and also yields `None`. The state is re-derivable
/// through the login helper, so there is no atomic-write ceremony here.
pub struct SessionStore {
    state_dir: PathBuf,
}

impl SessionStore {
    pub fn new(state_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;
        Ok(Self { state_dir })
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.state_dir.join(name)
    }

    fn read(&self, name: &str) -> Option<Value> {
        let path = self.file_path(name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(file = name, error = %e, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(file = name, error = %e, "Failed to parse session file");
                None
            }
        }
    }

    fn write(&self, name: &str, value: &Value) -> Result<()> {
        let path = self.file_path(name);
        let contents = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session file {}", name))?;
        Ok(())
    }

    pub fn load_cookie(&self) -> Option<Value> {
        self.read(COOKIE_FILE)
    }

    pub fn load_mac_dms(&self) -> Option<Value> {
        self.read(MAC_DMS_FILE)
    }

    pub fn save_cookie(&self, cookie: &Value) -> Result<()> {
        self.write(COOKIE_FILE, cookie)
    }

    pub fn save_mac_dms(&self, mac_dms: &Value) -> Result<()> {
        self.write(MAC_DMS_FILE, mac_dms)
    }

    pub fn has_cookie(&self) -> bool {
        self.file_path(COOKIE_FILE).exists()
    }

    /// Remove both session files. Missing files are not an error.
    pub fn clear(&self) -> Result<()> {
        for name in [COOKIE_FILE, MAC_DMS_FILE] {
            let path = self.file_path(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to remove session file {}", name))
                }
            }
        }
        Ok(())
    }
}
