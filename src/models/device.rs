use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Capabilities that mark a device as remotely controllable
const CAP_AUDIO_PLAYER: &str = "AUDIO_PLAYER";
const CAP_AMAZON_MUSIC: &str = "AMAZON_MUSIC";
const CAP_TUNE_IN: &str = "TUNE_IN";

/// Response shape of the devices-v2 endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

/// Response shape of the wake-word endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeWordsResponse {
    #[serde(default)]
    pub wake_words: Vec<WakeWordEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeWordEntry {
    pub device_serial_number: String,
    pub wake_word: String,
}

/// One Echo-family device as reported by the device list endpoint.
///
/// Only the fields the bridge itself needs are typed; everything else the
/// upstream sends is preserved in `extra` so pass-through responses stay
/// complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub account_name: String,
    pub serial_number: String,
    pub device_type: String,
    #[serde(default)]
    pub device_family: Option<String>,
    #[serde(default)]
    pub device_owner_customer_id: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub cluster_members: Vec<String>,
    #[serde(default)]
    pub parent_clusters: Vec<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub software_version: Option<String>,

    // Derived flags, recomputed on every directory refresh
    #[serde(default)]
    pub is_controllable: bool,
    #[serde(default)]
    pub has_music_player: bool,
    #[serde(default)]
    pub is_multiroom_device: bool,
    #[serde(default)]
    pub is_multiroom_member: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_word: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Device {
    fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c == cap)
    }

    /// Recompute the capability-derived flags
    pub fn refresh_flags(&mut self) {
        self.is_controllable = self.has_capability(CAP_AUDIO_PLAYER)
            || self.has_capability(CAP_AMAZON_MUSIC)
            || self.has_capability(CAP_TUNE_IN);
        self.has_music_player =
            self.has_capability(CAP_AUDIO_PLAYER) || self.has_capability(CAP_AMAZON_MUSIC);
        self.is_multiroom_device = !self.cluster_members.is_empty();
        self.is_multiroom_member = !self.parent_clusters.is_empty();
    }
}

/// In-memory index of the device list, rebuilt on every refresh.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: Vec<Device>,
}

impl DeviceDirectory {
    /// Rebuild the directory from a fresh device list and the (best-effort)
    /// wake-word map, recomputing the derived flags.
    pub fn rebuild(&mut self, mut devices: Vec<Device>, wake_words: &HashMap<String, String>) {
        for device in &mut devices {
            device.refresh_flags();
            device.wake_word = wake_words.get(&device.serial_number).cloned();
        }
        self.devices = devices;
    }

    /// Look a device up by exact serial first, then by trimmed account name.
    pub fn find(&self, serial_or_name: &str) -> Option<&Device> {
        if let Some(device) = self
            .devices
            .iter()
            .find(|d| d.serial_number == serial_or_name)
        {
            return Some(device);
        }
        let name = serial_or_name.trim();
        self.devices.iter().find(|d| d.account_name.trim() == name)
    }

    pub fn all(&self) -> &[Device] {
        &self.devices
    }

    /// Account name to device map, as served by `/names`
    pub fn names(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for device in &self.devices {
            if let Ok(value) = serde_json::to_value(device) {
                map.insert(device.account_name.clone(), value);
            }
        }
        map
    }
}
