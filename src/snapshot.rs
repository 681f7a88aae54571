use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use serde_derive::Deserialize;
use thiserror::Error;

/// Which of the two FindMy cache files a snapshot came from. Items are
/// AirTags and other accessories; Devices are phones, laptops and so on.
/// Devices additionally report a battery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Items,
    Devices,
}

impl SourceKind {
    pub fn file_name(self) -> &'static str {
        match self {
            SourceKind::Items => "Items.data",
            SourceKind::Devices => "Devices.data",
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub name: String,
    #[serde(default)]
    pub battery_status: Option<String>,
    /// Only present in Devices.data.
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub location: Option<Location>,
    /// Reverse-geocoded address; sibling of `location` in the cache format.
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    #[serde(default)]
    pub position_type: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub time_stamp: i64,
}

impl DeviceSnapshot {
    /// Timestamp of the last location fix, if the device currently has one.
    pub fn last_update(&self) -> Option<i64> {
        self.location.as_ref().map(|location| location.time_stamp)
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not read snapshot file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot file {path} is not a JSON array of devices")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Default location of the FindMy cache on macOS.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("Library/Caches/com.apple.findmy.fmipcore"))
}

/// Reads and parses one cache file into device snapshots. A missing,
/// unreadable or malformed file fails the whole source; the caller decides
/// whether that is fatal (it is not, for the poll loop).
pub fn load(path: &Path) -> Result<Vec<DeviceSnapshot>, SnapshotError> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|source| SnapshotError::Read {
            path: path.to_owned(),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse {
        path: path.to_owned(),
        source,
    })
}
