use std::fs::File;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use serde_derive::Deserialize;
use thiserror::Error;

/// Payload sent for a coordinate outside every configured zone.
pub const NOT_HOME: &str = "not_home";

pub const DEFAULT_TOLERANCE_METERS: u32 = 70;

/// Rough conversion between meters and degrees of latitude/longitude.
/// Only acceptable over the short distances a zone tolerance spans.
const METERS_PER_DEGREE: f64 = 111_111.0;

#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub tolerance_meters: u32,
}

#[derive(Deserialize, Debug, Clone)]
struct ZoneEntry {
    latitude: f64,
    longitude: f64,
    tolerance: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("could not read zone file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse zone file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("zone file {path} is not a JSON object keyed by zone name")]
    NotAnObject { path: PathBuf },
    #[error("zone {name:?} is invalid: {source}")]
    Entry {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the known-locations file: a JSON object keyed by zone name, each
/// value carrying `latitude`, `longitude` and an optional `tolerance` in
/// meters. Zones keep the order they appear in the file, which is the order
/// `resolve` checks them in.
pub fn load_zones(path: &Path) -> Result<Vec<Zone>, ZoneError> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut contents))
        .map_err(|source| ZoneError::Read {
            path: path.to_owned(),
            source,
        })?;

    let raw: serde_json::Value =
        serde_json::from_str(&contents).map_err(|source| ZoneError::Parse {
            path: path.to_owned(),
            source,
        })?;
    let serde_json::Value::Object(entries) = raw else {
        return Err(ZoneError::NotAnObject {
            path: path.to_owned(),
        });
    };

    let mut zones = Vec::with_capacity(entries.len());
    for (name, value) in entries {
        let entry: ZoneEntry =
            serde_json::from_value(value).map_err(|source| ZoneError::Entry {
                name: name.clone(),
                source,
            })?;
        zones.push(Zone {
            name,
            latitude: entry.latitude,
            longitude: entry.longitude,
            tolerance_meters: entry.tolerance.unwrap_or(DEFAULT_TOLERANCE_METERS),
        });
    }
    Ok(zones)
}

/// Returns the name of the first zone (in configured order) whose latitude
/// and longitude are each within the zone's tolerance of the coordinate, or
/// [`NOT_HOME`] if none matches. The check is per-axis, so a zone is really a
/// square around its center; kept for compatibility with upstream.
pub fn resolve<'a>(latitude: f64, longitude: f64, zones: &'a [Zone]) -> &'a str {
    for zone in zones {
        let tolerance = f64::from(zone.tolerance_meters) / METERS_PER_DEGREE;
        if (zone.latitude - latitude).abs() <= tolerance
            && (zone.longitude - longitude).abs() <= tolerance
        {
            return &zone.name;
        }
    }
    NOT_HOME
}
