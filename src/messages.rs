use chrono::{Local, TimeZone as _};
use serde::{Serialize, Serializer};

/// Provider tag sent with every attributes message.
pub const PROVIDER: &str = "FindMy (findmy-mqtt)";

/// A value that is published verbatim when known and as the literal string
/// `"unknown"` when not. The FindMy cache leaves location fields out rather
/// than nulling them, but subscribers expect every attribute key present.
#[derive(Debug, Clone, PartialEq)]
pub enum Reported<T> {
    Known(T),
    Unknown,
}

impl<T> From<Option<T>> for Reported<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Reported::Known(value),
            None => Reported::Unknown,
        }
    }
}

impl<T: Serialize> Serialize for Reported<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reported::Known(value) => value.serialize(serializer),
            Reported::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Home Assistant discovery descriptor, published to the `config` topic.
#[derive(Debug, Serialize)]
pub struct DiscoveryConfig {
    pub unique_id: String,
    pub state_topic: String,
    pub json_attributes_topic: String,
    pub device: DeviceIdentity,
    pub source_type: &'static str,
    pub payload_home: &'static str,
    pub payload_not_home: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DeviceIdentity {
    pub identifiers: String,
    pub manufacturer: &'static str,
    pub name: String,
}

/// Battery attributes differ between the two cache files: items only carry a
/// status, devices add a level. The key spelling for the items status is the
/// cache's own camelCase, kept as-is for subscribers of the original feed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatteryFields {
    Item {
        #[serde(rename = "batteryStatus")]
        battery_status: Reported<String>,
    },
    Device {
        battery_status: Reported<String>,
        battery_level: Reported<f64>,
    },
}

#[derive(Debug, Serialize)]
pub struct DeviceAttributes {
    pub latitude: Reported<f64>,
    pub longitude: Reported<f64>,
    pub gps_accuracy: Reported<f64>,
    pub address: Reported<String>,
    #[serde(flatten)]
    pub battery: BatteryFields,
    pub last_update_timestamp: Reported<i64>,
    pub last_update: String,
    pub provider: &'static str,
}

/// Renders a millisecond epoch timestamp as local wall-clock time, or
/// "unknown" when there is none.
pub fn format_timestamp(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|millis| Local.timestamp_millis_opt(millis).single())
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_serializes_value_or_unknown() {
        assert_eq!(
            serde_json::to_string(&Reported::Known(12.345)).unwrap(),
            "12.345"
        );
        assert_eq!(
            serde_json::to_string(&Reported::<f64>::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn item_attributes_use_camel_case_battery_key() {
        let attributes = DeviceAttributes {
            latitude: Reported::Known(1.0),
            longitude: Reported::Known(2.0),
            gps_accuracy: Reported::Known(5.0),
            address: Reported::Known("Somewhere 5".to_string()),
            battery: BatteryFields::Item {
                battery_status: Reported::Known("Full".to_string()),
            },
            last_update_timestamp: Reported::Known(1_700_000_000_000),
            last_update: "2023-11-14 23:13:20".to_string(),
            provider: PROVIDER,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&attributes).unwrap()).unwrap();
        assert_eq!(json["batteryStatus"], "Full");
        assert!(json.get("battery_status").is_none());
        assert!(json.get("battery_level").is_none());
        assert_eq!(json["latitude"], 1.0);
        assert_eq!(json["provider"], PROVIDER);
    }

    #[test]
    fn device_attributes_include_battery_level() {
        let attributes = DeviceAttributes {
            latitude: Reported::Unknown,
            longitude: Reported::Unknown,
            gps_accuracy: Reported::Unknown,
            address: Reported::Unknown,
            battery: BatteryFields::Device {
                battery_status: Reported::Known("Charging".to_string()),
                battery_level: Reported::Known(0.82),
            },
            last_update_timestamp: Reported::Unknown,
            last_update: "unknown".to_string(),
            provider: PROVIDER,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&attributes).unwrap()).unwrap();
        assert_eq!(json["battery_status"], "Charging");
        assert_eq!(json["battery_level"], 0.82);
        // Every location field is the literal string, never omitted.
        assert_eq!(json["latitude"], "unknown");
        assert_eq!(json["gps_accuracy"], "unknown");
        assert_eq!(json["last_update_timestamp"], "unknown");
    }

    #[test]
    fn discovery_config_shape() {
        let config = DiscoveryConfig {
            unique_id: "alice_phone".to_string(),
            state_topic: "homeassistant/device_tracker/alice_phone/state".to_string(),
            json_attributes_topic: "homeassistant/device_tracker/alice_phone/attributes"
                .to_string(),
            device: DeviceIdentity {
                identifiers: "alice_phone".to_string(),
                manufacturer: "Apple",
                name: "Alice Phone".to_string(),
            },
            source_type: "gps",
            payload_home: "home",
            payload_not_home: "not_home",
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(json["unique_id"], "alice_phone");
        assert_eq!(json["device"]["manufacturer"], "Apple");
        assert_eq!(json["device"]["name"], "Alice Phone");
        assert_eq!(json["payload_not_home"], "not_home");
    }

    #[test]
    fn format_timestamp_handles_unknown() {
        assert_eq!(format_timestamp(None), "unknown");
        // A concrete timestamp renders as a date, whatever the local zone.
        let rendered = format_timestamp(Some(1_700_000_000_000));
        assert!(rendered.starts_with("2023-11-1"), "got {rendered}");
    }
}
