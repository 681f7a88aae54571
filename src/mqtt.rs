use std::time::Duration;

use deunicode::deunicode;
use log::{debug, error, info};
use rumqttc::{MqttOptions, QoS};
use thiserror::Error;

use crate::config;
use crate::messages::{
    BatteryFields, DeviceAttributes, DeviceIdentity, DiscoveryConfig, PROVIDER, Reported,
    format_timestamp,
};
use crate::snapshot::{DeviceSnapshot, SourceKind};

#[derive(Debug, Clone)]
pub struct MqttClient {
    client: rumqttc::AsyncClient,
    discovery_prefix: String,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode payload for {topic}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to publish to {topic}")]
    Send {
        topic: String,
        #[source]
        source: rumqttc::ClientError,
    },
}

impl MqttClient {
    pub fn new(config: &config::MqttConfig) -> (Self, rumqttc::EventLoop) {
        let publisher_id = config
            .publisher_id
            .as_ref()
            .unwrap_or(&"findmy-mqtt".to_string())
            .to_string();

        let mut mqttoptions = MqttOptions::new(
            publisher_id,
            config.host.clone(),
            config.port.unwrap_or(1883),
        );

        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));

        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            mqttoptions.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = rumqttc::AsyncClient::new(mqttoptions, 10);

        (
            MqttClient {
                client,
                discovery_prefix: config
                    .discovery_prefix
                    .clone()
                    .unwrap_or("homeassistant".to_string()),
            },
            eventloop,
        )
    }

    /// Drives the rumqttc event loop so outbound publishes are flushed and
    /// the connection is kept alive. Never returns; connection errors are
    /// logged and the next poll reconnects.
    pub async fn drive(eventloop: &mut rumqttc::EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                }
                Ok(notification) => {
                    debug!("MQTT event: {:?}", notification);
                }
                Err(e) => {
                    error!("Error polling MQTT event loop: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Publishes the discovery config, attribute object and state string for
    /// one device. `zone_name` is the resolved zone, `"not_home"`, or
    /// `"unknown"` when the device currently reports no location.
    pub async fn publish_device(
        &self,
        device: &DeviceSnapshot,
        kind: SourceKind,
        zone_name: &str,
    ) -> Result<(), PublishError> {
        let id = device_id(&device.name);
        let topic = format!("{}/device_tracker/{}", self.discovery_prefix, id);

        let position_type = device
            .location
            .as_ref()
            .and_then(|location| location.position_type.as_deref());
        let discovery = DiscoveryConfig {
            unique_id: id.clone(),
            state_topic: format!("{topic}/state"),
            json_attributes_topic: format!("{topic}/attributes"),
            device: DeviceIdentity {
                identifiers: id,
                manufacturer: "Apple",
                name: device.name.clone(),
            },
            source_type: source_type(position_type),
            payload_home: "home",
            payload_not_home: "not_home",
        };

        let battery_status = Reported::from(device.battery_status.clone());
        let battery = match kind {
            SourceKind::Items => BatteryFields::Item { battery_status },
            SourceKind::Devices => BatteryFields::Device {
                battery_status,
                battery_level: Reported::from(device.battery_level),
            },
        };
        let last_update = device.last_update();
        let attributes = DeviceAttributes {
            latitude: Reported::from(device.location.as_ref().map(|l| l.latitude)),
            longitude: Reported::from(device.location.as_ref().map(|l| l.longitude)),
            gps_accuracy: Reported::from(
                device
                    .location
                    .as_ref()
                    .map(|l| l.horizontal_accuracy.hypot(l.vertical_accuracy)),
            ),
            address: Reported::from(device.location.as_ref().and(device.address.clone())),
            battery,
            last_update_timestamp: Reported::from(last_update),
            last_update: format_timestamp(last_update),
            provider: PROVIDER,
        };

        debug!("Publishing {} as {:?} to {}", device.name, zone_name, topic);
        self.publish_json(&format!("{topic}/config"), &discovery).await?;
        self.publish_json(&format!("{topic}/attributes"), &attributes)
            .await?;
        self.publish_raw(&format!("{topic}/state"), zone_name.to_string())
            .await
    }

    async fn publish_json<T: serde::Serialize>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<(), PublishError> {
        let encoded = serde_json::to_string(payload).map_err(|source| PublishError::Encode {
            topic: topic.to_string(),
            source,
        })?;
        self.publish_raw(topic, encoded).await
    }

    async fn publish_raw(&self, topic: &str, payload: String) -> Result<(), PublishError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|source| PublishError::Send {
                topic: topic.to_string(),
                source,
            })
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        debug!("Disconnecting MQTT client");
        self.client.disconnect().await
    }
}

/// Derives the unique id and topic segment from a device name: lowercase,
/// whitespace and hyphens become underscores, everything else is
/// transliterated to ASCII and any leftover punctuation dropped. Distinct
/// names can collide ("Tom's iPhone" and "toms iphone" both yield
/// `toms_iphone`); the poll loop warns when that happens.
pub fn device_id(name: &str) -> String {
    let underscored: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .collect();
    deunicode(&underscored)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Maps the cache's position type onto Home Assistant's source types. BLE
/// fixes are crowdsourced, so everything except Wi-Fi counts as GPS.
fn source_type(position_type: Option<&str>) -> &'static str {
    match position_type {
        Some("Wifi") => "router",
        Some("crowdsourced") | Some("safeLocation") => "gps",
        _ => "gps",
    }
}
