use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::display;
use crate::mqtt::{PublishError, device_id};
use crate::snapshot::{self, DeviceSnapshot, SourceKind};
use crate::state::DeviceStates;
use crate::zones::{self, Zone};

/// Zone name published while a device reports no location at all. Distinct
/// from `not_home`, which means a location exists but matches no zone.
const UNKNOWN_ZONE: &str = "unknown";

/// Seam between the poll loop and the MQTT transport, so the pipeline can be
/// exercised against an in-memory publisher.
pub trait DevicePublisher {
    async fn publish_device(
        &self,
        device: &DeviceSnapshot,
        kind: SourceKind,
        zone_name: &str,
    ) -> Result<(), PublishError>;
}

impl DevicePublisher for crate::mqtt::MqttClient {
    async fn publish_device(
        &self,
        device: &DeviceSnapshot,
        kind: SourceKind,
        zone_name: &str,
    ) -> Result<(), PublishError> {
        crate::mqtt::MqttClient::publish_device(self, device, kind, zone_name).await
    }
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub cache_dir: PathBuf,
    pub interval: Duration,
    pub force_sync: bool,
    pub privacy: bool,
}

pub struct Manager<P> {
    publisher: P,
    zones: Vec<Zone>,
    settings: ScanSettings,
    states: DeviceStates,
    // Device id -> first device name seen with it, to spot collisions.
    claimed_ids: HashMap<String, String>,
}

impl<P: DevicePublisher> Manager<P> {
    pub fn new(publisher: P, zones: Vec<Zone>, settings: ScanSettings) -> Self {
        Manager {
            publisher,
            zones,
            settings,
            states: DeviceStates::default(),
            claimed_ids: HashMap::new(),
        }
    }

    /// Scans the cache files on the configured interval, forever. One scan at
    /// a time; nothing inside a scan terminates the loop.
    pub async fn run_loop(mut self) {
        info!(
            "Watching {} with {} known locations",
            self.settings.cache_dir.display(),
            self.zones.len()
        );
        loop {
            self.scan().await;
            display::render(&self.states, self.zones.len(), self.settings.privacy);
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// One full scan cycle over both cache files. A source that fails to
    /// load is skipped for this cycle; the other is still processed.
    pub async fn scan(&mut self) {
        debug!("Syncing FindMy data");
        for kind in [SourceKind::Items, SourceKind::Devices] {
            let path = self.settings.cache_dir.join(kind.file_name());
            match snapshot::load(&path) {
                Ok(devices) => {
                    let published = self.process(kind, &devices).await;
                    debug!(
                        "Processed {} devices from {} ({} published)",
                        devices.len(),
                        path.display(),
                        published
                    );
                }
                Err(err) => warn!("Skipping source this cycle: {err:#}"),
            }
        }
    }

    /// Runs every device of one source through change detection, zone
    /// resolution and publishing. Returns how many devices were published.
    /// A publish failure drops that device for this cycle only.
    pub async fn process(&mut self, kind: SourceKind, devices: &[DeviceSnapshot]) -> usize {
        let mut published = 0;
        for device in devices {
            let timestamp = device.last_update();
            if !self
                .states
                .should_publish(&device.name, timestamp, self.settings.force_sync)
            {
                continue;
            }

            let zone_name = match device.location.as_ref() {
                Some(location) => {
                    zones::resolve(location.latitude, location.longitude, &self.zones).to_string()
                }
                None => UNKNOWN_ZONE.to_string(),
            };

            self.check_collision(&device.name);
            self.states.record(&device.name, timestamp, &zone_name);

            match self
                .publisher
                .publish_device(device, kind, &zone_name)
                .await
            {
                Ok(()) => published += 1,
                Err(err) => error!("Dropping update for {}: {err:#}", device.name),
            }
        }
        published
    }

    fn check_collision(&mut self, name: &str) {
        let id = device_id(name);
        match self.claimed_ids.get(&id) {
            Some(owner) if owner != name => {
                warn!(
                    "Device id collision: {:?} and {:?} both map to {:?}, their topics overlap",
                    owner, name, id
                );
            }
            Some(_) => {}
            None => {
                self.claimed_ids.insert(id, name.to_string());
            }
        }
    }
}
