use std::collections::HashMap;

/// What was last published for a device. `last_update` is `None` while the
/// device reports no location (published as "unknown").
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub last_update: Option<i64>,
    pub zone: String,
}

/// Per-device publish bookkeeping, keyed by device name. Entries are created
/// on first sight and kept for the process lifetime; device counts are small
/// (a household), so nothing is ever evicted.
#[derive(Debug, Default)]
pub struct DeviceStates {
    states: HashMap<String, DeviceState>,
}

impl DeviceStates {
    /// Whether a device is due for republication. Always true under
    /// `force_sync`; otherwise true on first sight or when the timestamp
    /// changed, including transitions into and out of "no location".
    pub fn should_publish(&self, name: &str, timestamp: Option<i64>, force_sync: bool) -> bool {
        if force_sync {
            return true;
        }
        match self.states.get(name) {
            None => true,
            Some(state) => state.last_update != timestamp,
        }
    }

    pub fn record(&mut self, name: &str, timestamp: Option<i64>, zone: &str) {
        self.states.insert(
            name.to_string(),
            DeviceState {
                last_update: timestamp,
                zone: zone.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeviceState)> {
        self.states.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_device_is_published() {
        let states = DeviceStates::default();
        assert!(states.should_publish("phone", Some(1000), false));
        assert!(states.should_publish("phone", None, false));
    }

    #[test]
    fn unchanged_timestamp_is_suppressed() {
        let mut states = DeviceStates::default();
        states.record("phone", Some(1000), "home");
        assert!(!states.should_publish("phone", Some(1000), false));
        assert!(states.should_publish("phone", Some(1001), false));
    }

    #[test]
    fn force_sync_always_publishes() {
        let mut states = DeviceStates::default();
        states.record("phone", Some(1000), "home");
        assert!(states.should_publish("phone", Some(1000), true));
    }

    #[test]
    fn missing_location_differs_from_any_timestamp() {
        let mut states = DeviceStates::default();
        states.record("phone", Some(1000), "home");
        // Location disappears: republish once...
        assert!(states.should_publish("phone", None, false));
        states.record("phone", None, "unknown");
        // ...then stays quiet while it remains gone...
        assert!(!states.should_publish("phone", None, false));
        // ...and republishes when it comes back.
        assert!(states.should_publish("phone", Some(1000), false));
    }

    #[test]
    fn record_overwrites_unconditionally() {
        let mut states = DeviceStates::default();
        states.record("phone", Some(1000), "home");
        states.record("phone", Some(2000), "work");
        let (_, state) = states.iter().next().unwrap();
        assert_eq!(state.last_update, Some(2000));
        assert_eq!(state.zone, "work");
        assert_eq!(states.len(), 1);
    }
}
