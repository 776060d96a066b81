//! Static line id -> sensor name mapping.

use crate::error::{AlarmError, Result};
use std::collections::BTreeMap;

/// Immutable mapping of GPIO line ids to sensor names.
///
/// Built once from configuration and shared by the monitor and the simulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorRegistry {
    sensors: BTreeMap<u32, String>,
}

impl SensorRegistry {
    /// Build from the config file's `name = line_id` table.
    ///
    /// Fails if two names claim the same line.
    pub fn from_names(names: &BTreeMap<String, u32>) -> Result<Self> {
        let mut sensors: BTreeMap<u32, String> = BTreeMap::new();
        for (name, &line_id) in names {
            if let Some(first) = sensors.get(&line_id) {
                return Err(AlarmError::DuplicateLine {
                    line_id,
                    first: first.clone(),
                    second: name.clone(),
                });
            }
            sensors.insert(line_id, name.clone());
        }
        Ok(Self { sensors })
    }

    pub fn name_of(&self, line_id: u32) -> Result<&str> {
        self.sensors
            .get(&line_id)
            .map(String::as_str)
            .ok_or(AlarmError::UnknownSensor(line_id))
    }

    /// Configured line ids in ascending order.
    pub fn line_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.sensors.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.sensors.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

impl FromIterator<(u32, String)> for SensorRegistry {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self {
            sensors: iter.into_iter().collect(),
        }
    }
}
