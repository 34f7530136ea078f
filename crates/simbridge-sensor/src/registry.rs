//! Owning store for sensors, addressed by [`SensorId`].

use std::fmt;

use simbridge_core::error::ResourceError;

use crate::sensor::Sensor;

/// Stable index of a sensor inside a [`SensorRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(pub usize);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    sensors: Vec<Sensor>,
}

impl SensorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sensor: Sensor) -> SensorId {
        self.sensors.push(sensor);
        SensorId(self.sensors.len() - 1)
    }

    pub fn get(&self, id: SensorId) -> Result<&Sensor, ResourceError> {
        self.sensors.get(id.0).ok_or(ResourceError::SensorNotFound(id.0))
    }

    pub fn get_mut(&mut self, id: SensorId) -> Result<&mut Sensor, ResourceError> {
        self.sensors
            .get_mut(id.0)
            .ok_or(ResourceError::SensorNotFound(id.0))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, &Sensor)> {
        self.sensors
            .iter()
            .enumerate()
            .map(|(i, sensor)| (SensorId(i), sensor))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use simbridge_core::types::SensorType;

    use super::*;

    #[test]
    fn insert_and_get() {
        let mut registry = SensorRegistry::new();
        let id = registry.insert(Sensor::new(SensorType::Lms, Vec::new(), false).unwrap());
        assert_eq!(id, SensorId(0));
        assert_eq!(registry.get(id).unwrap().kind(), SensorType::Lms);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_id() {
        let mut registry = SensorRegistry::new();
        assert!(matches!(
            registry.get_mut(SensorId(1)),
            Err(ResourceError::SensorNotFound(1))
        ));
    }
}
