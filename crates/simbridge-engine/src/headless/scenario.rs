//! Scenario persistence and road-network import for the headless engine.
//!
//! Saved scenarios are TOML. Sensors, trajectories and dynamics are not
//! persisted; they are recreated by the models that own them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use simbridge_core::data::{CenterOfGravityOffset, Pose};
use simbridge_core::error::EngineError;
use simbridge_core::types::{SkyLightPollution, SkyType};

use crate::io::{ObjectFlags, SchedulerSettings, WeatherSettings};
use crate::road::{RoadDescription, RoadSection};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedObject {
    pub name: String,
    pub type_name: String,
    pub pose: Pose,
    pub cog_offset: CenterOfGravityOffset,
    pub flags: ObjectFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedScenario {
    #[serde(default)]
    pub objects: Vec<SavedObject>,
    #[serde(default)]
    pub roads: Vec<RoadDescription>,
    #[serde(default)]
    pub weather: WeatherSettings,
    #[serde(default)]
    pub sky: SkyType,
    #[serde(default)]
    pub light_pollution: SkyLightPollution,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

impl SavedScenario {
    pub fn write(&self, path: &Path) -> Result<(), EngineError> {
        let text = toml::to_string(self).map_err(|e| EngineError::Malformed(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| EngineError::Malformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// OpenDRIVE
// ---------------------------------------------------------------------------

/// Read the `<road>` elements of an OpenDRIVE file. Each road becomes a
/// single straight section of the declared length; lane geometry is left
/// to the engine defaults.
pub fn read_open_drive(path: &Path) -> Result<Vec<RoadDescription>, EngineError> {
    let text = std::fs::read_to_string(path)?;
    parse_open_drive(&text)
}

pub fn parse_open_drive(text: &str) -> Result<Vec<RoadDescription>, EngineError> {
    if !text.contains("<OpenDRIVE") {
        return Err(EngineError::Malformed("missing <OpenDRIVE> root element".into()));
    }
    let mut roads = Vec::new();
    for element in text.split("<road").skip(1) {
        // `<roadMark`, `<roadType` etc. share the prefix.
        if !element.starts_with(char::is_whitespace) {
            continue;
        }
        let header = element.split('>').next().unwrap_or_default();
        let length = attribute(header, "length")
            .ok_or_else(|| EngineError::Malformed("road without a length attribute".into()))?
            .parse::<f64>()
            .map_err(|e| EngineError::Malformed(format!("invalid road length: {e}")))?;
        roads.push(RoadDescription {
            sections: vec![RoadSection::Straight { length }],
            ..RoadDescription::default()
        });
    }
    if roads.is_empty() {
        return Err(EngineError::Malformed("network contains no roads".into()));
    }
    Ok(roads)
}

fn attribute<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let key = format!(" {name}=\"");
    let start = header.find(&key)? + key.len();
    let end = header[start..].find('"')? + start;
    Some(&header[start..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETWORK: &str = r#"<?xml version="1.0"?>
<OpenDRIVE>
  <header revMajor="1" revMinor="4"/>
  <road name="a" length="120.5" id="1" junction="-1">
    <type s="0" type="town"/>
    <lanes><laneSection s="0"><center><lane id="0"><roadMark type="solid"/></lane></center></laneSection></lanes>
  </road>
  <road name="b" length="40" id="2" junction="-1"></road>
</OpenDRIVE>"#;

    #[test]
    fn parses_road_lengths() {
        let roads = parse_open_drive(NETWORK).unwrap();
        assert_eq!(roads.len(), 2);
        assert!((roads[0].length() - 120.5).abs() < 1e-12);
        assert!((roads[1].length() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_open_drive() {
        assert!(matches!(
            parse_open_drive("<xml/>"),
            Err(EngineError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_empty_network() {
        assert!(parse_open_drive("<OpenDRIVE></OpenDRIVE>").is_err());
    }

    #[test]
    fn rejects_bad_length() {
        let text = "<OpenDRIVE><road length=\"abc\"></road></OpenDRIVE>";
        assert!(parse_open_drive(text).is_err());
    }

    #[test]
    fn scenario_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.pb");
        let scenario = SavedScenario {
            objects: vec![SavedObject {
                name: "Box_1".into(),
                type_name: "Box".into(),
                pose: Pose::new(1.0, 2.0, 0.0, 0.0, 0.0, 0.5),
                cog_offset: CenterOfGravityOffset::new(0.0, 0.0, 0.0),
                flags: ObjectFlags::default(),
            }],
            sky: SkyType::Night,
            ..SavedScenario::default()
        };
        scenario.write(&path).unwrap();
        assert_eq!(SavedScenario::read(&path).unwrap(), scenario);
    }

    #[test]
    fn read_garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pb");
        std::fs::write(&path, "objects = 3").unwrap();
        assert!(matches!(
            SavedScenario::read(&path),
            Err(EngineError::Malformed(_))
        ));
    }
}
