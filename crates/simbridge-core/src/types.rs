use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

// ---------------------------------------------------------------------------
// Gear
// ---------------------------------------------------------------------------

/// Gearbox selector for vehicle-dynamics models.
///
/// `Undefined` is the gear's unset value: an update carrying it leaves the
/// current gear unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gear {
    Forward,
    Neutral,
    Reverse,
    #[default]
    Undefined,
}

impl Gear {
    /// Numeric code used in flat input vectors.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Neutral => 0,
            Self::Reverse => -1,
            Self::Undefined => 2,
        }
    }

    /// Parse a flat-vector value. NaN maps to [`Gear::Undefined`]; any other
    /// value must be a whole gear code.
    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    pub fn from_value(value: f64) -> Result<Self, InputError> {
        if value.is_nan() {
            return Ok(Self::Undefined);
        }
        let code = value as i64;
        if value.fract() != 0.0 {
            return Err(InputError::InvalidGear(code));
        }
        match code {
            1 => Ok(Self::Forward),
            0 => Ok(Self::Neutral),
            -1 => Ok(Self::Reverse),
            2 => Ok(Self::Undefined),
            other => Err(InputError::InvalidGear(other)),
        }
    }

    /// Flat-vector value. [`Gear::Undefined`] is written as NaN.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub const fn to_value(self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            other => other.code() as f64,
        }
    }

    #[must_use]
    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Forward => "Forward",
            Self::Neutral => "Neutral",
            Self::Reverse => "Reverse",
            Self::Undefined => "Undefined",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SensorType
// ---------------------------------------------------------------------------

/// Every sensor kind the engine knows about.
///
/// Only a subset is supported by `simbridge-sensor`; see
/// [`SensorType::is_supported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorType {
    Air,
    Alms,
    Brs,
    Camera,
    IrBeacon,
    IrObu,
    RfBeacon,
    RfObu,
    DepthCamera,
    Iss,
    Lida,
    Lms,
    Ocs,
    Pcs,
    PhysicsBasedCameraUnreal,
    Radar,
    Tis,
    TrafficSignal,
    Ultrasonic,
    WorldViewer,
}

impl SensorType {
    pub const ALL: [Self; 20] = [
        Self::Air,
        Self::Alms,
        Self::Brs,
        Self::Camera,
        Self::IrBeacon,
        Self::IrObu,
        Self::RfBeacon,
        Self::RfObu,
        Self::DepthCamera,
        Self::Iss,
        Self::Lida,
        Self::Lms,
        Self::Ocs,
        Self::Pcs,
        Self::PhysicsBasedCameraUnreal,
        Self::Radar,
        Self::Tis,
        Self::TrafficSignal,
        Self::Ultrasonic,
        Self::WorldViewer,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "AIR",
            Self::Alms => "ALMS",
            Self::Brs => "BRS",
            Self::Camera => "CAMERA",
            Self::IrBeacon => "IR_BEACON",
            Self::IrObu => "IR_OBU",
            Self::RfBeacon => "RF_BEACON",
            Self::RfObu => "RF_OBU",
            Self::DepthCamera => "DEPTH_CAMERA",
            Self::Iss => "ISS",
            Self::Lida => "LIDA",
            Self::Lms => "LMS",
            Self::Ocs => "OCS",
            Self::Pcs => "PCS",
            Self::PhysicsBasedCameraUnreal => "PHYSICS_BASED_CAMERA_UNREAL",
            Self::Radar => "RADAR",
            Self::Tis => "TIS",
            Self::TrafficSignal => "TRAFFIC_SIGNAL",
            Self::Ultrasonic => "ULTRASONIC",
            Self::WorldViewer => "WORLD_VIEWER",
        }
    }

    /// Kinds with a known setup layout and output decoder.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Air | Self::Brs | Self::Lms | Self::Camera)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Object flags
// ---------------------------------------------------------------------------

/// How an object appears to other objects' sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SensorDetectability {
    #[default]
    Detectable,
    Occluding,
    Invisible,
}

impl SensorDetectability {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Detectable => 0,
            Self::Occluding => 1,
            Self::Invisible => 2,
        }
    }

    /// Unknown codes (including NaN) fall back to `Detectable`.
    #[allow(clippy::float_cmp)]
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        if value == 1.0 {
            Self::Occluding
        } else if value == 2.0 {
            Self::Invisible
        } else {
            Self::Detectable
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherType {
    #[default]
    Sunny,
    Rainy,
    Snowy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyType {
    #[default]
    Day,
    Dawn,
    Dusk,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkyLightPollution {
    #[default]
    None,
    DarkSite,
    Rural,
    RuralSuburban,
    Suburban,
    BrightSuburban,
    SuburbanUrban,
    City,
    InnerCity,
}

/// Verbosity of the engine's own logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Critical,
    Error,
    #[default]
    Warning,
    Notice,
    Info,
    Debug,
    Crawl,
}

// ---------------------------------------------------------------------------
// Road settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoadSideType {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LaneType {
    #[default]
    Driving,
    Biking,
    SideWalk,
}

/// Parameter domain of a parametric cubic section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParameterRange {
    #[default]
    ArcLength,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrafficSide {
    LeftHand,
    #[default]
    RightHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AsphaltType {
    #[default]
    Standard,
    SingleColor,
    ColoredTexture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AsphaltTone {
    Darker,
    Dark,
    #[default]
    Standard,
    Light,
    Lighter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_codes() {
        assert_eq!(Gear::Forward.code(), 1);
        assert_eq!(Gear::Neutral.code(), 0);
        assert_eq!(Gear::Reverse.code(), -1);
        assert_eq!(Gear::Undefined.code(), 2);
    }

    #[test]
    fn gear_from_value() {
        assert_eq!(Gear::from_value(1.0), Ok(Gear::Forward));
        assert_eq!(Gear::from_value(-1.0), Ok(Gear::Reverse));
        assert_eq!(Gear::from_value(f64::NAN), Ok(Gear::Undefined));
        assert_eq!(Gear::from_value(2.0), Ok(Gear::Undefined));
        assert_eq!(Gear::from_value(7.0), Err(InputError::InvalidGear(7)));
    }

    #[test]
    fn gear_rejects_fractional_codes() {
        assert_eq!(Gear::from_value(0.6), Err(InputError::InvalidGear(0)));
        assert_eq!(Gear::from_value(-0.5), Err(InputError::InvalidGear(0)));
        assert!(Gear::from_value(f64::INFINITY).is_err());
        assert_eq!(Gear::from_value(-1.0), Ok(Gear::Reverse));
    }

    #[test]
    fn undefined_gear_is_unset_in_flat_form() {
        assert!(Gear::Undefined.to_value().is_nan());
        assert!((Gear::Reverse.to_value() + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sensor_type_names_are_unique() {
        let mut names: Vec<_> = SensorType::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SensorType::ALL.len());
    }

    #[test]
    fn supported_sensor_types() {
        let supported: Vec<_> = SensorType::ALL
            .into_iter()
            .filter(|s| s.is_supported())
            .collect();
        assert_eq!(
            supported,
            vec![SensorType::Air, SensorType::Brs, SensorType::Camera, SensorType::Lms]
        );
    }

    #[test]
    fn detectability_unknown_falls_back() {
        assert_eq!(SensorDetectability::from_value(1.0), SensorDetectability::Occluding);
        assert_eq!(SensorDetectability::from_value(2.0), SensorDetectability::Invisible);
        assert_eq!(SensorDetectability::from_value(9.0), SensorDetectability::Detectable);
        assert_eq!(
            SensorDetectability::from_value(f64::NAN),
            SensorDetectability::Detectable
        );
    }
}
