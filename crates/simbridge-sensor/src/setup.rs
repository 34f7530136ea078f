//! Flat setup layouts and their typed counterparts.
//!
//! Every setup vector starts with the mounting pose
//! `[x, y, z, roll, pitch, yaw]` relative to the host object, followed by the
//! kind-specific parameters:
//!
//! | kind   | arity | parameters after the pose                                              |
//! |--------|-------|------------------------------------------------------------------------|
//! | AIR    | 10    | detection type, fov, max detectable objects, range                     |
//! | BRS    | 12    | fov horizontal, fov vertical, frequency, max objects, res. x, res. y   |
//! | LMS    | 11    | fov horizontal, max lines, max points per line, point spacing, range   |
//! | CAMERA | 10    | resolution x, resolution y, frame rate, fov horizontal                 |
//!
//! Unset values leave the engine default in place.

use std::fmt;

use simbridge_core::data::{Pose, Sentinel, UNSET};
use simbridge_core::error::InputError;
use simbridge_core::flat::{FlatVector, check_arity};
use simbridge_core::types::SensorType;
use simbridge_engine::io::SensorParameter;

/// Values taken by the mounting pose at the start of every setup.
pub const POSE_VALUES: usize = 6;

type ParameterFn = fn(f64) -> SensorParameter;

#[allow(clippy::cast_possible_truncation)]
fn int(value: f64) -> i32 {
    value as i32
}

fn detection_type(value: f64) -> SensorParameter {
    SensorParameter::DetectionType(int(value))
}

fn frequency(value: f64) -> SensorParameter {
    SensorParameter::Frequency(int(value))
}

fn frame_rate(value: f64) -> SensorParameter {
    SensorParameter::FrameRate(int(value))
}

fn max_detectable_objects(value: f64) -> SensorParameter {
    SensorParameter::MaxDetectableObjects(int(value))
}

fn max_lines(value: f64) -> SensorParameter {
    SensorParameter::MaxLines(int(value))
}

fn max_points_per_line(value: f64) -> SensorParameter {
    SensorParameter::MaxPointsPerLine(int(value))
}

fn resolution_x(value: f64) -> SensorParameter {
    SensorParameter::ResolutionX(int(value))
}

fn resolution_y(value: f64) -> SensorParameter {
    SensorParameter::ResolutionY(int(value))
}

const AIR: &[ParameterFn] = &[
    detection_type,
    SensorParameter::Fov,
    max_detectable_objects,
    SensorParameter::Range,
];

const BRS: &[ParameterFn] = &[
    SensorParameter::FovHorizontal,
    SensorParameter::FovVertical,
    frequency,
    max_detectable_objects,
    resolution_x,
    resolution_y,
];

const LMS: &[ParameterFn] = &[
    SensorParameter::FovHorizontal,
    max_lines,
    max_points_per_line,
    SensorParameter::PointSpacing,
    SensorParameter::Range,
];

const CAMERA: &[ParameterFn] = &[
    resolution_x,
    resolution_y,
    frame_rate,
    SensorParameter::FovHorizontal,
];

/// Parameter constructors following the pose, in setup order.
pub(crate) fn parameters(kind: SensorType) -> Result<&'static [ParameterFn], InputError> {
    match kind {
        SensorType::Air => Ok(AIR),
        SensorType::Brs => Ok(BRS),
        SensorType::Lms => Ok(LMS),
        SensorType::Camera => Ok(CAMERA),
        other => Err(InputError::UnsupportedSensor(other)),
    }
}

/// Full setup length for `kind`.
pub fn setup_arity(kind: SensorType) -> Result<usize, InputError> {
    Ok(POSE_VALUES + parameters(kind)?.len())
}

/// Accepts an empty setup or one of exactly [`setup_arity`] values.
pub fn validate_setup(kind: SensorType, setup: &[f64]) -> Result<(), InputError> {
    let expected = setup_arity(kind)?;
    if setup.is_empty() || setup.len() == expected {
        Ok(())
    } else {
        Err(InputError::SensorSetupMismatch {
            sensor: kind,
            expected,
            got: setup.len(),
        })
    }
}

/// Split a validated, non-empty setup into the pose patch and the set
/// parameters.
pub(crate) fn decode(kind: SensorType, setup: &[f64]) -> Result<(Pose, Vec<SensorParameter>), InputError> {
    let makers = parameters(kind)?;
    let pose = Pose::from_flat(&setup[..POSE_VALUES])?;
    let params = setup[POSE_VALUES..]
        .iter()
        .zip(makers)
        .filter(|(value, _)| !value.is_nan())
        .map(|(value, make)| make(*value))
        .collect();
    Ok((pose, params))
}

// ---------------------------------------------------------------------------
// Typed setups
// ---------------------------------------------------------------------------

/// Typed setup that flattens to the layout of one sensor kind.
pub trait SensorSetup: FlatVector {
    const KIND: SensorType;
}

macro_rules! sensor_setup {
    ($(#[$meta:meta])* $name:ident, $kind:expr, { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            /// Mounting pose relative to the host object.
            pub pose: Pose,
            $(pub $field: f64,)+
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    pose: Pose::unset(),
                    $($field: UNSET,)+
                }
            }
        }

        impl $name {
            #[must_use]
            pub const fn with_pose(mut self, pose: Pose) -> Self {
                self.pose = pose;
                self
            }
        }

        impl SensorSetup for $name {
            const KIND: SensorType = $kind;
        }

        impl FlatVector for $name {
            const ARITY: usize = POSE_VALUES + [$(stringify!($field)),+].len();
            const NAME: &'static str = stringify!($name);

            fn from_flat(values: &[f64]) -> Result<Self, InputError> {
                check_arity(Self::NAME, Self::ARITY, values)?;
                let mut rest = values[POSE_VALUES..].iter().copied();
                Ok(Self {
                    pose: Pose::from_flat(&values[..POSE_VALUES])?,
                    $($field: rest.next().unwrap_or(UNSET),)+
                })
            }

            fn write_flat(&self, out: &mut Vec<f64>) {
                self.pose.write_flat(out);
                $(out.push(self.$field);)+
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), ": (pose: {}"), self.pose)?;
                $(write!(f, concat!(", ", stringify!($field), ": {}"), self.$field)?;)+
                f.write_str(")")
            }
        }
    };
}

sensor_setup! {
    /// Antenna-and-receiver sensor.
    AirSetup, SensorType::Air, { detection_type, fov, max_detectable_objects, range }
}

sensor_setup! {
    /// Bounding-rectangle sensor.
    BrsSetup, SensorType::Brs, {
        fov_horizontal,
        fov_vertical,
        frequency,
        max_detectable_objects,
        resolution_x,
        resolution_y,
    }
}

sensor_setup! {
    /// Lane-marker sensor.
    LmsSetup, SensorType::Lms, { fov_horizontal, max_lines, max_points_per_line, point_spacing, range }
}

sensor_setup! {
    CameraSetup, SensorType::Camera, { resolution_x, resolution_y, frame_rate, fov_horizontal }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arities() {
        assert_eq!(setup_arity(SensorType::Air), Ok(10));
        assert_eq!(setup_arity(SensorType::Brs), Ok(12));
        assert_eq!(setup_arity(SensorType::Lms), Ok(11));
        assert_eq!(setup_arity(SensorType::Camera), Ok(10));
        assert_eq!(
            setup_arity(SensorType::Radar),
            Err(InputError::UnsupportedSensor(SensorType::Radar))
        );
    }

    #[test]
    fn typed_setups_match_flat_arity() {
        assert_eq!(AirSetup::ARITY, 10);
        assert_eq!(BrsSetup::ARITY, 12);
        assert_eq!(LmsSetup::ARITY, 11);
        assert_eq!(CameraSetup::ARITY, 10);
    }

    #[test]
    fn empty_setup_is_accepted() {
        assert!(validate_setup(SensorType::Lms, &[]).is_ok());
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(
            validate_setup(SensorType::Air, &[0.0; 7]),
            Err(InputError::SensorSetupMismatch {
                sensor: SensorType::Air,
                expected: 10,
                got: 7
            })
        );
    }

    #[test]
    fn decode_skips_unset_parameters() {
        let setup = AirSetup {
            range: 80.0,
            max_detectable_objects: 4.0,
            ..AirSetup::default()
        };
        let (pose, params) = decode(SensorType::Air, &setup.to_flat()).unwrap();
        assert!(pose.is_unset());
        assert_eq!(
            params,
            vec![
                SensorParameter::MaxDetectableObjects(4),
                SensorParameter::Range(80.0)
            ]
        );
    }

    #[test]
    fn brs_layout_order() {
        let values: Vec<f64> = (0..12).map(f64::from).collect();
        let setup = BrsSetup::from_flat(&values).unwrap();
        assert_eq!(setup.pose, Pose::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0));
        assert!((setup.frequency - 8.0).abs() < f64::EPSILON);
        assert!((setup.resolution_y - 11.0).abs() < f64::EPSILON);
        let (_, params) = decode(SensorType::Brs, &values).unwrap();
        assert_eq!(params[2], SensorParameter::Frequency(8));
        assert_eq!(params[5], SensorParameter::ResolutionY(11));
    }

    #[test]
    fn display_lists_fields() {
        let text = CameraSetup::default().to_string();
        assert!(text.starts_with("CameraSetup: (pose: Pose"));
        assert!(text.ends_with("fov_horizontal: NaN)"));
    }
}
