//! Plain value aggregates with a per-field "unset" sentinel.
//!
//! Every numeric field may hold [`UNSET`] (a quiet NaN). Update operations
//! ([`Sentinel::merge`]) skip unset fields, so the same struct serves both as
//! a full command and as a sparse patch. Absolute setters expect every field to
//! be set; see [`Sentinel::is_fully_set`].
//!
//! Three construction modes exist for each aggregate:
//!
//! | mode       | constructor            | typical use            |
//! |------------|------------------------|------------------------|
//! | explicit   | `Position::new(x,y,z)` | full command           |
//! | zero-init  | [`Sentinel::zeroed`]   | initial absolute setup |
//! | NaN-init   | [`Sentinel::unset`]    | delta / patch          |
//!
//! `Default` is NaN-init.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::flat::{FlatVector, check_arity};

/// The reserved "leave unchanged" value.
pub const UNSET: f64 = f64::NAN;

/// Overwrite `dst` with `patch` unless `patch` is unset.
#[inline]
pub fn merge_field(dst: &mut f64, patch: f64) {
    if !patch.is_nan() {
        *dst = patch;
    }
}

/// Write `value` into `dst` only when it is set. Returns whether a write happened.
#[inline]
pub fn write_if_set(dst: &mut f64, value: f64) -> bool {
    if value.is_nan() {
        return false;
    }
    *dst = value;
    true
}

// ---------------------------------------------------------------------------
// Sentinel
// ---------------------------------------------------------------------------

/// Aggregates that follow the unset-sentinel convention.
pub trait Sentinel: Sized {
    /// Every field unset.
    fn unset() -> Self;

    /// Every field set to zero (or the type's neutral value).
    fn zeroed() -> Self;

    /// Copy every set field of `patch` into `self`; unset fields are skipped.
    fn merge(&mut self, patch: &Self);

    /// `true` if no field is set.
    fn is_unset(&self) -> bool;

    /// `true` if every field is set.
    fn is_fully_set(&self) -> bool;

    /// Builder form of [`merge`](Self::merge).
    #[must_use]
    fn merged(mut self, patch: &Self) -> Self {
        self.merge(patch);
        self
    }
}

// ---------------------------------------------------------------------------
// Three-field aggregates
// ---------------------------------------------------------------------------

macro_rules! triple {
    ($(#[$meta:meta])* $name:ident { $a:ident, $b:ident, $c:ident }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub $a: f64,
            pub $b: f64,
            pub $c: f64,
        }

        impl $name {
            /// Explicit construction; every field set.
            #[must_use]
            pub const fn new($a: f64, $b: f64, $c: f64) -> Self {
                Self { $a, $b, $c }
            }

            /// Fields as an array in declaration order.
            #[must_use]
            pub const fn to_array(&self) -> [f64; 3] {
                [self.$a, self.$b, self.$c]
            }

            /// Build from an array in declaration order.
            #[must_use]
            pub const fn from_array(values: [f64; 3]) -> Self {
                Self::new(values[0], values[1], values[2])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                <Self as Sentinel>::unset()
            }
        }

        impl Sentinel for $name {
            fn unset() -> Self {
                Self::new(UNSET, UNSET, UNSET)
            }

            fn zeroed() -> Self {
                Self::new(0.0, 0.0, 0.0)
            }

            fn merge(&mut self, patch: &Self) {
                merge_field(&mut self.$a, patch.$a);
                merge_field(&mut self.$b, patch.$b);
                merge_field(&mut self.$c, patch.$c);
            }

            fn is_unset(&self) -> bool {
                self.$a.is_nan() && self.$b.is_nan() && self.$c.is_nan()
            }

            fn is_fully_set(&self) -> bool {
                !self.$a.is_nan() && !self.$b.is_nan() && !self.$c.is_nan()
            }
        }

        impl FlatVector for $name {
            const ARITY: usize = 3;
            const NAME: &'static str = stringify!($name);

            fn from_flat(values: &[f64]) -> Result<Self, InputError> {
                check_arity(Self::NAME, Self::ARITY, values)?;
                Ok(Self::new(values[0], values[1], values[2]))
            }

            fn write_flat(&self, out: &mut Vec<f64>) {
                out.extend_from_slice(&self.to_array());
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(
                        stringify!($name),
                        ": (",
                        stringify!($a),
                        ": {}, ",
                        stringify!($b),
                        ": {}, ",
                        stringify!($c),
                        ": {})"
                    ),
                    self.$a, self.$b, self.$c
                )
            }
        }
    };
}

triple! {
    /// World position in metres.
    Position { x, y, z }
}

triple! {
    /// Orientation in radians.
    Orientation { roll, pitch, yaw }
}

triple! {
    /// Linear velocity in m/s.
    Velocity { x, y, z }
}

triple! {
    /// Linear acceleration in m/s^2.
    Acceleration { x, y, z }
}

triple! {
    /// Angular velocity in rad/s.
    AngularVelocity { roll, pitch, yaw }
}

triple! {
    /// Offset of the centre of gravity from the object origin, in metres.
    CenterOfGravityOffset { x, y, z }
}

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

impl Pose {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            position: Position::new(x, y, z),
            orientation: Orientation::new(roll, pitch, yaw),
        }
    }
}

impl Sentinel for Pose {
    fn unset() -> Self {
        Self {
            position: Position::unset(),
            orientation: Orientation::unset(),
        }
    }

    fn zeroed() -> Self {
        Self {
            position: Position::zeroed(),
            orientation: Orientation::zeroed(),
        }
    }

    fn merge(&mut self, patch: &Self) {
        self.position.merge(&patch.position);
        self.orientation.merge(&patch.orientation);
    }

    fn is_unset(&self) -> bool {
        self.position.is_unset() && self.orientation.is_unset()
    }

    fn is_fully_set(&self) -> bool {
        self.position.is_fully_set() && self.orientation.is_fully_set()
    }
}

impl FlatVector for Pose {
    const ARITY: usize = 6;
    const NAME: &'static str = "Pose";

    fn from_flat(values: &[f64]) -> Result<Self, InputError> {
        check_arity(Self::NAME, Self::ARITY, values)?;
        Ok(Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        ))
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        self.position.write_flat(out);
        self.orientation.write_flat(out);
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pose: (position: {}, orientation: {})",
            self.position, self.orientation
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_sets_every_field_to_zero() {
        assert_eq!(Position::zeroed().to_array(), [0.0; 3]);
        assert_eq!(Orientation::zeroed().to_array(), [0.0; 3]);
        assert_eq!(Velocity::zeroed().to_array(), [0.0; 3]);
        assert_eq!(Acceleration::zeroed().to_array(), [0.0; 3]);
        assert_eq!(AngularVelocity::zeroed().to_array(), [0.0; 3]);
        assert_eq!(CenterOfGravityOffset::zeroed().to_array(), [0.0; 3]);
        assert!(Pose::zeroed().is_fully_set());
    }

    #[test]
    fn unset_leaves_every_field_nan() {
        assert!(Position::unset().to_array().iter().all(|v| v.is_nan()));
        assert!(Orientation::unset().to_array().iter().all(|v| v.is_nan()));
        assert!(Velocity::unset().to_array().iter().all(|v| v.is_nan()));
        assert!(Acceleration::unset().to_array().iter().all(|v| v.is_nan()));
        assert!(AngularVelocity::unset().to_array().iter().all(|v| v.is_nan()));
        assert!(CenterOfGravityOffset::unset().is_unset());
        assert!(Pose::unset().is_unset());
    }

    #[test]
    fn default_is_unset() {
        assert!(Position::default().is_unset());
        assert!(Pose::default().is_unset());
    }

    #[test]
    fn merge_skips_unset_fields() {
        let mut p = Position::new(1.0, 2.0, 3.0);
        p.merge(&Position::new(UNSET, 5.0, UNSET));
        assert_eq!(p, Position::new(1.0, 5.0, 3.0));
    }

    #[test]
    fn merge_with_all_unset_is_noop() {
        let before = Orientation::new(0.1, 0.2, 0.3);
        let after = before.merged(&Orientation::unset());
        assert_eq!(before, after);
    }

    #[test]
    fn merge_with_all_set_replaces() {
        let patch = Velocity::new(4.0, 5.0, 6.0);
        let after = Velocity::new(1.0, 2.0, 3.0).merged(&patch);
        assert_eq!(after, patch);
    }

    #[test]
    fn pose_merge_reaches_both_parts() {
        let mut pose = Pose::zeroed();
        let mut patch = Pose::unset();
        patch.position.z = 2.0;
        patch.orientation.yaw = 1.5;
        pose.merge(&patch);
        assert_eq!(pose, Pose::new(0.0, 0.0, 2.0, 0.0, 0.0, 1.5));
    }

    #[test]
    fn partially_set_is_neither_unset_nor_full() {
        let p = Position::new(1.0, UNSET, UNSET);
        assert!(!p.is_unset());
        assert!(!p.is_fully_set());
    }

    #[test]
    fn display_formats() {
        assert_eq!(
            Position::new(1.0, 2.0, 3.5).to_string(),
            "Position: (x: 1, y: 2, z: 3.5)"
        );
        assert_eq!(
            AngularVelocity::new(0.0, 0.0, 1.0).to_string(),
            "AngularVelocity: (roll: 0, pitch: 0, yaw: 1)"
        );
        assert!(Pose::zeroed().to_string().starts_with("Pose: (position: Position"));
    }

    #[test]
    fn flat_round_trip_preserves_order() {
        let pose = Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(pose.to_flat(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(Position::from_flat(&[1.0, 2.0]).is_err());
    }
}
