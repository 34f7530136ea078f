//! Point-mass kinematics for the headless engine.
//!
//! Nothing here is a dynamics model. It only produces plausible, monotone
//! motion so that the lifecycle can be driven end to end.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use simbridge_core::data::{
    Acceleration, AngularVelocity, Orientation, Pose, Position, Velocity,
};
use simbridge_core::types::Gear;

use crate::io::{StateActuatorInput, VehicleControlInput};
use crate::road::RoadDescription;

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn to_vector(position: &Position) -> Vector3<f64> {
    Vector3::new(position.x, position.y, position.z)
}

pub fn to_position(v: &Vector3<f64>) -> Position {
    Position::new(v.x, v.y, v.z)
}

pub fn rotation(orientation: &Orientation) -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(orientation.roll, orientation.pitch, orientation.yaw)
}

pub fn isometry(pose: &Pose) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(to_vector(&pose.position)),
        rotation(&pose.orientation),
    )
}

/// World pose of a sensor mounted at `offset` on an object at `object`.
pub fn mounted(object: &Pose, offset: &Pose) -> Isometry3<f64> {
    isometry(object) * isometry(offset)
}

// ---------------------------------------------------------------------------
// Polyline paths
// ---------------------------------------------------------------------------

/// Piecewise-linear path through a list of points.
#[derive(Debug, Clone)]
pub struct Polyline {
    points: Vec<Vector3<f64>>,
    cumulative: Vec<f64>,
}

impl Polyline {
    pub fn new(points: &[Position]) -> Self {
        let points: Vec<_> = points.iter().map(to_vector).collect();
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += (p - points[i - 1]).norm();
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    pub fn points(&self) -> impl Iterator<Item = Position> + '_ {
        self.points.iter().map(to_position)
    }

    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Pose at arc length `distance`, clamped to the path ends. Heading
    /// follows the segment direction.
    pub fn pose_at(&self, distance: f64) -> Pose {
        match self.points.len() {
            0 => return Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            1 => {
                let p = self.points[0];
                return Pose::new(p.x, p.y, p.z, 0.0, 0.0, 0.0);
            }
            _ => {}
        }
        let distance = distance.clamp(0.0, self.length());
        let segment = self
            .cumulative
            .windows(2)
            .position(|w| distance <= w[1])
            .unwrap_or(self.points.len() - 2);
        let start = self.points[segment];
        let end = self.points[segment + 1];
        let span = self.cumulative[segment + 1] - self.cumulative[segment];
        let t = if span > 0.0 {
            (distance - self.cumulative[segment]) / span
        } else {
            0.0
        };
        let p = start + (end - start) * t;
        let d = end - start;
        let yaw = d.y.atan2(d.x);
        let pitch = -d.z.atan2(d.x.hypot(d.y));
        Pose::new(p.x, p.y, p.z, 0.0, pitch, yaw)
    }
}

// ---------------------------------------------------------------------------
// Vehicle
// ---------------------------------------------------------------------------

/// Fixed vehicle parameters used by every headless dynamics unit.
#[derive(Debug, Clone, Copy)]
pub struct VehicleParams {
    /// m/s^2 at full throttle.
    pub max_acceleration: f64,
    /// m/s^2 at full brake.
    pub max_deceleration: f64,
    /// Metres.
    pub wheelbase: f64,
    /// Steering wheel angle / road wheel angle.
    pub steering_ratio: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            max_acceleration: 3.0,
            max_deceleration: 8.0,
            wheelbase: 2.7,
            steering_ratio: 16.0,
        }
    }
}

/// Kinematic bicycle step. `speed` is signed longitudinal speed and is
/// updated in place.
#[allow(clippy::float_cmp)]
pub fn integrate_vehicle(
    params: &VehicleParams,
    pose: &Pose,
    speed: &mut f64,
    control: &VehicleControlInput,
    dt: f64,
) -> StateActuatorInput {
    let throttle = control.throttle.clamp(0.0, 1.0) * params.max_acceleration;
    let thrust = match control.gear {
        Gear::Forward => throttle,
        Gear::Reverse => -throttle,
        Gear::Neutral | Gear::Undefined => 0.0,
    };
    let braking = control.brake.clamp(0.0, 1.0) * params.max_deceleration * speed.signum();
    let accel = if *speed == 0.0 { thrust } else { thrust - braking };

    let previous = *speed;
    *speed += accel * dt;
    // Brakes stop the vehicle, they never reverse it.
    if thrust == 0.0 && previous != 0.0 && previous.signum() != speed.signum() {
        *speed = 0.0;
    }

    let wheel_angle = control.steering_wheel_angle / params.steering_ratio;
    let yaw_rate = *speed * wheel_angle.tan() / params.wheelbase;
    let yaw = pose.orientation.yaw + yaw_rate * dt;
    let heading = UnitQuaternion::from_euler_angles(0.0, 0.0, yaw);
    let forward = heading * Vector3::x();
    let position = to_vector(&pose.position) + forward * (*speed * dt);
    let velocity = forward * *speed;
    let acceleration = forward * accel;

    StateActuatorInput {
        position: to_position(&position),
        orientation: Orientation::new(pose.orientation.roll, pose.orientation.pitch, yaw),
        velocity: Velocity::new(velocity.x, velocity.y, velocity.z),
        acceleration: Acceleration::new(acceleration.x, acceleration.y, acceleration.z),
        angular_velocity: AngularVelocity::new(0.0, 0.0, yaw_rate),
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Range, azimuth and elevation of `target` seen from `sensor`.
pub fn spherical(sensor: &Isometry3<f64>, target: &Vector3<f64>) -> (f64, f64, f64) {
    let local = sensor.inverse_transform_point(&(*target).into());
    let range = local.coords.norm();
    let azimuth = local.y.atan2(local.x);
    let elevation = local.z.atan2(local.x.hypot(local.y));
    (range, azimuth, elevation)
}

/// Sample the centre line of `road` every `spacing` metres, returning each
/// point with its curvature.
pub fn centreline(road: &RoadDescription, spacing: f64) -> Vec<(Vector3<f64>, f64)> {
    let mut out = Vec::new();
    if spacing <= 0.0 {
        return out;
    }
    let mut point = to_vector(&road.position);
    let mut heading = 0.0_f64;
    out.push((point, road.sections.first().map_or(0.0, |s| s.curvature_at(0.0))));
    for section in &road.sections {
        let mut s = 0.0;
        while s < section.length() {
            let ds = spacing.min(section.length() - s);
            let kappa = section.curvature_at(s);
            heading += kappa * ds;
            point += Vector3::new(heading.cos(), heading.sin(), 0.0) * ds;
            s += ds;
            out.push((point, kappa));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::road::RoadSection;

    #[test]
    fn polyline_length_and_pose() {
        let line = Polyline::new(&[
            Position::new(0.0, 0.0, 0.0),
            Position::new(10.0, 0.0, 0.0),
            Position::new(10.0, 10.0, 0.0),
        ]);
        assert!((line.length() - 20.0).abs() < 1e-12);

        let mid = line.pose_at(5.0);
        assert!((mid.position.x - 5.0).abs() < 1e-12);
        assert!(mid.orientation.yaw.abs() < 1e-12);

        let corner = line.pose_at(15.0);
        assert!((corner.position.y - 5.0).abs() < 1e-12);
        assert!((corner.orientation.yaw - FRAC_PI_2).abs() < 1e-12);

        let past_end = line.pose_at(100.0);
        assert!((past_end.position.y - 10.0).abs() < 1e-12);
    }

    #[test]
    fn full_throttle_accelerates_forward() {
        let params = VehicleParams::default();
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let mut speed = 0.0;
        let control = VehicleControlInput {
            throttle: 1.0,
            ..VehicleControlInput::default()
        };
        let out = integrate_vehicle(&params, &pose, &mut speed, &control, 0.1);
        assert!((speed - 0.3).abs() < 1e-12);
        assert!(out.position.x > 0.0);
        assert!(out.angular_velocity.yaw.abs() < 1e-12);
    }

    #[test]
    fn braking_stops_without_reversing() {
        let params = VehicleParams::default();
        let pose = Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let mut speed = 0.5;
        let control = VehicleControlInput {
            brake: 1.0,
            ..VehicleControlInput::default()
        };
        integrate_vehicle(&params, &pose, &mut speed, &control, 1.0);
        assert!(speed.abs() < f64::EPSILON);
    }

    #[test]
    fn spherical_in_front() {
        let sensor = isometry(&Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        let (range, azimuth, elevation) = spherical(&sensor, &Vector3::new(10.0, 0.0, 0.0));
        assert!((range - 10.0).abs() < 1e-12);
        assert!(azimuth.abs() < 1e-12);
        assert!(elevation.abs() < 1e-12);
    }

    #[test]
    fn spherical_respects_sensor_yaw() {
        let sensor = isometry(&Pose::new(0.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2));
        let (_, azimuth, _) = spherical(&sensor, &Vector3::new(0.0, 5.0, 0.0));
        assert!(azimuth.abs() < 1e-9);
    }

    #[test]
    fn centreline_of_straight_road() {
        let road = RoadDescription {
            sections: vec![RoadSection::Straight { length: 10.0 }],
            ..RoadDescription::default()
        };
        let points = centreline(&road, 2.5);
        assert_eq!(points.len(), 5);
        assert!((points[4].0.x - 10.0).abs() < 1e-9);
    }
}
