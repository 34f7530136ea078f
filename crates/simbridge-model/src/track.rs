//! Object that follows a fitted path at a (scaled) constant speed.

use std::any::Any;
use std::fmt;

use simbridge_core::Result;
use simbridge_core::data::{Pose, Position, Sentinel, UNSET, merge_field};
use simbridge_core::error::{InputError, LifecycleError, ResourceError};
use simbridge_core::flat::{FlatVector, check_arity};
use simbridge_engine::Engine;
use simbridge_engine::handles::{Trajectory, UnitHandle};
use simbridge_engine::io::MotionState;
use tracing::debug;

use crate::model::{EntityModel, ModelCore};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Scaling applied to the speed-profile motion before it reaches the path.
///
/// Each quantity becomes `value * multiplier + offset`; unset multipliers
/// or offsets are skipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackModelInput {
    pub velocity_multiplier: f64,
    pub velocity_offset: f64,
    pub acceleration_multiplier: f64,
    pub acceleration_offset: f64,
    pub distance_multiplier: f64,
    pub distance_offset: f64,
}

impl TrackModelInput {
    #[must_use]
    pub const fn new(
        velocity_multiplier: f64,
        velocity_offset: f64,
        acceleration_multiplier: f64,
        acceleration_offset: f64,
        distance_multiplier: f64,
        distance_offset: f64,
    ) -> Self {
        Self {
            velocity_multiplier,
            velocity_offset,
            acceleration_multiplier,
            acceleration_offset,
            distance_multiplier,
            distance_offset,
        }
    }

    /// Multipliers 1, offsets 0.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 1.0, 0.0, 1.0, 0.0)
    }

    const fn to_array(&self) -> [f64; 6] {
        [
            self.velocity_multiplier,
            self.velocity_offset,
            self.acceleration_multiplier,
            self.acceleration_offset,
            self.distance_multiplier,
            self.distance_offset,
        ]
    }

    /// Apply the scaling to a speed-profile output.
    #[must_use]
    pub fn transform(&self, motion: MotionState) -> MotionState {
        MotionState {
            velocity: scale(motion.velocity, self.velocity_multiplier, self.velocity_offset),
            acceleration: scale(
                motion.acceleration,
                self.acceleration_multiplier,
                self.acceleration_offset,
            ),
            distance: scale(motion.distance, self.distance_multiplier, self.distance_offset),
        }
    }
}

fn scale(value: f64, multiplier: f64, offset: f64) -> f64 {
    let mut value = value;
    if !multiplier.is_nan() {
        value *= multiplier;
    }
    if !offset.is_nan() {
        value += offset;
    }
    value
}

impl Default for TrackModelInput {
    fn default() -> Self {
        Self::identity()
    }
}

impl Sentinel for TrackModelInput {
    fn unset() -> Self {
        Self::new(UNSET, UNSET, UNSET, UNSET, UNSET, UNSET)
    }

    fn zeroed() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    }

    fn merge(&mut self, patch: &Self) {
        merge_field(&mut self.velocity_multiplier, patch.velocity_multiplier);
        merge_field(&mut self.velocity_offset, patch.velocity_offset);
        merge_field(&mut self.acceleration_multiplier, patch.acceleration_multiplier);
        merge_field(&mut self.acceleration_offset, patch.acceleration_offset);
        merge_field(&mut self.distance_multiplier, patch.distance_multiplier);
        merge_field(&mut self.distance_offset, patch.distance_offset);
    }

    fn is_unset(&self) -> bool {
        self.to_array().iter().all(|v| v.is_nan())
    }

    fn is_fully_set(&self) -> bool {
        self.to_array().iter().all(|v| !v.is_nan())
    }
}

impl FlatVector for TrackModelInput {
    const ARITY: usize = 6;
    const NAME: &'static str = "TrackModel";

    fn from_flat(values: &[f64]) -> Result<Self, InputError> {
        check_arity(Self::NAME, Self::ARITY, values)?;
        Ok(Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        ))
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&self.to_array());
    }
}

impl fmt::Display for TrackModelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackModelInput: (velocity_multiplier: {}, velocity_offset: {}, \
             acceleration_multiplier: {}, acceleration_offset: {}, distance_multiplier: {}, \
             distance_offset: {})",
            self.velocity_multiplier,
            self.velocity_offset,
            self.acceleration_multiplier,
            self.acceleration_offset,
            self.distance_multiplier,
            self.distance_offset
        )
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrackModelSetup {
    pub existing: bool,
    pub active: bool,
    /// Points the fitted path passes through.
    pub path: Vec<Position>,
    /// Constant speed along the path in m/s.
    pub speed: f64,
    /// Fitting tolerance in metres.
    pub tolerance: f64,
}

impl Default for TrackModelSetup {
    fn default() -> Self {
        Self {
            existing: false,
            active: true,
            path: Vec::new(),
            speed: 1.0,
            tolerance: 0.1,
        }
    }
}

impl TrackModelSetup {
    #[must_use]
    pub fn with_path(mut self, path: Vec<Position>) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Moves its object along a trajectory made of a fitted path and a
/// constant-speed profile.
#[derive(Debug, Clone)]
pub struct TrackModel {
    core: ModelCore,
    setup: TrackModelSetup,
    input: TrackModelInput,
    trajectory: Option<Trajectory>,
    speed_profile_unit: Option<UnitHandle>,
    path_unit: Option<UnitHandle>,
}

impl TrackModel {
    #[must_use]
    pub fn new(setup: TrackModelSetup) -> Self {
        Self {
            core: ModelCore::new(setup.existing, setup.active),
            setup,
            input: TrackModelInput::identity(),
            trajectory: None,
            speed_profile_unit: None,
            path_unit: None,
        }
    }

    #[must_use]
    pub fn with_input(mut self, input: TrackModelInput) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub const fn input(&self) -> &TrackModelInput {
        &self.input
    }

    pub fn set_input(&mut self, input: TrackModelInput) {
        self.input = input;
    }

    pub fn update_input(&mut self, patch: &TrackModelInput) {
        self.input.merge(patch);
    }

    #[must_use]
    pub fn trajectory_positions(&self) -> &[Position] {
        &self.setup.path
    }

    #[must_use]
    pub const fn trajectory_speed(&self) -> f64 {
        self.setup.speed
    }

    #[must_use]
    pub const fn trajectory_tolerance(&self) -> f64 {
        self.setup.tolerance
    }

    /// `segments` poses at equal arc-length spacing from the start of the
    /// path. The end point is not included.
    pub fn trajectory_poses(&self, engine: &dyn Engine, segments: usize) -> Result<Vec<Pose>> {
        if segments == 0 {
            return Err(InputError::ZeroSegments.into());
        }
        let trajectory = self.known_trajectory(engine)?;
        let length = engine.path_length(trajectory.path)?;
        #[allow(clippy::cast_precision_loss)]
        let spacing = length / segments as f64;
        let mut poses = Vec::with_capacity(segments);
        for i in 0..segments {
            #[allow(clippy::cast_precision_loss)]
            let distance = i as f64 * spacing;
            poses.push(engine.pose_at_distance(trajectory.path, distance)?);
        }
        Ok(poses)
    }

    fn known_trajectory(&self, engine: &dyn Engine) -> Result<Trajectory> {
        if let Some(trajectory) = self.trajectory {
            return Ok(trajectory);
        }
        let object = self.core.object()?;
        engine.active_trajectory(object).ok_or_else(|| {
            let name = engine
                .object_name(object)
                .unwrap_or_else(|_| object.to_string());
            ResourceError::TrajectoryMissing(name).into()
        })
    }
}

impl Default for TrackModel {
    fn default() -> Self {
        Self::new(TrackModelSetup::default())
    }
}

impl fmt::Display for TrackModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackModel(path: [")?;
        for (i, position) in self.setup.path.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{position}")?;
        }
        write!(
            f,
            "], speed: {}, tolerance: {})",
            self.setup.speed, self.setup.tolerance
        )
    }
}

impl EntityModel for TrackModel {
    fn name(&self) -> &'static str {
        "TrackModel"
    }

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModelCore {
        &mut self.core
    }

    fn input_arity(&self) -> usize {
        TrackModelInput::ARITY
    }

    fn set_flat_input(&mut self, values: &[f64]) -> Result<(), InputError> {
        self.input = TrackModelInput::from_flat(values)?;
        Ok(())
    }

    fn update_flat_input(&mut self, values: &[f64]) -> Result<(), InputError> {
        let patch = TrackModelInput::from_flat(values)?;
        self.input.merge(&patch);
        Ok(())
    }

    fn flat_input(&self) -> Vec<f64> {
        self.input.to_flat()
    }

    fn create_if_not_exists(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if !self.core.is_existing() && self.setup.path.len() < 2 {
            return Err(InputError::PathTooShort(self.setup.path.len()).into());
        }
        if !self.core.claim_creation()? {
            return Ok(());
        }
        let object = self.core.object()?;
        let path = engine.create_fitted_path(&self.setup.path, self.setup.tolerance)?;
        let profile = engine.create_constant_speed_profile(self.setup.speed)?;
        let trajectory = engine.create_trajectory(object, path, profile)?;
        debug!(%object, points = self.setup.path.len(), speed = self.setup.speed, "trajectory created");
        self.trajectory = Some(trajectory);
        Ok(())
    }

    fn register_unit(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if !self.core.is_active() {
            return self.core.register(engine).map(|_| ());
        }
        // Resolve the trajectory first so a missing one leaves the model unregistered.
        let object = self.core.object()?;
        let trajectory = engine.active_trajectory(object).ok_or_else(|| {
            ResourceError::TrajectoryMissing(
                engine
                    .object_name(object)
                    .unwrap_or_else(|_| object.to_string()),
            )
        })?;
        self.core.register(engine)?;
        self.speed_profile_unit = Some(engine.register_speed_profile(trajectory.speed_profile)?);
        self.path_unit = Some(engine.register_path(trajectory.path, object)?);
        self.trajectory = Some(trajectory);
        Ok(())
    }

    fn apply(&mut self, engine: &mut dyn Engine) -> Result<()> {
        let (Some(profile), Some(path)) = (self.speed_profile_unit, self.path_unit) else {
            return Err(LifecycleError::NotRegistered { unit: "model" }.into());
        };
        let motion = self.input.transform(engine.motion_output(profile)?);
        engine.set_path_motion_input(path, motion)?;
        let state = engine.path_state_output(path)?;
        *engine.state_actuator_input(self.core.actuator()?)? = state;
        Ok(())
    }

    fn terminate(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if self.core.release(engine)? {
            for unit in [self.speed_profile_unit.take(), self.path_unit.take()]
                .into_iter()
                .flatten()
            {
                engine.unregister_unit(unit)?;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
