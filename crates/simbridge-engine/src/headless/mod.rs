//! In-memory [`Engine`] implementation.
//!
//! [`HeadlessEngine`] keeps every object, sensor and unit in ordered maps and
//! advances them with the point-mass rules in [`kinematics`]. Every
//! scenario-mutating call is appended to a [`Journal`] so tests can assert on
//! the exact call sequence the lifecycle produced.

pub mod journal;
pub mod kinematics;
pub mod scenario;

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use simbridge_core::data::{CenterOfGravityOffset, Pose, Position, Sentinel};
use simbridge_core::error::EngineError;
use simbridge_core::types::{LogLevel, SensorDetectability, SensorType, SkyLightPollution, SkyType};
use tracing::{debug, info};

pub use journal::{EngineCall, Journal};
use kinematics::{Polyline, VehicleParams};
use scenario::{SavedObject, SavedScenario};

use crate::backend::Engine;
use crate::handles::{
    ObjectHandle, PathHandle, RoadHandle, SensorHandle, SpeedProfileHandle, Trajectory,
    UnitHandle, ViewerHandle,
};
use crate::io::{
    AirDetection, BrsDetection, CameraImage, LmsPoint, MotionState, ObjectFlags,
    SchedulerSettings, SelfSensorOutput, SensorOutput, SensorParameter, StateActuatorInput,
    VehicleControlInput, WeatherSettings,
};
use crate::road::RoadDescription;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ObjectRecord {
    name: String,
    type_name: String,
    state: StateActuatorInput,
    cog_offset: CenterOfGravityOffset,
    flags: ObjectFlags,
    dynamics: Option<DynamicsRecord>,
    trajectory: Option<Trajectory>,
}

impl ObjectRecord {
    fn new(name: String, type_name: String) -> Self {
        Self {
            name,
            type_name,
            state: StateActuatorInput::default(),
            cog_offset: CenterOfGravityOffset::zeroed(),
            flags: ObjectFlags::default(),
            dynamics: None,
            trajectory: None,
        }
    }

    fn pose(&self) -> Pose {
        Pose {
            position: self.state.position,
            orientation: self.state.orientation,
        }
    }

    fn speed(&self) -> f64 {
        kinematics::to_vector(&Position::new(
            self.state.velocity.x,
            self.state.velocity.y,
            self.state.velocity.z,
        ))
        .norm()
    }
}

#[derive(Debug, Clone, Copy)]
struct DynamicsRecord {
    flat_ground: bool,
    initial_velocity: f64,
}

#[derive(Debug, Clone)]
struct SensorRecord {
    object: ObjectHandle,
    kind: SensorType,
    pose: Pose,
    parameters: SensorParameters,
    scripted: Option<SensorOutput>,
}

/// Resolved sensor configuration with engine defaults.
#[derive(Debug, Clone, Copy)]
struct SensorParameters {
    range: f64,
    fov_horizontal: f64,
    fov_vertical: f64,
    max_objects: usize,
    point_spacing: f64,
    max_lines: usize,
    max_points_per_line: usize,
    resolution: (u32, u32),
}

impl Default for SensorParameters {
    fn default() -> Self {
        Self {
            range: 150.0,
            fov_horizontal: std::f64::consts::FRAC_PI_2,
            fov_vertical: std::f64::consts::FRAC_PI_4,
            max_objects: 32,
            point_spacing: 1.0,
            max_lines: 8,
            max_points_per_line: 64,
            resolution: (64, 48),
        }
    }
}

impl SensorParameters {
    #[allow(clippy::cast_sign_loss)]
    fn apply(&mut self, parameter: SensorParameter) {
        let count = |v: i32| v.max(0) as usize;
        match parameter {
            SensorParameter::Range(v) => self.range = v,
            SensorParameter::Fov(v) | SensorParameter::FovHorizontal(v) => self.fov_horizontal = v,
            SensorParameter::FovVertical(v) => self.fov_vertical = v,
            SensorParameter::MaxDetectableObjects(v) => self.max_objects = count(v),
            SensorParameter::MaxLines(v) => self.max_lines = count(v),
            SensorParameter::MaxPointsPerLine(v) => self.max_points_per_line = count(v),
            SensorParameter::PointSpacing(v) => self.point_spacing = v,
            SensorParameter::ResolutionX(v) => self.resolution.0 = v.max(0) as u32,
            SensorParameter::ResolutionY(v) => self.resolution.1 = v.max(0) as u32,
            SensorParameter::DetectionType(_)
            | SensorParameter::Frequency(_)
            | SensorParameter::FrameRate(_) => {}
        }
    }
}

#[derive(Debug, Clone)]
enum Unit {
    StateActuator {
        object: ObjectHandle,
        input: StateActuatorInput,
    },
    SelfSensor {
        object: ObjectHandle,
    },
    VehicleDynamics {
        object: ObjectHandle,
        control: VehicleControlInput,
        output: StateActuatorInput,
        speed: f64,
    },
    SpeedProfile {
        profile: SpeedProfileHandle,
        output: MotionState,
    },
    Path {
        path: PathHandle,
        motion: MotionState,
        output: StateActuatorInput,
    },
    Sensor {
        sensor: SensorHandle,
        output: SensorOutput,
    },
}

impl Unit {
    const fn kind(&self) -> &'static str {
        match self {
            Self::StateActuator { .. } => "state actuator",
            Self::SelfSensor { .. } => "self sensor",
            Self::VehicleDynamics { .. } => "vehicle dynamics",
            Self::SpeedProfile { .. } => "speed profile",
            Self::Path { .. } => "path",
            Self::Sensor { .. } => "sensor",
        }
    }
}

// ---------------------------------------------------------------------------
// HeadlessEngine
// ---------------------------------------------------------------------------

/// In-memory engine with point-mass kinematics and a call journal.
///
/// # Example
///
/// ```
/// use simbridge_engine::prelude::*;
///
/// let mut engine = HeadlessEngine::new();
/// let car = engine.create_object("Audi_A3").unwrap();
/// assert_eq!(engine.object_name(car).unwrap(), "Audi_A3_1");
/// ```
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    next_id: u64,
    objects: BTreeMap<ObjectHandle, ObjectRecord>,
    type_counters: BTreeMap<String, u64>,
    sensors: BTreeMap<SensorHandle, SensorRecord>,
    paths: BTreeMap<PathHandle, Polyline>,
    speed_profiles: BTreeMap<SpeedProfileHandle, f64>,
    units: BTreeMap<UnitHandle, Unit>,
    roads: BTreeMap<RoadHandle, RoadDescription>,
    viewers: Vec<ViewerHandle>,
    weather: WeatherSettings,
    sky: (SkyType, SkyLightPollution),
    scheduler: SchedulerSettings,
    log_level: LogLevel,
    vehicle: VehicleParams,
    running: bool,
    ticks: u64,
    time: f64,
    journal: Journal,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            objects: BTreeMap::new(),
            type_counters: BTreeMap::new(),
            sensors: BTreeMap::new(),
            paths: BTreeMap::new(),
            speed_profiles: BTreeMap::new(),
            units: BTreeMap::new(),
            roads: BTreeMap::new(),
            viewers: Vec::new(),
            weather: WeatherSettings::default(),
            sky: (SkyType::default(), SkyLightPollution::default()),
            scheduler: SchedulerSettings::default(),
            log_level: LogLevel::default(),
            vehicle: VehicleParams::default(),
            running: false,
            ticks: 0,
            time: 0.0,
            journal: Journal::default(),
        }
    }

    /// Builder: override the vehicle parameters used by dynamics units.
    #[must_use]
    pub fn with_vehicle_params(mut self, params: VehicleParams) -> Self {
        self.vehicle = params;
        self
    }

    /// Place a named object in the scenario as if it had been loaded from a
    /// scenario file.
    pub fn insert_existing_object(&mut self, name: &str, type_name: &str, pose: Pose) -> ObjectHandle {
        let handle = ObjectHandle(self.mint());
        let mut record = ObjectRecord::new(name.to_owned(), type_name.to_owned());
        record.state.position = pose.position;
        record.state.orientation = pose.orientation;
        self.objects.insert(handle, record);
        handle
    }

    /// Make every sensor unit bound to `sensor` report `output` instead of
    /// the computed one.
    pub fn script_sensor_output(&mut self, sensor: SensorHandle, output: SensorOutput) -> Result<(), EngineError> {
        self.sensor_mut(sensor)?.scripted = Some(output);
        Ok(())
    }

    #[must_use]
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn journal_mut(&mut self) -> &mut Journal {
        &mut self.journal
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    #[must_use]
    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }

    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub const fn weather(&self) -> WeatherSettings {
        self.weather
    }

    #[must_use]
    pub const fn sky(&self) -> (SkyType, SkyLightPollution) {
        self.sky
    }

    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        self.log_level
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds since the current run began.
    #[must_use]
    pub const fn simulation_time(&self) -> f64 {
        self.time
    }

    /// Kinematic state of an object.
    pub fn object_state(&self, object: ObjectHandle) -> Result<StateActuatorInput, EngineError> {
        Ok(self.object(object)?.state)
    }

    /// Host object and kind of a sensor.
    pub fn sensor_kind(&self, sensor: SensorHandle) -> Result<(ObjectHandle, SensorType), EngineError> {
        let record = self.sensor(sensor)?;
        Ok((record.object, record.kind))
    }

    // -- internals --

    const fn mint(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn object(&self, handle: ObjectHandle) -> Result<&ObjectRecord, EngineError> {
        self.objects.get(&handle).ok_or(EngineError::UnknownHandle {
            kind: ObjectHandle::KIND,
            id: handle.id(),
        })
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> Result<&mut ObjectRecord, EngineError> {
        self.objects.get_mut(&handle).ok_or(EngineError::UnknownHandle {
            kind: ObjectHandle::KIND,
            id: handle.id(),
        })
    }

    fn sensor(&self, handle: SensorHandle) -> Result<&SensorRecord, EngineError> {
        self.sensors.get(&handle).ok_or(EngineError::UnknownHandle {
            kind: SensorHandle::KIND,
            id: handle.id(),
        })
    }

    fn sensor_mut(&mut self, handle: SensorHandle) -> Result<&mut SensorRecord, EngineError> {
        self.sensors.get_mut(&handle).ok_or(EngineError::UnknownHandle {
            kind: SensorHandle::KIND,
            id: handle.id(),
        })
    }

    fn path(&self, handle: PathHandle) -> Result<&Polyline, EngineError> {
        self.paths.get(&handle).ok_or(EngineError::UnknownHandle {
            kind: PathHandle::KIND,
            id: handle.id(),
        })
    }

    fn unit(&self, handle: UnitHandle) -> Result<&Unit, EngineError> {
        self.units.get(&handle).ok_or(EngineError::UnknownHandle {
            kind: UnitHandle::KIND,
            id: handle.id(),
        })
    }

    fn unit_mut(&mut self, handle: UnitHandle) -> Result<&mut Unit, EngineError> {
        self.units.get_mut(&handle).ok_or(EngineError::UnknownHandle {
            kind: UnitHandle::KIND,
            id: handle.id(),
        })
    }

    fn wrong_unit(handle: UnitHandle) -> EngineError {
        EngineError::UnknownHandle {
            kind: UnitHandle::KIND,
            id: handle.id(),
        }
    }

    fn add_unit(&mut self, unit: Unit) -> UnitHandle {
        let handle = UnitHandle(self.mint());
        self.journal.record(EngineCall::RegisterUnit {
            unit: handle,
            kind: unit.kind(),
        });
        self.units.insert(handle, unit);
        handle
    }

    fn unique_name(&mut self, type_name: &str) -> String {
        loop {
            let counter = self.type_counters.entry(type_name.to_owned()).or_insert(0);
            *counter += 1;
            let name = format!("{type_name}_{counter}");
            if self.find_object(&name).is_none() {
                return name;
            }
        }
    }

    /// Objects inside the field of view of a sensor at `mount`, nearest
    /// first, capped at the sensor's object limit.
    fn visible_objects(
        &self,
        host: ObjectHandle,
        mount: &nalgebra::Isometry3<f64>,
        params: &SensorParameters,
    ) -> Vec<(ObjectHandle, &ObjectRecord, f64, f64, f64)> {
        let mut seen: Vec<_> = self
            .objects
            .iter()
            .filter(|&(handle, other)| {
                *handle != host && other.flags.detectability != SensorDetectability::Invisible
            })
            .filter_map(|(handle, other)| {
                let target = kinematics::to_vector(&other.state.position);
                let (range, azimuth, elevation) = kinematics::spherical(mount, &target);
                let in_view = range <= params.range
                    && azimuth.abs() <= params.fov_horizontal / 2.0
                    && elevation.abs() <= params.fov_vertical.max(params.fov_horizontal) / 2.0;
                in_view.then_some((*handle, other, range, azimuth, elevation))
            })
            .collect();
        seen.sort_by(|a, b| a.2.total_cmp(&b.2));
        seen.truncate(params.max_objects);
        seen
    }

    fn compute_sensor_output(&self, sensor: SensorHandle) -> Result<SensorOutput, EngineError> {
        let record = self.sensor(sensor)?;
        if let Some(scripted) = &record.scripted {
            return Ok(scripted.clone());
        }
        let host = self.object(record.object)?;
        let mount = kinematics::mounted(&host.pose(), &record.pose);
        let params = record.parameters;
        let visible = self.visible_objects(record.object, &mount, &params);

        #[allow(clippy::cast_possible_truncation)]
        let output = match record.kind {
            SensorType::Air => SensorOutput::Air(
                visible
                    .iter()
                    .map(|&(handle, other, range, azimuth, elevation)| AirDetection {
                        range,
                        azimuth,
                        elevation,
                        id: handle.id() as u32,
                        velocity: other.speed(),
                        heading: other.state.orientation.yaw,
                    })
                    .collect(),
            ),
            SensorType::Brs => SensorOutput::Brs(
                visible
                    .iter()
                    .map(|&(handle, _, range, azimuth, elevation)| {
                        // Unit-sized box projected onto the normalised image plane.
                        let half_h = params.fov_horizontal / 2.0;
                        let half_v = params.fov_vertical / 2.0;
                        let extent = 1.0_f64.atan2(range);
                        BrsDetection {
                            object_id: handle.id() as u32,
                            left: (-azimuth - extent) / half_h,
                            right: (-azimuth + extent) / half_h,
                            bottom: (elevation - extent) / half_v,
                            top: (elevation + extent) / half_v,
                        }
                    })
                    .collect(),
            ),
            SensorType::Lms => SensorOutput::Lms(
                self.roads
                    .values()
                    .take(params.max_lines)
                    .map(|road| {
                        kinematics::centreline(road, params.point_spacing)
                            .into_iter()
                            .filter(|(p, _)| kinematics::spherical(&mount, p).0 <= params.range)
                            .take(params.max_points_per_line)
                            .map(|(p, curvature)| LmsPoint {
                                x: p.x,
                                y: p.y,
                                z: p.z,
                                curvature,
                            })
                            .collect::<Vec<_>>()
                    })
                    .filter(|line| !line.is_empty())
                    .collect(),
            ),
            SensorType::Camera => {
                SensorOutput::Camera(CameraImage::black(params.resolution.0, params.resolution.1))
            }
            other => return Err(EngineError::UnknownObjectType(other.name().to_owned())),
        };
        Ok(output)
    }

    fn apply_actuators(&mut self) {
        let writes: Vec<_> = self
            .units
            .values()
            .filter_map(|unit| match unit {
                Unit::StateActuator { object, input } => Some((*object, *input)),
                _ => None,
            })
            .collect();
        for (object, input) in writes {
            if let Some(record) = self.objects.get_mut(&object) {
                if record.flags.movable {
                    record.state = input;
                }
            }
        }
    }

    fn integrate(&mut self, dt: f64) {
        let params = self.vehicle;
        let time = self.time + dt;
        let objects = &self.objects;
        let paths = &self.paths;
        let profiles = &self.speed_profiles;
        for unit in self.units.values_mut() {
            match unit {
                Unit::VehicleDynamics {
                    object,
                    control,
                    output,
                    speed,
                } => {
                    if let Some(record) = objects.get(object) {
                        *output = kinematics::integrate_vehicle(&params, &record.pose(), speed, control, dt);
                    }
                }
                Unit::SpeedProfile { profile, output } => {
                    let velocity = profiles.get(profile).copied().unwrap_or(0.0);
                    *output = MotionState {
                        velocity,
                        acceleration: 0.0,
                        distance: velocity * time,
                    };
                }
                Unit::Path { path, motion, output } => {
                    if let Some(line) = paths.get(path) {
                        *output = path_state(line, motion);
                    }
                }
                Unit::StateActuator { .. } | Unit::SelfSensor { .. } | Unit::Sensor { .. } => {}
            }
        }
    }

    fn refresh_sensor_units(&mut self) -> Result<(), EngineError> {
        let sensors: Vec<_> = self
            .units
            .iter()
            .filter_map(|(handle, unit)| match unit {
                Unit::Sensor { sensor, .. } => Some((*handle, *sensor)),
                _ => None,
            })
            .collect();
        for (handle, sensor) in sensors {
            let fresh = self.compute_sensor_output(sensor)?;
            if let Some(Unit::Sensor { output, .. }) = self.units.get_mut(&handle) {
                *output = fresh;
            }
        }
        Ok(())
    }
}

/// State imposed by a path unit for a given motion along the path.
fn path_state(line: &Polyline, motion: &MotionState) -> StateActuatorInput {
    let pose = line.pose_at(motion.distance);
    let heading = kinematics::rotation(&pose.orientation);
    let velocity = heading * nalgebra::Vector3::x() * motion.velocity;
    let acceleration = heading * nalgebra::Vector3::x() * motion.acceleration;
    StateActuatorInput {
        position: pose.position,
        orientation: pose.orientation,
        velocity: simbridge_core::data::Velocity::new(velocity.x, velocity.y, velocity.z),
        acceleration: simbridge_core::data::Acceleration::new(acceleration.x, acceleration.y, acceleration.z),
        angular_velocity: simbridge_core::data::AngularVelocity::zeroed(),
    }
}

// ---------------------------------------------------------------------------
// Engine impl
// ---------------------------------------------------------------------------

impl Engine for HeadlessEngine {
    fn name(&self) -> &str {
        "headless"
    }

    // -- World objects --

    fn create_object(&mut self, type_name: &str) -> Result<ObjectHandle, EngineError> {
        if type_name.is_empty() {
            return Err(EngineError::UnknownObjectType(type_name.to_owned()));
        }
        let name = self.unique_name(type_name);
        let handle = ObjectHandle(self.mint());
        debug!(%handle, %name, "create object");
        self.objects
            .insert(handle, ObjectRecord::new(name, type_name.to_owned()));
        self.journal.record(EngineCall::CreateObject {
            type_name: type_name.to_owned(),
            object: handle,
        });
        Ok(handle)
    }

    fn find_object(&self, name: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .find(|(_, record)| record.name == name)
            .map(|(handle, _)| *handle)
    }

    fn remove_object(&mut self, object: ObjectHandle) -> Result<(), EngineError> {
        self.objects.remove(&object).ok_or(EngineError::UnknownHandle {
            kind: ObjectHandle::KIND,
            id: object.id(),
        })?;
        let orphaned: Vec<_> = self
            .sensors
            .iter()
            .filter(|(_, s)| s.object == object)
            .map(|(h, _)| *h)
            .collect();
        for sensor in &orphaned {
            self.sensors.remove(sensor);
        }
        self.units.retain(|_, unit| match unit {
            Unit::StateActuator { object: o, .. }
            | Unit::SelfSensor { object: o }
            | Unit::VehicleDynamics { object: o, .. } => *o != object,
            Unit::Sensor { sensor, .. } => !orphaned.contains(sensor),
            Unit::SpeedProfile { .. } | Unit::Path { .. } => true,
        });
        self.journal.record(EngineCall::RemoveObject { object });
        Ok(())
    }

    fn object_name(&self, object: ObjectHandle) -> Result<String, EngineError> {
        Ok(self.object(object)?.name.clone())
    }

    fn object_pose(&self, object: ObjectHandle) -> Result<Pose, EngineError> {
        Ok(self.object(object)?.pose())
    }

    fn set_object_pose(&mut self, object: ObjectHandle, pose: &Pose) -> Result<(), EngineError> {
        debug_assert!(pose.is_fully_set(), "absolute pose must not contain unset fields");
        let record = self.object_mut(object)?;
        record.state.position = pose.position;
        record.state.orientation = pose.orientation;
        self.journal.record(EngineCall::SetObjectPose { object });
        Ok(())
    }

    fn cog_offset(&self, object: ObjectHandle) -> Result<CenterOfGravityOffset, EngineError> {
        Ok(self.object(object)?.cog_offset)
    }

    fn set_cog_offset(
        &mut self,
        object: ObjectHandle,
        offset: &CenterOfGravityOffset,
    ) -> Result<(), EngineError> {
        self.object_mut(object)?.cog_offset = *offset;
        self.journal.record(EngineCall::SetCogOffset { object });
        Ok(())
    }

    fn object_flags(&self, object: ObjectHandle) -> Result<ObjectFlags, EngineError> {
        Ok(self.object(object)?.flags)
    }

    fn set_collision_detectable(&mut self, object: ObjectHandle, value: bool) -> Result<(), EngineError> {
        self.object_mut(object)?.flags.collision_detectable = value;
        self.journal.record(EngineCall::SetObjectFlags { object });
        Ok(())
    }

    fn set_movable(&mut self, object: ObjectHandle, value: bool) -> Result<(), EngineError> {
        self.object_mut(object)?.flags.movable = value;
        self.journal.record(EngineCall::SetObjectFlags { object });
        Ok(())
    }

    fn set_sensor_detectability(
        &mut self,
        object: ObjectHandle,
        value: SensorDetectability,
    ) -> Result<(), EngineError> {
        self.object_mut(object)?.flags.detectability = value;
        self.journal.record(EngineCall::SetObjectFlags { object });
        Ok(())
    }

    // -- Per-tick units --

    fn register_state_actuator(&mut self, object: ObjectHandle) -> Result<UnitHandle, EngineError> {
        let input = self.object(object)?.state;
        Ok(self.add_unit(Unit::StateActuator { object, input }))
    }

    fn state_actuator_input(&mut self, unit: UnitHandle) -> Result<&mut StateActuatorInput, EngineError> {
        match self.unit_mut(unit)? {
            Unit::StateActuator { input, .. } => Ok(input),
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    fn register_self_sensor(&mut self, object: ObjectHandle) -> Result<UnitHandle, EngineError> {
        self.object(object)?;
        Ok(self.add_unit(Unit::SelfSensor { object }))
    }

    fn self_sensor_output(&self, unit: UnitHandle) -> Result<SelfSensorOutput, EngineError> {
        let Unit::SelfSensor { object } = self.unit(unit)? else {
            return Err(Self::wrong_unit(unit));
        };
        let record = self.object(*object)?;
        Ok(SelfSensorOutput {
            position: record.state.position,
            orientation: record.state.orientation,
            velocity: record.speed(),
            yaw_rate: record.state.angular_velocity.yaw,
        })
    }

    fn unregister_unit(&mut self, unit: UnitHandle) -> Result<(), EngineError> {
        self.units.remove(&unit).ok_or(Self::wrong_unit(unit))?;
        self.journal.record(EngineCall::UnregisterUnit { unit });
        Ok(())
    }

    // -- Vehicle dynamics --

    fn create_vehicle_dynamics(
        &mut self,
        object: ObjectHandle,
        flat_ground: bool,
        initial_velocity: f64,
    ) -> Result<(), EngineError> {
        self.object_mut(object)?.dynamics = Some(DynamicsRecord {
            flat_ground,
            initial_velocity,
        });
        self.journal.record(EngineCall::CreateVehicleDynamics { object });
        Ok(())
    }

    fn has_vehicle_dynamics(&self, object: ObjectHandle) -> bool {
        self.objects
            .get(&object)
            .is_some_and(|record| record.dynamics.is_some())
    }

    fn register_vehicle_dynamics(
        &mut self,
        object: ObjectHandle,
        use_simulation_path: bool,
    ) -> Result<UnitHandle, EngineError> {
        let record = self.object(object)?;
        let dynamics = record.dynamics.ok_or_else(|| {
            EngineError::Malformed(format!("object {} has no vehicle dynamics", record.name))
        })?;
        debug!(%object, flat_ground = dynamics.flat_ground, use_simulation_path, "register vehicle dynamics");
        let output = record.state;
        Ok(self.add_unit(Unit::VehicleDynamics {
            object,
            control: VehicleControlInput::default(),
            output,
            speed: dynamics.initial_velocity,
        }))
    }

    fn vehicle_control_input(&mut self, unit: UnitHandle) -> Result<&mut VehicleControlInput, EngineError> {
        match self.unit_mut(unit)? {
            Unit::VehicleDynamics { control, .. } => Ok(control),
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    fn vehicle_state_output(&self, unit: UnitHandle) -> Result<StateActuatorInput, EngineError> {
        match self.unit(unit)? {
            Unit::VehicleDynamics { output, .. } => Ok(*output),
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    // -- Trajectories --

    fn create_fitted_path(&mut self, points: &[Position], tolerance: f64) -> Result<PathHandle, EngineError> {
        if points.len() < 2 {
            return Err(EngineError::Malformed(format!(
                "fitted path needs at least two points, got {}",
                points.len()
            )));
        }
        debug!(points = points.len(), tolerance, "create fitted path");
        let handle = PathHandle(self.mint());
        self.paths.insert(handle, Polyline::new(points));
        Ok(handle)
    }

    fn create_constant_speed_profile(&mut self, speed: f64) -> Result<SpeedProfileHandle, EngineError> {
        let handle = SpeedProfileHandle(self.mint());
        self.speed_profiles.insert(handle, speed);
        Ok(handle)
    }

    fn create_trajectory(
        &mut self,
        object: ObjectHandle,
        path: PathHandle,
        speed_profile: SpeedProfileHandle,
    ) -> Result<Trajectory, EngineError> {
        self.path(path)?;
        if !self.speed_profiles.contains_key(&speed_profile) {
            return Err(EngineError::UnknownHandle {
                kind: SpeedProfileHandle::KIND,
                id: speed_profile.id(),
            });
        }
        let trajectory = Trajectory {
            path,
            speed_profile,
        };
        self.object_mut(object)?.trajectory = Some(trajectory);
        self.journal.record(EngineCall::CreateTrajectory { object });
        Ok(trajectory)
    }

    fn active_trajectory(&self, object: ObjectHandle) -> Option<Trajectory> {
        self.objects.get(&object).and_then(|record| record.trajectory)
    }

    fn path_length(&self, path: PathHandle) -> Result<f64, EngineError> {
        Ok(self.path(path)?.length())
    }

    fn pose_at_distance(&self, path: PathHandle, distance: f64) -> Result<Pose, EngineError> {
        Ok(self.path(path)?.pose_at(distance))
    }

    fn register_speed_profile(&mut self, profile: SpeedProfileHandle) -> Result<UnitHandle, EngineError> {
        let velocity = self
            .speed_profiles
            .get(&profile)
            .copied()
            .ok_or(EngineError::UnknownHandle {
                kind: SpeedProfileHandle::KIND,
                id: profile.id(),
            })?;
        Ok(self.add_unit(Unit::SpeedProfile {
            profile,
            output: MotionState {
                velocity,
                ..MotionState::default()
            },
        }))
    }

    fn motion_output(&self, unit: UnitHandle) -> Result<MotionState, EngineError> {
        match self.unit(unit)? {
            Unit::SpeedProfile { output, .. } => Ok(*output),
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    fn register_path(&mut self, path: PathHandle, object: ObjectHandle) -> Result<UnitHandle, EngineError> {
        let line = self.path(path)?;
        self.object(object)?;
        let motion = MotionState::default();
        let output = path_state(line, &motion);
        Ok(self.add_unit(Unit::Path {
            path,
            motion,
            output,
        }))
    }

    fn set_path_motion_input(&mut self, unit: UnitHandle, motion: MotionState) -> Result<(), EngineError> {
        match self.unit_mut(unit)? {
            Unit::Path { motion: m, .. } => {
                *m = motion;
                Ok(())
            }
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    fn path_state_output(&self, unit: UnitHandle) -> Result<StateActuatorInput, EngineError> {
        match self.unit(unit)? {
            Unit::Path { output, .. } => Ok(*output),
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    // -- Sensors --

    fn create_sensor(&mut self, object: ObjectHandle, kind: SensorType) -> Result<SensorHandle, EngineError> {
        self.object(object)?;
        let handle = SensorHandle(self.mint());
        self.sensors.insert(
            handle,
            SensorRecord {
                object,
                kind,
                pose: Pose::zeroed(),
                parameters: SensorParameters::default(),
                scripted: None,
            },
        );
        self.journal.record(EngineCall::CreateSensor {
            object,
            kind,
            sensor: handle,
        });
        Ok(handle)
    }

    fn attached_sensors(&self, object: ObjectHandle, kind: SensorType) -> Vec<SensorHandle> {
        self.sensors
            .iter()
            .filter(|(_, s)| s.object == object && s.kind == kind)
            .map(|(h, _)| *h)
            .collect()
    }

    fn sensor_pose(&self, sensor: SensorHandle) -> Result<Pose, EngineError> {
        Ok(self.sensor(sensor)?.pose)
    }

    fn set_sensor_pose(&mut self, sensor: SensorHandle, pose: &Pose) -> Result<(), EngineError> {
        self.sensor_mut(sensor)?.pose = *pose;
        self.journal.record(EngineCall::ConfigureSensor { sensor });
        Ok(())
    }

    fn set_sensor_parameter(
        &mut self,
        sensor: SensorHandle,
        parameter: SensorParameter,
    ) -> Result<(), EngineError> {
        self.sensor_mut(sensor)?.parameters.apply(parameter);
        self.journal.record(EngineCall::ConfigureSensor { sensor });
        Ok(())
    }

    fn register_sensor(&mut self, sensor: SensorHandle) -> Result<UnitHandle, EngineError> {
        let output = self.compute_sensor_output(sensor)?;
        Ok(self.add_unit(Unit::Sensor { sensor, output }))
    }

    fn sensor_output(&self, unit: UnitHandle) -> Result<SensorOutput, EngineError> {
        match self.unit(unit)? {
            Unit::Sensor { output, .. } => Ok(output.clone()),
            _ => Err(Self::wrong_unit(unit)),
        }
    }

    // -- Scenario --

    fn has_roads(&self) -> bool {
        !self.roads.is_empty()
    }

    fn add_road(&mut self, road: &RoadDescription) -> Result<RoadHandle, EngineError> {
        let handle = RoadHandle(self.mint());
        self.roads.insert(handle, road.clone());
        self.journal.record(EngineCall::AddRoad);
        Ok(handle)
    }

    fn import_open_drive(&mut self, path: &Path) -> Result<(), EngineError> {
        let roads = scenario::read_open_drive(path)?;
        info!(path = %path.display(), roads = roads.len(), "imported road network");
        for road in roads {
            let handle = RoadHandle(self.mint());
            self.roads.insert(handle, road);
        }
        self.journal.record(EngineCall::ImportOpenDrive);
        Ok(())
    }

    fn set_weather(&mut self, weather: WeatherSettings) {
        self.weather = weather;
        self.journal.record(EngineCall::SetWeather);
    }

    fn set_sky(&mut self, sky: SkyType, light_pollution: SkyLightPollution) {
        self.sky = (sky, light_pollution);
        self.journal.record(EngineCall::SetSky);
    }

    fn scheduler(&self) -> SchedulerSettings {
        self.scheduler
    }

    fn set_scheduler_frequencies(&mut self, simulation_frequency: f64, integration_frequency: f64) {
        self.scheduler.simulation_frequency = simulation_frequency;
        self.scheduler.integration_frequency = integration_frequency;
        self.journal.record(EngineCall::SetScheduler);
    }

    fn set_scheduler_speed(&mut self, speed: f64, ignore_frame_overrun: bool) {
        self.scheduler.speed = speed;
        self.scheduler.ignore_frame_overrun = ignore_frame_overrun;
        self.journal.record(EngineCall::SetScheduler);
    }

    fn add_free_viewer(&mut self) -> ViewerHandle {
        let handle = ViewerHandle(self.mint());
        self.viewers.push(handle);
        self.journal.record(EngineCall::AddViewer);
        handle
    }

    fn remove_all_viewers(&mut self) {
        self.viewers.clear();
        self.journal.record(EngineCall::RemoveViewers);
    }

    fn save(&self, path: &Path) -> Result<(), EngineError> {
        let saved = SavedScenario {
            objects: self
                .objects
                .values()
                .map(|record| SavedObject {
                    name: record.name.clone(),
                    type_name: record.type_name.clone(),
                    pose: record.pose(),
                    cog_offset: record.cog_offset,
                    flags: record.flags,
                })
                .collect(),
            roads: self.roads.values().cloned().collect(),
            weather: self.weather,
            sky: self.sky.0,
            light_pollution: self.sky.1,
            scheduler: self.scheduler,
        };
        saved.write(path)?;
        debug!(path = %path.display(), "saved scenario");
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EngineError> {
        let saved = SavedScenario::read(path)?;
        let journal = std::mem::take(&mut self.journal);
        *self = Self::new().with_vehicle_params(self.vehicle);
        self.journal = journal;
        for object in saved.objects {
            let handle = self.insert_existing_object(&object.name, &object.type_name, object.pose);
            if let Some(record) = self.objects.get_mut(&handle) {
                record.cog_offset = object.cog_offset;
                record.flags = object.flags;
            }
        }
        for road in saved.roads {
            let handle = RoadHandle(self.mint());
            self.roads.insert(handle, road);
        }
        self.weather = saved.weather;
        self.sky = (saved.sky, saved.light_pollution);
        self.scheduler = saved.scheduler;
        self.journal.record(EngineCall::Load);
        Ok(())
    }

    // -- Simulation --

    fn begin_simulation(&mut self) -> Result<(), EngineError> {
        if self.running {
            return Err(EngineError::Malformed("simulation already running".into()));
        }
        self.running = true;
        self.ticks = 0;
        self.time = 0.0;
        self.journal.record(EngineCall::BeginSimulation);
        Ok(())
    }

    fn advance(&mut self) -> Result<f64, EngineError> {
        if !self.running {
            return Err(EngineError::Malformed("simulation not running".into()));
        }
        let dt = self.scheduler.tick_seconds();
        self.apply_actuators();
        self.integrate(dt);
        self.refresh_sensor_units()?;
        self.ticks += 1;
        self.time += dt;
        self.journal.record(EngineCall::Advance);
        Ok(dt)
    }

    fn end_simulation(&mut self) -> Result<(), EngineError> {
        if !self.running {
            return Err(EngineError::Malformed("simulation not running".into()));
        }
        self.running = false;
        self.journal.record(EngineCall::EndSimulation);
        Ok(())
    }

    fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
