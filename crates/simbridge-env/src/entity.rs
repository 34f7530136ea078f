//! World entities: one engine object plus the model and sensors riding on it.

use std::fmt;

use simbridge_core::Result;
use simbridge_core::catalog::ObjectType;
use simbridge_core::data::{CenterOfGravityOffset, Orientation, Pose, Position, Sentinel, UNSET};
use simbridge_core::error::{InputError, LifecycleError, SimbridgeError};
use simbridge_core::flat::{FlatVector, check_arity};
use simbridge_core::lifecycle::{Lifecycle, UnitStage};
use simbridge_core::types::SensorDetectability;
use simbridge_engine::Engine;
use simbridge_engine::handles::{ObjectHandle, UnitHandle};
use simbridge_model::{ModelId, ModelRegistry, ObjectBinding};
use simbridge_sensor::{SensorId, SensorRegistry};
use tracing::{debug, warn};

use crate::environment::Environment;

const UNIT: &str = "entity";

// ---------------------------------------------------------------------------
// EntitySetup
// ---------------------------------------------------------------------------

/// Initial placement and flags of an entity's object.
///
/// Pose and centre-of-gravity fields follow the unset convention: an unset
/// field keeps the engine's current value. The flags are always written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySetup {
    pub position: Position,
    pub orientation: Orientation,
    pub cog_offset: CenterOfGravityOffset,
    pub collision_detectable: bool,
    pub movable: bool,
    pub detectability: SensorDetectability,
}

impl Default for EntitySetup {
    fn default() -> Self {
        Self {
            position: Position::zeroed(),
            orientation: Orientation::zeroed(),
            cog_offset: CenterOfGravityOffset::zeroed(),
            collision_detectable: true,
            movable: true,
            detectability: SensorDetectability::Detectable,
        }
    }
}

impl EntitySetup {
    /// Setup at `pose`, everything else default.
    #[must_use]
    pub fn at(pose: Pose) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation,
            ..Self::default()
        }
    }

    /// Setup that leaves pose and centre of gravity untouched.
    #[must_use]
    pub fn keep_pose() -> Self {
        Self {
            position: Position::unset(),
            orientation: Orientation::unset(),
            cog_offset: CenterOfGravityOffset::unset(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_cog_offset(mut self, offset: CenterOfGravityOffset) -> Self {
        self.cog_offset = offset;
        self
    }

    #[must_use]
    pub const fn with_collision_detectable(mut self, value: bool) -> Self {
        self.collision_detectable = value;
        self
    }

    #[must_use]
    pub const fn with_movable(mut self, value: bool) -> Self {
        self.movable = value;
        self
    }

    #[must_use]
    pub const fn with_detectability(mut self, value: SensorDetectability) -> Self {
        self.detectability = value;
        self
    }

    #[must_use]
    pub const fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation: self.orientation,
        }
    }

    /// Push the setup onto `object`.
    fn apply(&self, engine: &mut dyn Engine, object: ObjectHandle) -> Result<()> {
        let patch = self.pose();
        if !patch.is_unset() {
            let pose = engine.object_pose(object)?.merged(&patch);
            engine.set_object_pose(object, &pose)?;
        }
        if !self.cog_offset.is_unset() {
            let offset = engine.cog_offset(object)?.merged(&self.cog_offset);
            engine.set_cog_offset(object, &offset)?;
        }
        engine.set_collision_detectable(object, self.collision_detectable)?;
        engine.set_movable(object, self.movable)?;
        engine.set_sensor_detectability(object, self.detectability)?;
        Ok(())
    }
}

fn flag(value: bool) -> f64 {
    f64::from(u8::from(value))
}

impl FlatVector for EntitySetup {
    const ARITY: usize = 12;
    const NAME: &'static str = "EntitySetup";

    #[allow(clippy::float_cmp)]
    fn from_flat(values: &[f64]) -> std::result::Result<Self, InputError> {
        check_arity(Self::NAME, Self::ARITY, values)?;
        Ok(Self {
            position: Position::from_flat(&values[0..3])?,
            orientation: Orientation::from_flat(&values[3..6])?,
            cog_offset: CenterOfGravityOffset::from_flat(&values[6..9])?,
            collision_detectable: values[9] != 0.0,
            movable: values[10] != 0.0,
            detectability: SensorDetectability::from_value(values[11]),
        })
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        self.position.write_flat(out);
        self.orientation.write_flat(out);
        self.cog_offset.write_flat(out);
        out.push(flag(self.collision_detectable));
        out.push(flag(self.movable));
        out.push(f64::from(self.detectability.code()));
    }
}

impl fmt::Display for EntitySetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntitySetup: (position: {}, orientation: {}, cog_offset: {}, \
             collision_detectable: {}, movable: {}, detectability: {:?})",
            self.position,
            self.orientation,
            self.cog_offset,
            self.collision_detectable,
            self.movable,
            self.detectability
        )
    }
}

// ---------------------------------------------------------------------------
// EntityState
// ---------------------------------------------------------------------------

/// State of an entity's object as read back at the last lifecycle call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub position: Position,
    pub orientation: Orientation,
    /// Scalar speed in m/s.
    pub velocity: f64,
    /// Yaw rate in rad/s.
    pub yaw_rate: f64,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            position: Position::unset(),
            orientation: Orientation::unset(),
            velocity: UNSET,
            yaw_rate: UNSET,
        }
    }
}

impl FlatVector for EntityState {
    const ARITY: usize = 8;
    const NAME: &'static str = "EntityState";

    fn from_flat(values: &[f64]) -> std::result::Result<Self, InputError> {
        check_arity(Self::NAME, Self::ARITY, values)?;
        Ok(Self {
            position: Position::from_flat(&values[0..3])?,
            orientation: Orientation::from_flat(&values[3..6])?,
            velocity: values[6],
            yaw_rate: values[7],
        })
    }

    fn write_flat(&self, out: &mut Vec<f64>) {
        self.position.write_flat(out);
        self.orientation.write_flat(out);
        out.push(self.velocity);
        out.push(self.yaw_rate);
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityState: (position: {}, orientation: {}, velocity: {}, yaw_rate: {})",
            self.position, self.orientation, self.velocity, self.yaw_rate
        )
    }
}

// ---------------------------------------------------------------------------
// LifecycleContext
// ---------------------------------------------------------------------------

/// Everything an entity needs to drive its model and sensors through one
/// lifecycle call.
pub struct LifecycleContext<'a> {
    pub engine: &'a mut dyn Engine,
    pub models: &'a mut ModelRegistry,
    pub sensors: &'a mut SensorRegistry,
}

impl fmt::Debug for LifecycleContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleContext")
            .field("engine", &self.engine.name())
            .field("models", &self.models.len())
            .field("sensors", &self.sensors.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A world object together with the model that drives it and the sensors
/// mounted on it.
///
/// ```text
/// Constructed --initialise_object--> Identified --register_unit--> Registered
///     --initialise--> Active --step*--> ... --terminate--> Terminated
/// ```
///
/// Models and sensors are referenced by id; the [`Environment`] owns them.
#[derive(Debug, Clone)]
pub struct Entity {
    object_type: ObjectType,
    setup: EntitySetup,
    name: Option<String>,
    object: Option<ObjectHandle>,
    model: Option<ModelId>,
    sensors: Vec<SensorId>,
    created_sensors: usize,
    lifecycle: Lifecycle,
    self_unit: Option<UnitHandle>,
    state: Option<EntityState>,
}

impl Entity {
    /// An entity whose object is created from `object_type` when it is added
    /// to an environment.
    #[must_use]
    pub fn new(object_type: ObjectType, setup: EntitySetup) -> Self {
        Self {
            object_type,
            setup,
            name: None,
            object: None,
            model: None,
            sensors: Vec::new(),
            created_sensors: 0,
            lifecycle: Lifecycle::new(UNIT),
            self_unit: None,
            state: None,
        }
    }

    /// An entity for an object already present in the scenario. Its setup is
    /// never pushed to the engine.
    #[must_use]
    pub fn pre_existing() -> Self {
        Self::new(ObjectType::Existing, EntitySetup::default())
    }

    /// Bind the pre-existing object `name` and add the entity to `env`.
    pub fn existing<'e>(name: &str, env: &'e mut Environment) -> Result<&'e mut Self> {
        env.add_existing_entity(name, Self::pre_existing())
    }

    /// Builder: the model driving this entity.
    #[must_use]
    pub const fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        self.object_type
    }

    #[must_use]
    pub const fn setup(&self) -> &EntitySetup {
        &self.setup
    }

    /// Engine-side object name, once identified.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn object(&self) -> Option<ObjectHandle> {
        self.object
    }

    #[must_use]
    pub const fn model(&self) -> Option<ModelId> {
        self.model
    }

    /// Mounted sensors in attachment order.
    pub fn sensors(&self) -> &[SensorId] {
        &self.sensors
    }

    #[must_use]
    pub const fn stage(&self) -> UnitStage {
        self.lifecycle.stage()
    }

    #[must_use]
    pub const fn is_identified(&self) -> bool {
        self.object.is_some()
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.lifecycle.is_registered()
    }

    /// State read back at the last lifecycle call.
    pub fn state(&self) -> Result<EntityState, LifecycleError> {
        self.state.ok_or(LifecycleError::NotRegistered { unit: UNIT })
    }

    fn require_object(&self) -> Result<ObjectHandle, LifecycleError> {
        self.object.ok_or(LifecycleError::NotIdentified { unit: UNIT })
    }

    fn label(&self) -> &str {
        self.name().unwrap_or("<unidentified>")
    }

    // -- Composition --

    /// Attach `model` to this entity. An identified entity links the model
    /// straight away.
    pub fn attach_model(&mut self, model: ModelId, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        if self.model.is_some() {
            return Err(LifecycleError::AlreadyLinked { unit: UNIT }.into());
        }
        if self.is_identified() {
            link_model(model, &*self, ctx)?;
        }
        self.model = Some(model);
        Ok(())
    }

    /// Mount `sensor`. It is created on the engine now if the entity is
    /// identified, otherwise during [`initialise_object`](Self::initialise_object).
    pub fn add_sensor(&mut self, sensor: SensorId, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        ctx.sensors.get(sensor)?;
        self.sensors.push(sensor);
        if self.is_identified() {
            self.create_pending_sensors(ctx)?;
        }
        Ok(())
    }

    fn unlink_model(&self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        let Some(id) = self.model else {
            return Ok(());
        };
        let model = ctx.models.get_mut(id)?;
        if model.core().stage().is_attached() {
            model.unlink()?;
        }
        Ok(())
    }

    /// Forget the created sensors. They are created afresh on the next
    /// identification.
    fn detach_sensors(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        for &id in &self.sensors[..self.created_sensors] {
            ctx.sensors.get_mut(id)?.detach()?;
        }
        self.created_sensors = 0;
        Ok(())
    }

    /// Create every sensor not yet created. Each gets the running index of
    /// its kind on this entity.
    fn create_pending_sensors(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        let object = self.require_object()?;
        while self.created_sensors < self.sensors.len() {
            let id = self.sensors[self.created_sensors];
            let kind = ctx.sensors.get(id)?.kind();
            let mut index = 0;
            for &earlier in &self.sensors[..self.created_sensors] {
                if ctx.sensors.get(earlier)?.kind() == kind {
                    index += 1;
                }
            }
            ctx.sensors
                .get_mut(id)?
                .create_sensor(ctx.engine, object, index)?;
            self.created_sensors += 1;
        }
        Ok(())
    }

    /// Replace the setup and push it to the engine.
    ///
    /// Pre-existing objects keep their scenario placement; the setup is only
    /// recorded.
    pub fn apply_setup(&mut self, setup: EntitySetup, engine: &mut dyn Engine) -> Result<()> {
        self.setup = setup;
        let object = self.require_object()?;
        if self.object_type.is_existing() {
            warn!(entity = self.label(), "setup not applied to pre-existing object");
            return Ok(());
        }
        self.setup.apply(engine, object)
    }

    /// Bind the entity to `object`. Happens once.
    ///
    /// Nothing is kept on failure: the entity stays unidentified, its model
    /// unlinked and its sensors uncreated.
    pub fn initialise_object(&mut self, object: ObjectHandle, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        if self.is_identified() {
            return Err(LifecycleError::AlreadyIdentified { unit: UNIT }.into());
        }
        let mut next = self.lifecycle;
        next.attach()?;
        let name = ctx.engine.object_name(object)?;
        if !self.object_type.is_existing() {
            self.setup.apply(ctx.engine, object)?;
        }

        self.object = Some(object);
        if let Some(id) = self.model {
            if let Err(err) = link_model(id, &*self, ctx) {
                self.object = None;
                return Err(err);
            }
        }
        if let Err(err) = self.create_pending_sensors(ctx) {
            self.rollback_identification(ctx);
            return Err(err);
        }
        self.name = Some(name);
        self.lifecycle = next;
        debug!(entity = self.label(), %object, sensors = self.sensors.len(), "entity identified");
        Ok(())
    }

    fn rollback_identification(&mut self, ctx: &mut LifecycleContext<'_>) {
        if let Err(err) = self.unlink_model(ctx).and_then(|()| self.detach_sensors(ctx)) {
            warn!(%err, "incomplete rollback of entity identification");
        }
        self.object = None;
    }

    /// Drop the engine-side bindings ahead of the object's removal: the model
    /// is unlinked and the sensors detached. A registered entity must be
    /// terminated first.
    pub fn release(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        if self.is_registered() {
            return Err(LifecycleError::AlreadyRegistered { unit: UNIT }.into());
        }
        self.unlink_model(ctx)?;
        self.detach_sensors(ctx)?;
        debug!(entity = self.label(), "entity released");
        Ok(())
    }

    // -- Lifecycle --

    fn refresh_state(&mut self, engine: &dyn Engine) -> Result<()> {
        let unit = self.self_unit.ok_or(LifecycleError::NotRegistered { unit: UNIT })?;
        let output = engine.self_sensor_output(unit)?;
        self.state = Some(EntityState {
            position: output.position,
            orientation: output.orientation,
            velocity: output.velocity,
            yaw_rate: output.yaw_rate,
        });
        Ok(())
    }

    pub fn register_unit(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        let object = self.require_object()?;
        let mut next = self.lifecycle;
        next.register()?;
        self.self_unit = Some(ctx.engine.register_self_sensor(object)?);
        self.lifecycle = next;
        self.refresh_state(ctx.engine)?;
        debug!(entity = self.label(), "entity registered");

        if let Some(id) = self.model {
            ctx.models.get_mut(id)?.register_unit(ctx.engine)?;
        }
        for &id in &self.sensors {
            ctx.sensors.get_mut(id)?.register_unit(ctx.engine)?;
        }
        Ok(())
    }

    pub fn initialise(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        self.lifecycle.initialise()?;
        self.refresh_state(ctx.engine)?;

        if let Some(id) = self.model {
            ctx.models.get_mut(id)?.initialise(ctx.engine)?;
        }
        for &id in &self.sensors {
            ctx.sensors.get_mut(id)?.initialise(ctx.engine)?;
        }
        Ok(())
    }

    pub fn step(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        self.lifecycle.step()?;
        self.refresh_state(ctx.engine)?;

        if let Some(id) = self.model {
            ctx.models.get_mut(id)?.step(ctx.engine)?;
        }
        for &id in &self.sensors {
            ctx.sensors.get_mut(id)?.step(ctx.engine)?;
        }
        Ok(())
    }

    /// Release the read-back unit, then the model and sensors. Every
    /// participant is attempted; the first failure is returned.
    pub fn terminate(&mut self, ctx: &mut LifecycleContext<'_>) -> Result<()> {
        self.lifecycle.terminate()?;
        let mut first: Option<SimbridgeError> = None;
        if let Some(unit) = self.self_unit.take() {
            if let Err(err) = ctx.engine.unregister_unit(unit) {
                first.get_or_insert(err.into());
            }
        }
        if let Some(id) = self.model {
            if let Err(err) = terminate_model(id, ctx) {
                first.get_or_insert(err);
            }
        }
        for &id in &self.sensors {
            if let Err(err) = terminate_sensor(id, ctx) {
                first.get_or_insert(err);
            }
        }
        debug!(entity = self.label(), "entity terminated");
        first.map_or(Ok(()), Err)
    }
}

/// Link model `id` to `binding` and create its engine-side parts. A model
/// whose creation fails is unlinked again.
pub(crate) fn link_model(
    id: ModelId,
    binding: &dyn ObjectBinding,
    ctx: &mut LifecycleContext<'_>,
) -> Result<()> {
    let model = ctx.models.get_mut(id)?;
    model.link_to(binding)?;
    if let Err(err) = model.create_if_not_exists(ctx.engine) {
        if let Err(unlink) = model.unlink() {
            warn!(%id, err = %unlink, "model left linked after failed creation");
        }
        return Err(err);
    }
    Ok(())
}

fn terminate_model(id: ModelId, ctx: &mut LifecycleContext<'_>) -> Result<()> {
    ctx.models.get_mut(id)?.terminate(ctx.engine)
}

fn terminate_sensor(id: SensorId, ctx: &mut LifecycleContext<'_>) -> Result<()> {
    ctx.sensors.get_mut(id)?.terminate(ctx.engine)
}

impl ObjectBinding for Entity {
    fn bound_object(&self) -> Option<ObjectHandle> {
        self.object
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}, type: {}", self.label(), self.object_type)?;
        if let Some(model) = self.model {
            write!(f, ", model: {model}")?;
        }
        write!(f, ", sensors: {})", self.sensors.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
