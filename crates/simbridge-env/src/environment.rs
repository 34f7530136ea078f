//! The scenario: engine handle, entities, and the model and sensor registries.

use std::path::Path;

use simbridge_core::Result;
use simbridge_core::config::{ScenarioConfig, SchedulerConfig};
use simbridge_core::error::{ConfigError, LifecycleError, ResourceError};
use simbridge_core::types::{LogLevel, SkyLightPollution, SkyType, WeatherType};
use simbridge_engine::Engine;
use simbridge_engine::handles::{RoadHandle, ViewerHandle};
use simbridge_engine::io::{Precipitation, WeatherSettings};
use simbridge_model::{EntityModel, ModelId, ModelRegistry};
use simbridge_sensor::{Sensor, SensorId, SensorRegistry};
use tracing::{debug, info, warn};

use crate::entity::{self, Entity, LifecycleContext};
use crate::road::Road;

/// Owns the engine and everything placed in the scenario.
///
/// Entities keep insertion order and are addressed by their engine-side
/// object name. Models and sensors live in registries and are referenced by
/// id. Standalone models are driven by the simulation without an entity.
///
/// # Example
///
/// ```
/// use simbridge_core::catalog::ObjectType;
/// use simbridge_engine::HeadlessEngine;
/// use simbridge_env::{Entity, EntitySetup, Environment};
///
/// let mut env = Environment::new(HeadlessEngine::new());
/// let name = env
///     .add_entity(Entity::new(ObjectType::AudiA3, EntitySetup::default()))
///     .unwrap();
/// assert_eq!(name, "Audi_A3_1");
/// assert!(env.entity(&name).is_some());
/// ```
pub struct Environment {
    engine: Box<dyn Engine>,
    entities: Vec<Entity>,
    models: ModelRegistry,
    sensors: SensorRegistry,
    standalone: Vec<ModelId>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("engine", &self.engine.name())
            .field("entities", &self.entities.len())
            .field("models", &self.models.len())
            .field("sensors", &self.sensors.len())
            .field("standalone", &self.standalone)
            .finish()
    }
}

impl Environment {
    pub fn new(engine: impl Engine) -> Self {
        Self::from_boxed(Box::new(engine))
    }

    pub fn from_boxed(engine: Box<dyn Engine>) -> Self {
        Self {
            engine,
            entities: Vec::new(),
            models: ModelRegistry::new(),
            sensors: SensorRegistry::new(),
            standalone: Vec::new(),
        }
    }

    /// Load a previously saved scenario into `engine`. Its objects become
    /// available to [`add_existing_entity`](Self::add_existing_entity).
    pub fn from_file(engine: impl Engine, path: impl AsRef<Path>) -> Result<Self> {
        let mut env = Self::new(engine);
        let path = path.as_ref();
        env.engine.load(path)?;
        info!(path = %path.display(), "scenario loaded");
        Ok(env)
    }

    pub fn engine(&self) -> &dyn Engine {
        &*self.engine
    }

    pub fn engine_mut(&mut self) -> &mut dyn Engine {
        &mut *self.engine
    }

    /// The engine as its concrete type.
    pub fn engine_as<E: Engine>(&self) -> Option<&E> {
        self.engine.as_any().downcast_ref::<E>()
    }

    pub fn engine_as_mut<E: Engine>(&mut self) -> Option<&mut E> {
        self.engine.as_any_mut().downcast_mut::<E>()
    }

    /// Entities, the standalone model ids and a context over the engine and
    /// registries, borrowed together for one lifecycle pass.
    pub fn lifecycle_parts(&mut self) -> (&mut [Entity], &[ModelId], LifecycleContext<'_>) {
        let Self {
            engine,
            entities,
            models,
            sensors,
            standalone,
        } = self;
        (
            entities.as_mut_slice(),
            standalone.as_slice(),
            LifecycleContext {
                engine: &mut **engine,
                models,
                sensors,
            },
        )
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name() == Some(name))
    }

    /// A model drives at most one participant: one entity, or the
    /// simulation as a standalone model.
    fn check_model_free(&self, id: ModelId) -> Result<()> {
        self.models.get(id)?;
        let attached = self.entities.iter().any(|e| e.model() == Some(id));
        if attached || self.standalone.contains(&id) {
            return Err(ResourceError::ModelInUse(id.0).into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Create the entity's object from its catalog type and add it. Returns
    /// the engine-side object name.
    ///
    /// Re-adding an identified entity whose name is already present does
    /// nothing.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<String> {
        let Some(type_name) = entity.object_type().type_name() else {
            return Err(ResourceError::PreExistingType.into());
        };
        if let Some(name) = entity.name() {
            if self.position(name).is_some() {
                warn!(entity = name, "entity already present, add ignored");
                return Ok(name.to_owned());
            }
        }
        if let Some(id) = entity.model() {
            self.check_model_free(id)?;
        }
        if !entity.is_identified() {
            let object = self.engine.create_object(type_name)?;
            let (_, _, mut ctx) = self.lifecycle_parts();
            if let Err(err) = entity.initialise_object(object, &mut ctx) {
                if let Err(cleanup) = self.engine.remove_object(object) {
                    warn!(%object, err = %cleanup, "object of rejected entity not removed");
                }
                return Err(err);
            }
        }
        let name = entity.name().unwrap_or_default().to_owned();
        info!(entity = %name, "entity added");
        self.entities.push(entity);
        Ok(name)
    }

    /// Bind `entity` to the scenario object `name` and add it. The entity's
    /// setup is not applied.
    pub fn add_existing_entity(&mut self, name: &str, mut entity: Entity) -> Result<&mut Entity> {
        if !entity.object_type().is_existing() {
            return Err(ResourceError::NotPreExistingType.into());
        }
        let index = if let Some(index) = self.position(name) {
            warn!(entity = name, "entity already present, add ignored");
            index
        } else {
            if let Some(id) = entity.model() {
                self.check_model_free(id)?;
            }
            let object = self
                .engine
                .find_object(name)
                .ok_or_else(|| ResourceError::ObjectNotFound(name.to_owned()))?;
            let (_, _, mut ctx) = self.lifecycle_parts();
            entity.initialise_object(object, &mut ctx)?;
            info!(entity = name, "existing entity added");
            self.entities.push(entity);
            self.entities.len() - 1
        };
        Ok(&mut self.entities[index])
    }

    /// Remove the entity and delete its object. Unknown names are ignored.
    ///
    /// The entity's model is unlinked and its sensors detached, so both can
    /// be reused. Standalone models linked to the object are unlinked too.
    /// Registered participants must be terminated first.
    pub fn remove_entity(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.position(name) else {
            debug!(entity = name, "remove ignored, no such entity");
            return Ok(());
        };
        let object = self.entities[index].object();
        let linked: Vec<ModelId> = self
            .standalone
            .iter()
            .copied()
            .filter(|&id| {
                self.models
                    .get(id)
                    .is_ok_and(|m| object.is_some() && m.core().object().ok() == object)
            })
            .collect();
        for &id in &linked {
            let model = self.models.get(id)?;
            if model.core().is_registered() {
                return Err(LifecycleError::AlreadyRegistered { unit: model.name() }.into());
            }
        }

        let (entities, _, mut ctx) = self.lifecycle_parts();
        entities[index].release(&mut ctx)?;
        for &id in &linked {
            ctx.models.get_mut(id)?.unlink()?;
            warn!(model = %id, entity = name, "standalone model unlinked from removed entity");
        }
        let entity = self.entities.remove(index);
        if let Some(object) = entity.object() {
            self.engine.remove_object(object)?;
        }
        info!(entity = name, "entity removed");
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == Some(name))
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name() == Some(name))
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn entity_index(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| ResourceError::EntityNotFound(name.to_owned()).into())
    }

    // -----------------------------------------------------------------------
    // Models
    // -----------------------------------------------------------------------

    /// Register a model for use by an entity (see [`Entity::with_model`]).
    pub fn insert_model(&mut self, model: impl EntityModel) -> ModelId {
        self.models.insert(Box::new(model))
    }

    /// Register a standalone model, driven by the simulation after every
    /// entity. Link it with [`link_model`](Self::link_model).
    pub fn add_model(&mut self, model: impl EntityModel) -> ModelId {
        let id = self.insert_model(model);
        self.standalone.push(id);
        id
    }

    /// Link model `id` to the object of entity `name` and create its engine
    /// state.
    pub fn link_model(&mut self, id: ModelId, name: &str) -> Result<()> {
        let index = self.entity_index(name)?;
        if self.entities.iter().any(|e| e.model() == Some(id)) {
            return Err(ResourceError::ModelInUse(id.0).into());
        }
        let (entities, _, mut ctx) = self.lifecycle_parts();
        entity::link_model(id, &entities[index], &mut ctx)?;
        debug!(model = %id, entity = name, "model linked");
        Ok(())
    }

    /// Make model `id` the model of entity `name`. The model must not drive
    /// another entity or be standalone.
    pub fn attach_model(&mut self, name: &str, id: ModelId) -> Result<()> {
        let index = self.entity_index(name)?;
        self.check_model_free(id)?;
        let (entities, _, mut ctx) = self.lifecycle_parts();
        entities[index].attach_model(id, &mut ctx)
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelRegistry {
        &mut self.models
    }

    /// Standalone model ids in insertion order.
    pub fn standalone_models(&self) -> &[ModelId] {
        &self.standalone
    }

    pub fn model<T: EntityModel>(&self, id: ModelId) -> Result<&T> {
        Ok(self.models.get_as::<T>(id)?)
    }

    pub fn model_mut<T: EntityModel>(&mut self, id: ModelId) -> Result<&mut T> {
        Ok(self.models.get_as_mut::<T>(id)?)
    }

    // -----------------------------------------------------------------------
    // Sensors
    // -----------------------------------------------------------------------

    /// Register a sensor without mounting it.
    pub fn insert_sensor(&mut self, sensor: Sensor) -> SensorId {
        self.sensors.insert(sensor)
    }

    /// Register `sensor` and mount it on entity `name`.
    pub fn add_sensor_to(&mut self, name: &str, sensor: Sensor) -> Result<SensorId> {
        let index = self.entity_index(name)?;
        let id = self.sensors.insert(sensor);
        let (entities, _, mut ctx) = self.lifecycle_parts();
        entities[index].add_sensor(id, &mut ctx)?;
        Ok(id)
    }

    pub fn sensor(&self, id: SensorId) -> Result<&Sensor> {
        Ok(self.sensors.get(id)?)
    }

    pub fn sensors(&self) -> &SensorRegistry {
        &self.sensors
    }

    // -----------------------------------------------------------------------
    // Scenario
    // -----------------------------------------------------------------------

    pub fn add_road(&mut self, road: &Road) -> Result<RoadHandle> {
        let handle = self.engine.add_road(road.description())?;
        info!(length = road.length(), "road added");
        Ok(handle)
    }

    /// Import an OpenDRIVE network. The scenario must not contain roads yet.
    pub fn import_open_drive_network(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.engine.has_roads() {
            return Err(ResourceError::RoadAlreadyPresent.into());
        }
        let failed = |reason: String| ResourceError::NetworkImport {
            path: path.display().to_string(),
            reason,
        };
        if !path.is_file() {
            return Err(failed("file not found".to_owned()).into());
        }
        self.engine
            .import_open_drive(path)
            .map_err(|err| failed(err.to_string()))?;
        info!(path = %path.display(), "road network imported");
        Ok(())
    }

    /// A negative `fog_visibility` disables fog.
    pub fn set_weather(&mut self, weather: WeatherType, fog_visibility: f64) {
        let precipitation = match weather {
            WeatherType::Sunny => Precipitation::Disabled,
            WeatherType::Rainy => Precipitation::Rain,
            WeatherType::Snowy => Precipitation::Snow,
        };
        let fog_visibility = (fog_visibility >= 0.0).then_some(fog_visibility);
        self.engine.set_weather(WeatherSettings {
            precipitation,
            fog_visibility,
        });
        debug!(?weather, ?fog_visibility, "weather set");
    }

    pub fn set_sky(&mut self, sky: SkyType, light_pollution: SkyLightPollution) {
        self.engine.set_sky(sky, light_pollution);
        debug!(?sky, ?light_pollution, "sky set");
    }

    pub fn set_scheduler_frequencies(
        &mut self,
        simulation_frequency: f64,
        integration_frequency: f64,
    ) -> Result<(), ConfigError> {
        let current = self.engine.scheduler();
        SchedulerConfig {
            simulation_frequency,
            integration_frequency,
            speed: current.speed,
            ignore_frame_overrun: current.ignore_frame_overrun,
        }
        .validate()?;
        self.engine
            .set_scheduler_frequencies(simulation_frequency, integration_frequency);
        debug!(simulation_frequency, integration_frequency, "scheduler frequencies set");
        Ok(())
    }

    /// `speed` is the wall-clock pacing factor; 1.0 is real time.
    pub fn set_scheduler_speed(&mut self, speed: f64, ignore_frame_overrun: bool) -> Result<(), ConfigError> {
        if speed <= 0.0 || speed.is_nan() {
            return Err(ConfigError::InvalidSpeed(speed));
        }
        self.engine.set_scheduler_speed(speed, ignore_frame_overrun);
        Ok(())
    }

    /// Push every section of `config` to the engine.
    pub fn apply_config(&mut self, config: &ScenarioConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let scheduler = &config.scheduler;
        self.set_scheduler_frequencies(scheduler.simulation_frequency, scheduler.integration_frequency)?;
        self.set_scheduler_speed(scheduler.speed, scheduler.ignore_frame_overrun)?;
        self.set_weather(config.weather.kind, config.weather.fog_visibility);
        self.set_sky(config.sky.kind, config.sky.light_pollution);
        info!("scenario config applied");
        Ok(())
    }

    pub fn add_free_viewer(&mut self) -> ViewerHandle {
        self.engine.add_free_viewer()
    }

    pub fn remove_all_viewers(&mut self) {
        self.engine.remove_all_viewers();
    }

    pub fn save_experiment(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.engine.save(path)?;
        info!(path = %path.display(), "scenario saved");
        Ok(())
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.engine.set_log_level(level);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
