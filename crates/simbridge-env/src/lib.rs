// simbridge-env: Entities and the environment that owns them.
//
// An [`Environment`] holds the engine handle, the entities placed in the
// scenario and the registries of models and sensors they reference. It also
// carries the order-independent scenario settings: roads, weather, sky and
// scheduler.

pub mod entity;
pub mod environment;
pub mod road;

pub use entity::{Entity, EntitySetup, EntityState, LifecycleContext};
pub use environment::Environment;
pub use road::Road;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        entity::{Entity, EntitySetup, EntityState, LifecycleContext},
        environment::Environment,
        road::Road,
    };
}
