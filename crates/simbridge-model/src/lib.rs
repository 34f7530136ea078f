// simbridge-model: Entity models that turn control input into the physical
// state the engine imposes on a world object each tick.
//
// Three variants implement [`EntityModel`]: kinematic state written directly
// ([`CustomDynamicalModel`]), driver controls through vehicle dynamics
// ([`AmesimDynamicalModel`]) and path following ([`TrackModel`]).

pub mod amesim;
pub mod custom;
pub mod model;
pub mod registry;
pub mod track;

pub use amesim::{AmesimDynamicalModel, AmesimDynamicalModelInput, AmesimDynamicalModelSetup};
pub use custom::{CustomDynamicalModel, CustomDynamicalModelInput, CustomDynamicalModelSetup};
pub use model::{EntityModel, ModelCore, ObjectBinding};
pub use registry::{ModelId, ModelRegistry};
pub use track::{TrackModel, TrackModelInput, TrackModelSetup};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        amesim::{AmesimDynamicalModel, AmesimDynamicalModelInput, AmesimDynamicalModelSetup},
        custom::{CustomDynamicalModel, CustomDynamicalModelInput, CustomDynamicalModelSetup},
        model::{EntityModel, ModelCore, ObjectBinding},
        registry::{ModelId, ModelRegistry},
        track::{TrackModel, TrackModelInput, TrackModelSetup},
    };
}
