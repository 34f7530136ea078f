//! The [`EntityModel`] trait and the state every model shares.
//!
//! A model drives one world object. Its lifecycle is
//!
//! ```text
//! Unbound --link--> Linked --register_unit--> Registered --initialise--> Active
//!                                                  |                        |
//!                                                  +------terminate---------+
//! ```
//!
//! and is tracked by a [`Lifecycle`] inside [`ModelCore`]. An inactive model
//! accepts every lifecycle call once linked but never touches the engine.

use std::any::Any;
use std::fmt;

use simbridge_core::Result;
use simbridge_core::error::{InputError, LifecycleError};
use simbridge_core::lifecycle::{Lifecycle, UnitStage};
use simbridge_engine::Engine;
use simbridge_engine::handles::{ObjectHandle, UnitHandle};
use tracing::debug;

const UNIT: &str = "model";

// ---------------------------------------------------------------------------
// ObjectBinding
// ---------------------------------------------------------------------------

/// Anything that may be bound to a world object, used by
/// [`EntityModel::link_to`].
pub trait ObjectBinding {
    /// The bound object, if identification has happened.
    fn bound_object(&self) -> Option<ObjectHandle>;
}

impl ObjectBinding for ObjectHandle {
    fn bound_object(&self) -> Option<ObjectHandle> {
        Some(*self)
    }
}

// ---------------------------------------------------------------------------
// ModelCore
// ---------------------------------------------------------------------------

/// Linkage, flags and the state-actuator unit shared by every model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCore {
    lifecycle: Lifecycle,
    existing: bool,
    active: bool,
    created: bool,
    object: Option<ObjectHandle>,
    actuator: Option<UnitHandle>,
}

impl ModelCore {
    #[must_use]
    pub const fn new(existing: bool, active: bool) -> Self {
        Self {
            lifecycle: Lifecycle::new(UNIT),
            existing,
            active,
            created: false,
            object: None,
            actuator: None,
        }
    }

    /// Whether the backing engine state already exists in the scenario.
    #[must_use]
    pub const fn is_existing(&self) -> bool {
        self.existing
    }

    /// Whether the model takes part in the simulation.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn stage(&self) -> UnitStage {
        self.lifecycle.stage()
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.lifecycle.is_registered()
    }

    /// Record the driven object.
    pub fn link(&mut self, object: ObjectHandle) -> Result<(), LifecycleError> {
        self.lifecycle.attach()?;
        self.object = Some(object);
        Ok(())
    }

    /// Forget the linked object so the model can be linked again. Fails
    /// while registered.
    pub fn unlink(&mut self) -> Result<(), LifecycleError> {
        self.lifecycle.detach()?;
        self.object = None;
        self.created = false;
        Ok(())
    }

    /// The linked object.
    pub fn object(&self) -> Result<ObjectHandle, LifecycleError> {
        self.object.ok_or(LifecycleError::NotLinked { unit: UNIT })
    }

    /// Returns `true` exactly once for a linked, non-existing model: the
    /// caller should then create the backing engine state.
    pub fn claim_creation(&mut self) -> Result<bool, LifecycleError> {
        if self.existing {
            return Ok(false);
        }
        self.lifecycle.require_attached()?;
        if self.created {
            return Ok(false);
        }
        self.created = true;
        Ok(true)
    }

    /// Bind the state actuator of the linked object. Returns `false` for an
    /// inactive model, which binds nothing.
    pub fn register(&mut self, engine: &mut dyn Engine) -> Result<bool> {
        self.lifecycle.require_attached()?;
        if !self.active {
            return Ok(false);
        }
        let mut next = self.lifecycle;
        next.register()?;
        let object = self.object()?;
        let unit = engine.register_state_actuator(object)?;
        debug!(%object, %unit, "model registered");
        self.actuator = Some(unit);
        self.lifecycle = next;
        Ok(true)
    }

    /// The bound state actuator.
    pub fn actuator(&self) -> Result<UnitHandle, LifecycleError> {
        self.actuator.ok_or(LifecycleError::NotRegistered { unit: UNIT })
    }

    /// Validate an initialise call. `false` means the model is inactive.
    pub fn begin_initialise(&mut self) -> Result<bool, LifecycleError> {
        if !self.active {
            return Ok(false);
        }
        self.lifecycle.initialise()?;
        debug_assert!(self.actuator.is_some(), "registered model without actuator");
        Ok(true)
    }

    /// Validate a step call. `false` means the model is inactive.
    pub fn begin_step(&self) -> Result<bool, LifecycleError> {
        if !self.active {
            return Ok(false);
        }
        self.lifecycle.step()?;
        debug_assert!(self.actuator.is_some(), "registered model without actuator");
        Ok(true)
    }

    /// Release the state actuator. `false` means the model is inactive.
    pub fn release(&mut self, engine: &mut dyn Engine) -> Result<bool> {
        if !self.active {
            return Ok(false);
        }
        self.lifecycle.terminate()?;
        if let Some(unit) = self.actuator.take() {
            engine.unregister_unit(unit)?;
        }
        debug!("model terminated");
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// EntityModel
// ---------------------------------------------------------------------------

/// Behaviour that applies control input to an entity's physical state each
/// tick.
///
/// Implementors provide the flat-input handling, [`apply`](Self::apply) and
/// access to their [`ModelCore`]; the lifecycle methods have default
/// implementations that variants extend when they bind extra units.
pub trait EntityModel: fmt::Debug + Send + 'static {
    /// Human-readable model name.
    fn name(&self) -> &'static str;

    fn core(&self) -> &ModelCore;

    fn core_mut(&mut self) -> &mut ModelCore;

    /// Number of values in the flat input vector.
    fn input_arity(&self) -> usize;

    /// Replace the input from a flat vector.
    fn set_flat_input(&mut self, values: &[f64]) -> Result<(), InputError>;

    /// Merge a flat vector into the input, skipping unset values.
    fn update_flat_input(&mut self, values: &[f64]) -> Result<(), InputError>;

    /// The current input as a flat vector.
    fn flat_input(&self) -> Vec<f64>;

    /// Push the current input into the bound engine units.
    fn apply(&mut self, engine: &mut dyn Engine) -> Result<()>;

    /// Record the driven object.
    fn link_entity(&mut self, object: ObjectHandle) -> Result<(), LifecycleError> {
        self.core_mut().link(object)
    }

    /// Link to whatever `binding` is bound to. Fails if it is not bound yet.
    fn link_to(&mut self, binding: &dyn ObjectBinding) -> Result<(), LifecycleError> {
        let object = binding
            .bound_object()
            .ok_or(LifecycleError::NotIdentified { unit: "entity" })?;
        self.link_entity(object)
    }

    /// Drop the link to the driven object, e.g. after it was deleted.
    fn unlink(&mut self) -> Result<(), LifecycleError> {
        self.core_mut().unlink()
    }

    /// Create the backing engine state once. No-op for existing models.
    fn create_if_not_exists(&mut self, _engine: &mut dyn Engine) -> Result<()> {
        self.core_mut().claim_creation()?;
        Ok(())
    }

    fn register_unit(&mut self, engine: &mut dyn Engine) -> Result<()> {
        self.core_mut().register(engine)?;
        Ok(())
    }

    fn initialise(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if self.core_mut().begin_initialise()? {
            self.apply(engine)?;
        }
        Ok(())
    }

    fn step(&mut self, engine: &mut dyn Engine) -> Result<()> {
        if self.core().begin_step()? {
            self.apply(engine)?;
        }
        Ok(())
    }

    fn terminate(&mut self, engine: &mut dyn Engine) -> Result<()> {
        self.core_mut().release(engine)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use simbridge_engine::HeadlessEngine;

    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _accepts_boxed(_: Box<dyn EntityModel>) {}
    }

    #[test]
    fn trait_is_send() {
        fn _assert_send<T: Send>() {}
        _assert_send::<Box<dyn EntityModel>>();
    }

    #[test]
    fn link_twice_fails() {
        let mut core = ModelCore::new(false, true);
        core.link(ObjectHandle(1)).unwrap();
        assert_eq!(
            core.link(ObjectHandle(2)),
            Err(LifecycleError::AlreadyLinked { unit: "model" })
        );
        assert_eq!(core.object(), Ok(ObjectHandle(1)));
    }

    #[test]
    fn creation_is_claimed_once() {
        let mut core = ModelCore::new(false, true);
        assert!(core.claim_creation().is_err());
        core.link(ObjectHandle(1)).unwrap();
        assert_eq!(core.claim_creation(), Ok(true));
        assert_eq!(core.claim_creation(), Ok(false));
    }

    #[test]
    fn unlink_allows_a_new_link() {
        let mut engine = HeadlessEngine::new();
        let mut core = ModelCore::new(false, true);
        assert_eq!(core.unlink(), Err(LifecycleError::NotLinked { unit: "model" }));
        core.link(ObjectHandle(1)).unwrap();
        assert_eq!(core.claim_creation(), Ok(true));
        core.unlink().unwrap();
        assert!(core.object().is_err());

        let object = engine.create_object("Box").unwrap();
        core.link(object).unwrap();
        assert_eq!(core.claim_creation(), Ok(true));
        core.register(&mut engine).unwrap();
        assert_eq!(
            core.unlink(),
            Err(LifecycleError::AlreadyRegistered { unit: "model" })
        );
    }

    #[test]
    fn existing_model_never_creates() {
        let mut core = ModelCore::new(true, true);
        assert_eq!(core.claim_creation(), Ok(false));
    }

    #[test]
    fn register_binds_actuator() {
        let mut engine = HeadlessEngine::new();
        let object = engine.create_object("Box").unwrap();
        let mut core = ModelCore::new(false, true);
        core.link(object).unwrap();
        assert!(core.register(&mut engine).unwrap());
        assert!(core.actuator().is_ok());
        assert!(core.register(&mut engine).is_err());
        assert_eq!(engine.unit_count(), 1);
    }

    #[test]
    fn inactive_model_binds_nothing() {
        let mut engine = HeadlessEngine::new();
        let object = engine.create_object("Box").unwrap();
        let mut core = ModelCore::new(false, false);
        core.link(object).unwrap();
        assert!(!core.register(&mut engine).unwrap());
        assert!(!core.begin_step().unwrap());
        assert!(!core.release(&mut engine).unwrap());
        assert_eq!(engine.unit_count(), 0);
    }

    #[test]
    fn release_before_register_fails() {
        let mut engine = HeadlessEngine::new();
        let mut core = ModelCore::new(false, true);
        core.link(ObjectHandle(1)).unwrap();
        assert!(core.release(&mut engine).is_err());
    }

    #[test]
    fn link_to_unbound_fails() {
        struct Unbound;
        impl ObjectBinding for Unbound {
            fn bound_object(&self) -> Option<ObjectHandle> {
                None
            }
        }
        let mut model = crate::CustomDynamicalModel::default();
        assert_eq!(
            model.link_to(&Unbound),
            Err(LifecycleError::NotIdentified { unit: "entity" })
        );
        model.link_to(&ObjectHandle(4)).unwrap();
        assert_eq!(model.core().object(), Ok(ObjectHandle(4)));
    }
}
