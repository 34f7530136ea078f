//! Phase tracking shared by models, sensors and entities.
//!
//! [`Lifecycle`] holds the current [`UnitStage`] and validates every phase
//! call against it:
//!
//! ```text
//! Detached --attach--> Attached --register--> Registered --initialise--> Active
//!                          ^                      |                        |
//!                          |                      +------terminate---------+
//!                          |                                 |
//!                          +---------- register <------- Terminated
//! ```
//!
//! A terminated unit may be registered again; its attachment survives.

use crate::error::LifecycleError;

/// Where a unit is in its register/initialise/step/terminate lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitStage {
    /// No world object known yet.
    #[default]
    Detached,
    /// World object known, no per-tick handle bound.
    Attached,
    /// Per-tick handle bound.
    Registered,
    /// Initialised and receiving step calls.
    Active,
    /// Handles released.
    Terminated,
}

impl UnitStage {
    #[must_use]
    pub const fn is_attached(self) -> bool {
        !matches!(self, Self::Detached)
    }

    #[must_use]
    pub const fn is_registered(self) -> bool {
        matches!(self, Self::Registered | Self::Active)
    }
}

/// Validated stage transitions for one unit.
///
/// # Example
///
/// ```
/// use simbridge_core::lifecycle::{Lifecycle, UnitStage};
///
/// let mut lc = Lifecycle::new("model");
/// lc.attach().unwrap();
/// lc.register().unwrap();
/// assert!(lc.register().is_err());
/// lc.terminate().unwrap();
/// assert_eq!(lc.stage(), UnitStage::Terminated);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifecycle {
    unit: &'static str,
    stage: UnitStage,
}

impl Lifecycle {
    #[must_use]
    pub const fn new(unit: &'static str) -> Self {
        Self {
            unit,
            stage: UnitStage::Detached,
        }
    }

    #[must_use]
    pub const fn unit(&self) -> &'static str {
        self.unit
    }

    #[must_use]
    pub const fn stage(&self) -> UnitStage {
        self.stage
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.stage.is_attached()
    }

    #[must_use]
    pub const fn is_registered(&self) -> bool {
        self.stage.is_registered()
    }

    /// `Detached -> Attached`.
    pub const fn attach(&mut self) -> Result<(), LifecycleError> {
        if self.stage.is_attached() {
            return Err(LifecycleError::AlreadyLinked { unit: self.unit });
        }
        self.stage = UnitStage::Attached;
        Ok(())
    }

    /// Fails unless a world object is known.
    pub const fn require_attached(&self) -> Result<(), LifecycleError> {
        if self.stage.is_attached() {
            Ok(())
        } else {
            Err(LifecycleError::NotLinked { unit: self.unit })
        }
    }

    /// `Attached | Terminated -> Registered`.
    pub const fn register(&mut self) -> Result<(), LifecycleError> {
        match self.stage {
            UnitStage::Detached => Err(LifecycleError::NotLinked { unit: self.unit }),
            UnitStage::Registered | UnitStage::Active => {
                Err(LifecycleError::AlreadyRegistered { unit: self.unit })
            }
            UnitStage::Attached | UnitStage::Terminated => {
                self.stage = UnitStage::Registered;
                Ok(())
            }
        }
    }

    /// `Attached | Terminated -> Detached`. A registered unit must be
    /// terminated first.
    pub const fn detach(&mut self) -> Result<(), LifecycleError> {
        match self.stage {
            UnitStage::Detached => Err(LifecycleError::NotLinked { unit: self.unit }),
            UnitStage::Registered | UnitStage::Active => {
                Err(LifecycleError::AlreadyRegistered { unit: self.unit })
            }
            UnitStage::Attached | UnitStage::Terminated => {
                self.stage = UnitStage::Detached;
                Ok(())
            }
        }
    }

    /// `Registered | Active -> Active`.
    pub fn initialise(&mut self) -> Result<(), LifecycleError> {
        self.require_registered()?;
        self.stage = UnitStage::Active;
        Ok(())
    }

    /// Validates a step call; the stage does not change.
    pub const fn step(&self) -> Result<(), LifecycleError> {
        self.require_registered()
    }

    /// `Registered | Active -> Terminated`.
    pub fn terminate(&mut self) -> Result<(), LifecycleError> {
        self.require_registered()?;
        self.stage = UnitStage::Terminated;
        Ok(())
    }

    const fn require_registered(&self) -> Result<(), LifecycleError> {
        match self.stage {
            UnitStage::Registered | UnitStage::Active => Ok(()),
            UnitStage::Terminated => Err(LifecycleError::Terminated { unit: self.unit }),
            UnitStage::Detached | UnitStage::Attached => {
                Err(LifecycleError::NotRegistered { unit: self.unit })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> Lifecycle {
        let mut lc = Lifecycle::new("sensor");
        lc.attach().unwrap();
        lc.register().unwrap();
        lc
    }

    #[test]
    fn new_starts_detached() {
        let lc = Lifecycle::new("model");
        assert_eq!(lc.stage(), UnitStage::Detached);
        assert_eq!(lc.unit(), "model");
        assert!(!lc.is_attached());
    }

    #[test]
    fn attach_twice_fails() {
        let mut lc = Lifecycle::new("model");
        lc.attach().unwrap();
        assert_eq!(
            lc.attach(),
            Err(LifecycleError::AlreadyLinked { unit: "model" })
        );
    }

    #[test]
    fn register_requires_attach() {
        let mut lc = Lifecycle::new("model");
        assert_eq!(lc.register(), Err(LifecycleError::NotLinked { unit: "model" }));
    }

    #[test]
    fn register_twice_fails() {
        let mut lc = registered();
        assert_eq!(
            lc.register(),
            Err(LifecycleError::AlreadyRegistered { unit: "sensor" })
        );
    }

    #[test]
    fn step_before_register_fails() {
        let mut lc = Lifecycle::new("entity");
        lc.attach().unwrap();
        assert_eq!(lc.step(), Err(LifecycleError::NotRegistered { unit: "entity" }));
        assert!(lc.initialise().is_err());
    }

    #[test]
    fn terminate_before_register_fails() {
        let mut lc = Lifecycle::new("model");
        lc.attach().unwrap();
        assert!(lc.terminate().is_err());
    }

    #[test]
    fn full_cycle() {
        let mut lc = registered();
        lc.initialise().unwrap();
        assert_eq!(lc.stage(), UnitStage::Active);
        lc.step().unwrap();
        lc.terminate().unwrap();
        assert_eq!(lc.step(), Err(LifecycleError::Terminated { unit: "sensor" }));
        assert!(lc.terminate().is_err());
    }

    #[test]
    fn terminated_can_register_again() {
        let mut lc = registered();
        lc.terminate().unwrap();
        lc.register().unwrap();
        assert!(lc.is_registered());
        assert!(lc.is_attached());
    }

    #[test]
    fn detach_returns_to_detached() {
        let mut lc = Lifecycle::new("model");
        lc.attach().unwrap();
        lc.detach().unwrap();
        assert_eq!(lc.stage(), UnitStage::Detached);
        lc.attach().unwrap();

        let mut lc = registered();
        assert_eq!(
            lc.detach(),
            Err(LifecycleError::AlreadyRegistered { unit: "sensor" })
        );
        lc.terminate().unwrap();
        lc.detach().unwrap();
        assert_eq!(lc.detach(), Err(LifecycleError::NotLinked { unit: "sensor" }));
    }
}
