//! Opaque engine handles.
//!
//! Handles are plain integers minted by the engine. They carry no lifetime;
//! using a handle the engine no longer knows yields
//! [`EngineError::UnknownHandle`](simbridge_core::error::EngineError::UnknownHandle).

use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Handle kind used in error messages.
            pub const KIND: &'static str = $kind;

            #[must_use]
            pub const fn id(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($kind, "#{}"), self.0)
            }
        }
    };
}

handle! {
    /// A world object in the scenario.
    ObjectHandle, "object"
}

handle! {
    /// A sensor attached to a world object.
    SensorHandle, "sensor"
}

handle! {
    /// A per-tick unit bound for the duration of a simulation run.
    UnitHandle, "unit"
}

handle! {
    /// A fitted path.
    PathHandle, "path"
}

handle! {
    /// A speed profile.
    SpeedProfileHandle, "speed profile"
}

handle! {
    /// A road.
    RoadHandle, "road"
}

handle! {
    /// A viewer window.
    ViewerHandle, "viewer"
}

/// A path paired with a speed profile and attached to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trajectory {
    pub path: PathHandle,
    pub speed_profile: SpeedProfileHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind() {
        assert_eq!(ObjectHandle(3).to_string(), "object#3");
        assert_eq!(SpeedProfileHandle(1).to_string(), "speed profile#1");
    }

    #[test]
    fn handles_order_by_id() {
        assert!(UnitHandle(1) < UnitHandle(2));
        assert_eq!(SensorHandle(7).id(), 7);
    }
}
