//! Record of the scenario-mutating calls a [`HeadlessEngine`](super::HeadlessEngine) received.

use simbridge_core::types::SensorType;

use crate::handles::{ObjectHandle, SensorHandle, UnitHandle};

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    CreateObject { type_name: String, object: ObjectHandle },
    RemoveObject { object: ObjectHandle },
    SetObjectPose { object: ObjectHandle },
    SetCogOffset { object: ObjectHandle },
    SetObjectFlags { object: ObjectHandle },
    CreateVehicleDynamics { object: ObjectHandle },
    CreateTrajectory { object: ObjectHandle },
    CreateSensor { object: ObjectHandle, kind: SensorType, sensor: SensorHandle },
    ConfigureSensor { sensor: SensorHandle },
    RegisterUnit { unit: UnitHandle, kind: &'static str },
    UnregisterUnit { unit: UnitHandle },
    AddRoad,
    ImportOpenDrive,
    SetWeather,
    SetSky,
    SetScheduler,
    AddViewer,
    RemoveViewers,
    Save,
    Load,
    BeginSimulation,
    Advance,
    EndSimulation,
}

/// Append-only list of [`EngineCall`]s.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Vec<EngineCall>,
}

impl Journal {
    pub(crate) fn record(&mut self, call: EngineCall) {
        tracing::trace!(?call, "engine call");
        self.calls.push(call);
    }

    #[must_use]
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Calls that touched `object` directly.
    pub fn for_object(&self, object: ObjectHandle) -> impl Iterator<Item = &EngineCall> {
        self.calls.iter().filter(move |call| match call {
            EngineCall::CreateObject { object: o, .. }
            | EngineCall::RemoveObject { object: o }
            | EngineCall::SetObjectPose { object: o }
            | EngineCall::SetCogOffset { object: o }
            | EngineCall::SetObjectFlags { object: o }
            | EngineCall::CreateVehicleDynamics { object: o }
            | EngineCall::CreateTrajectory { object: o }
            | EngineCall::CreateSensor { object: o, .. } => *o == object,
            _ => false,
        })
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
