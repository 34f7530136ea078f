//! One lifecycle phase applied to every participant of an environment.
//!
//! Entities go first, in insertion order, each fanning out to its model and
//! sensors. Standalone models follow in insertion order.

use simbridge_core::{Result, SimbridgeError};
use simbridge_env::Environment;
use tracing::debug;

pub fn register_units(env: &mut Environment) -> Result<()> {
    let (entities, standalone, mut ctx) = env.lifecycle_parts();
    for entity in entities.iter_mut() {
        entity.register_unit(&mut ctx)?;
    }
    for &id in standalone {
        ctx.models.get_mut(id)?.register_unit(ctx.engine)?;
    }
    debug!(entities = entities.len(), standalone = standalone.len(), "units registered");
    Ok(())
}

pub fn initialise(env: &mut Environment) -> Result<()> {
    let (entities, standalone, mut ctx) = env.lifecycle_parts();
    for entity in entities.iter_mut() {
        entity.initialise(&mut ctx)?;
    }
    for &id in standalone {
        ctx.models.get_mut(id)?.initialise(ctx.engine)?;
    }
    Ok(())
}

pub fn step(env: &mut Environment) -> Result<()> {
    let (entities, standalone, mut ctx) = env.lifecycle_parts();
    for entity in entities.iter_mut() {
        entity.step(&mut ctx)?;
    }
    for &id in standalone {
        ctx.models.get_mut(id)?.step(ctx.engine)?;
    }
    Ok(())
}

/// Every participant is terminated even if an earlier one fails; the first
/// failure is returned.
pub fn terminate(env: &mut Environment) -> Result<()> {
    let (entities, standalone, mut ctx) = env.lifecycle_parts();
    let mut first: Option<SimbridgeError> = None;
    for entity in entities.iter_mut() {
        if let Err(err) = entity.terminate(&mut ctx) {
            first.get_or_insert(err);
        }
    }
    for &id in standalone {
        let result = match ctx.models.get_mut(id) {
            Ok(model) => model.terminate(ctx.engine),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            first.get_or_insert(err);
        }
    }
    debug!("units terminated");
    first.map_or(Ok(()), Err)
}
