//! Owning store for models, addressed by [`ModelId`].

use std::fmt;

use simbridge_core::error::ResourceError;

use crate::model::EntityModel;

/// Stable index of a model inside a [`ModelRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub usize);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

/// Models are appended and never removed, so ids stay valid for the
/// registry's lifetime.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<Box<dyn EntityModel>>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model: Box<dyn EntityModel>) -> ModelId {
        self.models.push(model);
        ModelId(self.models.len() - 1)
    }

    pub fn get(&self, id: ModelId) -> Result<&dyn EntityModel, ResourceError> {
        self.models
            .get(id.0)
            .map(AsRef::as_ref)
            .ok_or(ResourceError::ModelNotFound(id.0))
    }

    pub fn get_mut(&mut self, id: ModelId) -> Result<&mut dyn EntityModel, ResourceError> {
        match self.models.get_mut(id.0) {
            Some(model) => Ok(model.as_mut()),
            None => Err(ResourceError::ModelNotFound(id.0)),
        }
    }

    /// Typed access; fails if `id` holds a different model kind.
    pub fn get_as<T: EntityModel>(&self, id: ModelId) -> Result<&T, ResourceError> {
        self.get(id)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or(ResourceError::ModelTypeMismatch {
                id: id.0,
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn get_as_mut<T: EntityModel>(&mut self, id: ModelId) -> Result<&mut T, ResourceError> {
        self.get_mut(id)?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(ResourceError::ModelTypeMismatch {
                id: id.0,
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &dyn EntityModel)> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, model)| (ModelId(i), model.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AmesimDynamicalModel, CustomDynamicalModel, TrackModel};

    #[test]
    fn ids_are_sequential() {
        let mut registry = ModelRegistry::new();
        assert!(registry.is_empty());
        let a = registry.insert(Box::new(CustomDynamicalModel::default()));
        let b = registry.insert(Box::new(TrackModel::default()));
        assert_eq!(a, ModelId(0));
        assert_eq!(b, ModelId(1));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(b).unwrap().name(), "TrackModel");
    }

    #[test]
    fn typed_access() {
        let mut registry = ModelRegistry::new();
        let id = registry.insert(Box::new(AmesimDynamicalModel::default()));
        assert!(registry.get_as::<AmesimDynamicalModel>(id).is_ok());
        assert!(matches!(
            registry.get_as::<TrackModel>(id),
            Err(ResourceError::ModelTypeMismatch { id: 0, .. })
        ));
        registry
            .get_as_mut::<AmesimDynamicalModel>(id)
            .unwrap()
            .set_flat_input(&[0.5, 0.0, 0.0, 1.0])
            .unwrap();
        assert_eq!(
            registry.get(id).unwrap().flat_input(),
            vec![0.5, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn unknown_id() {
        let mut registry = ModelRegistry::new();
        assert!(matches!(
            registry.get(ModelId(3)),
            Err(ResourceError::ModelNotFound(3))
        ));
        assert!(registry.get_mut(ModelId(0)).is_err());
    }

    #[test]
    fn iter_in_insertion_order() {
        let mut registry = ModelRegistry::new();
        registry.insert(Box::new(TrackModel::default()));
        registry.insert(Box::new(CustomDynamicalModel::default()));
        let names: Vec<_> = registry.iter().map(|(_, m)| m.name()).collect();
        assert_eq!(names, ["TrackModel", "CustomDynamicalModel"]);
    }

    #[test]
    fn id_display() {
        assert_eq!(ModelId(7).to_string(), "model#7");
    }
}
