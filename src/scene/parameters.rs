// Parameter capability of SceneTree

use super::path::{join_parameter_path, split_parameter_path};
use super::{ParamRef, SceneTree};
use crate::host::{HostError, HostResult, ParameterHost, TreeHost};
use serde_json::Value;

impl SceneTree {
    /// Set a value without running operators
    pub(crate) fn write_parameter(&mut self, param: &ParamRef, value: Value) -> HostResult<()> {
        let node = self.node_mut(param.item)?;
        let slot = node
            .params
            .iter_mut()
            .find(|(name, _)| *name == param.name)
            .ok_or_else(|| HostError::UnknownParameter(param.name.clone()))?;
        slot.1 = value;
        Ok(())
    }
}

impl ParameterHost for SceneTree {
    type ParamId = ParamRef;

    fn resolve_parameter(&self, path: &str) -> Option<ParamRef> {
        let (item_path, name) = split_parameter_path(path)?;
        let item = self.resolve_item(item_path)?;
        self.param(item, name)
    }

    fn parameter_path(&self, param: &ParamRef) -> Option<String> {
        let item_path = self.item_path(param.item)?;
        Some(join_parameter_path(&item_path, &param.name))
    }

    fn parameter_name(&self, param: &ParamRef) -> Option<String> {
        self.param(param.item, &param.name)
            .map(|param| param.name)
    }

    fn parameter_value(&self, param: &ParamRef) -> HostResult<Value> {
        self.node(param.item)?
            .params
            .iter()
            .find(|(name, _)| *name == param.name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| HostError::UnknownParameter(param.name.clone()))
    }

    fn set_parameter_value(&mut self, param: &ParamRef, value: Value) -> HostResult<()> {
        self.write_parameter(param, value)?;
        self.propagate(param, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut scene = SceneTree::new();
        let obj = scene.add_item(scene.root(), "obj").unwrap();
        let param = scene.add_parameter(obj, "Radius", json!(1.0)).unwrap();

        scene.set_parameter_value(&param, json!(2.5)).unwrap();
        assert_eq!(scene.parameter_value(&param).unwrap(), json!(2.5));
        assert_eq!(scene.parameter_name(&param).as_deref(), Some("Radius"));
    }

    #[test]
    fn test_unknown_parameter() {
        let mut scene = SceneTree::new();
        let obj = scene.add_item(scene.root(), "obj").unwrap();
        let missing = ParamRef::new(obj, "Nope");

        assert_eq!(
            scene.set_parameter_value(&missing, json!(1)),
            Err(HostError::UnknownParameter("Nope".into()))
        );
        assert!(scene.resolve_parameter("/root/obj.Nope").is_none());
        assert!(scene.resolve_parameter("/root/other.Radius").is_none());
    }

    #[test]
    fn test_detached_parameter_has_no_path() {
        let mut scene = SceneTree::new();
        let loose = scene.create_item("loose");
        let param = scene.add_parameter(loose, "Radius", json!(1.0)).unwrap();
        assert!(scene.parameter_path(&param).is_none());
        assert_eq!(scene.parameter_value(&param).unwrap(), json!(1.0));
    }
}
