// HoldObjectsChange - bulk edit of many parameters during a drag

use crate::change::trait_def::{Change, ChangeError, ChangeResult, field, str_field};
use crate::host::ParameterHost;
use serde_json::{Value, json};

/// Edit of a growing set of parameters, e.g. every object caught by a
/// gizmo drag. Targets can be added while the change is live; values are
/// pushed per target index.
///
/// Update data is one of:
/// - `{ "newItem": "<param path>" }` adds a target, recording its current value
/// - `{ "changeIds": [i, ...], "changeValues": [v, ...] }` sets target `i` to `v`
pub struct HoldObjectsChange<S: ParameterHost> {
    params: Vec<S::ParamId>,
    prev_values: Vec<Value>,
    new_values: Vec<Option<Value>>,
}

impl<S: ParameterHost + 'static> HoldObjectsChange<S> {
    pub const NAME: &'static str = "HoldObjectsChange";

    /// Hold `params`, recording their current values
    pub fn new(params: Vec<S::ParamId>, host: &S) -> ChangeResult<Self> {
        let mut change = Self::default();
        for param in params {
            change.hold(param, host)?;
        }
        Ok(change)
    }

    pub fn params(&self) -> &[S::ParamId] {
        &self.params
    }

    fn hold(&mut self, param: S::ParamId, host: &S) -> ChangeResult<()> {
        self.prev_values.push(host.parameter_value(&param)?);
        self.new_values.push(None);
        self.params.push(param);
        Ok(())
    }

    fn set_values(&mut self, ids: &[Value], values: &[Value], host: &mut S) -> ChangeResult<()> {
        if ids.len() != values.len() {
            return Err(ChangeError::MalformedData(format!(
                "{} ids but {} values",
                ids.len(),
                values.len()
            )));
        }
        for (id, value) in ids.iter().zip(values) {
            let index = id
                .as_u64()
                .map(|i| i as usize)
                .filter(|i| *i < self.params.len())
                .ok_or_else(|| ChangeError::MalformedData(format!("bad target index {}", id)))?;
            host.set_parameter_value(&self.params[index], value.clone())?;
            self.new_values[index] = Some(value.clone());
        }
        Ok(())
    }

    fn resolve(host: &S, path: &str) -> ChangeResult<S::ParamId> {
        host.resolve_parameter(path).ok_or_else(|| {
            tracing::warn!(%path, "HoldObjectsChange: parameter not found");
            ChangeError::UnresolvedPath(path.to_string())
        })
    }
}

impl<S: ParameterHost> Default for HoldObjectsChange<S> {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            prev_values: Vec::new(),
            new_values: Vec::new(),
        }
    }
}

fn array<'a>(json: &'a Value, key: &str) -> ChangeResult<&'a Vec<Value>> {
    field(json, key)?
        .as_array()
        .ok_or_else(|| ChangeError::MalformedData(format!("field '{}' is not an array", key)))
}

impl<S: ParameterHost + 'static> Change<S> for HoldObjectsChange<S> {
    fn description(&self) -> String {
        "Hold Objects".to_string()
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        for (param, value) in self.params.iter().zip(&self.prev_values).rev() {
            host.set_parameter_value(param, value.clone())?;
        }
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        for (param, value) in self.params.iter().zip(&self.new_values) {
            if let Some(value) = value {
                host.set_parameter_value(param, value.clone())?;
            }
        }
        Ok(())
    }

    fn update(&mut self, data: &Value, host: &mut S) -> ChangeResult<()> {
        if data.get("newItem").is_some() {
            let param = Self::resolve(host, str_field(data, "newItem")?)?;
            return self.hold(param, host);
        }
        if data.get("changeIds").is_some() {
            let ids = array(data, "changeIds")?;
            let values = array(data, "changeValues")?;
            return self.set_values(ids, values, host);
        }
        Err(ChangeError::MalformedData(
            "expected 'newItem' or 'changeIds'".to_string(),
        ))
    }

    fn to_json(&self, host: &S) -> ChangeResult<Value> {
        let paths = self
            .params
            .iter()
            .map(|param| {
                host.parameter_path(param)
                    .ok_or_else(|| ChangeError::UnresolvedPath(format!("{:?}", param)))
            })
            .collect::<ChangeResult<Vec<_>>>()?;
        let new_values: Vec<Value> = self
            .new_values
            .iter()
            .map(|value| value.clone().unwrap_or(Value::Null))
            .collect();
        Ok(json!({
            "name": Self::NAME,
            "paramPaths": paths,
            "newValues": new_values,
        }))
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        *self = Self::default();
        for path in array(json, "paramPaths")? {
            let path = path
                .as_str()
                .ok_or_else(|| ChangeError::MalformedData("parameter path is not a string".into()))?;
            let param = Self::resolve(host, path)?;
            self.hold(param, host)?;
        }

        if let Some(values) = json.get("newValues").and_then(Value::as_array) {
            let (ids, values): (Vec<Value>, Vec<Value>) = values
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_null())
                .map(|(index, value)| (json!(index), value.clone()))
                .unzip();
            self.set_values(&ids, &values, host)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ParamRef, SceneTree};

    fn scene_with_targets() -> (SceneTree, ParamRef, ParamRef) {
        let mut scene = SceneTree::new();
        let a = scene.add_item(scene.root(), "a").unwrap();
        let b = scene.add_item(scene.root(), "b").unwrap();
        let pa = scene.add_parameter(a, "GlobalXfo", json!(0)).unwrap();
        let pb = scene.add_parameter(b, "GlobalXfo", json!(0)).unwrap();
        (scene, pa, pb)
    }

    #[test]
    fn test_drag_then_undo_redo() {
        let (mut scene, pa, pb) = scene_with_targets();
        let mut change = HoldObjectsChange::new(vec![pa.clone()], &scene).unwrap();

        change
            .update(&json!({ "newItem": "/root/b.GlobalXfo" }), &mut scene)
            .unwrap();
        assert_eq!(change.params().len(), 2);

        change
            .update(&json!({ "changeIds": [0, 1], "changeValues": [5, 7] }), &mut scene)
            .unwrap();
        assert_eq!(scene.parameter_value(&pa).unwrap(), json!(5));
        assert_eq!(scene.parameter_value(&pb).unwrap(), json!(7));

        change.undo(&mut scene).unwrap();
        assert_eq!(scene.parameter_value(&pa).unwrap(), json!(0));
        assert_eq!(scene.parameter_value(&pb).unwrap(), json!(0));

        change.redo(&mut scene).unwrap();
        assert_eq!(scene.parameter_value(&pa).unwrap(), json!(5));
        assert_eq!(scene.parameter_value(&pb).unwrap(), json!(7));
    }

    #[test]
    fn test_bad_update_data() {
        let (mut scene, pa, _) = scene_with_targets();
        let mut change = HoldObjectsChange::new(vec![pa], &scene).unwrap();

        let cases = [
            json!({}),
            json!({ "changeIds": [3], "changeValues": [1] }),
            json!({ "changeIds": [0], "changeValues": [] }),
        ];
        for data in cases {
            assert!(matches!(
                change.update(&data, &mut scene),
                Err(ChangeError::MalformedData(_))
            ));
        }
        assert!(matches!(
            change.update(&json!({ "newItem": "/root/zz.GlobalXfo" }), &mut scene),
            Err(ChangeError::UnresolvedPath(_))
        ));
    }

    #[test]
    fn test_json_rebuild_applies_values() {
        let (mut scene, pa, pb) = scene_with_targets();
        let mut change = HoldObjectsChange::new(vec![pa, pb], &scene).unwrap();
        change
            .update(&json!({ "changeIds": [1], "changeValues": [9] }), &mut scene)
            .unwrap();

        let json = change.to_json(&scene).unwrap();
        assert_eq!(json["newValues"], json!([null, 9]));

        let (mut remote, ra, rb) = scene_with_targets();
        let mut rebuilt = HoldObjectsChange::<SceneTree>::default();
        rebuilt.from_json(&json, &mut remote).unwrap();
        assert_eq!(remote.parameter_value(&ra).unwrap(), json!(0));
        assert_eq!(remote.parameter_value(&rb).unwrap(), json!(9));

        rebuilt.undo(&mut remote).unwrap();
        assert_eq!(remote.parameter_value(&rb).unwrap(), json!(0));
    }
}
