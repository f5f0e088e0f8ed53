// CreateGeomChange - interactive creation of a geometry item

use super::require_child_at;
use crate::change::trait_def::{Change, ChangeError, ChangeResult, str_field};
use crate::host::GeometryHost;
use serde_json::{Map, Value, json};

/// Name of the transform parameter set on creation
pub const XFO_PARAM: &str = "GlobalXfo";

/// Creation of a geometry item whose shape parameters are driven by `update`
/// while the user drags out the shape.
///
/// Every parameter value applied through the change is kept, so the snapshot
/// rebuilds the finished shape on a remote host.
pub struct CreateGeomChange<S: GeometryHost> {
    kind: String,
    geom_name: String,
    parent: Option<S::NodeId>,
    item: Option<S::NodeId>,
    index: usize,
    params: Map<String, Value>,
}

impl<S: GeometryHost + 'static> CreateGeomChange<S> {
    pub const NAME: &'static str = "CreateGeomChange";

    /// Create a `kind` item called `name`, place it at `xfo` and append it under `parent`
    pub fn apply(
        kind: &str,
        name: &str,
        parent: S::NodeId,
        xfo: Value,
        host: &mut S,
    ) -> ChangeResult<Self> {
        let mut change = Self::default();
        change.create(kind, name, parent, host)?;
        change.init_params(&Map::from_iter([(XFO_PARAM.to_string(), xfo)]), host)?;
        Ok(change)
    }

    pub fn item(&self) -> Option<S::NodeId> {
        self.item
    }

    fn create(
        &mut self,
        kind: &str,
        name: &str,
        parent: S::NodeId,
        host: &mut S,
    ) -> ChangeResult<()> {
        let item = host.create_geom_item(name, kind)?;
        host.retain(item);
        let index = host.child_count(parent);
        if let Err(err) = host.insert_child(parent, item, index) {
            host.release(item);
            return Err(err.into());
        }

        self.kind = kind.to_string();
        self.geom_name = name.to_string();
        self.parent = Some(parent);
        self.item = Some(item);
        self.index = index;
        Ok(())
    }

    fn set_params(&mut self, values: &Map<String, Value>, host: &mut S) -> ChangeResult<()> {
        let item = self
            .item
            .ok_or_else(|| ChangeError::Uninitialized(Self::NAME.to_string()))?;
        for (name, value) in values {
            let param = host.item_parameter(item, name).ok_or_else(|| {
                ChangeError::MalformedData(format!("{} has no parameter '{}'", self.kind, name))
            })?;
            host.set_parameter_value(&param, value.clone())?;
            self.params.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    /// Set the initial parameters of a freshly created item, taking the item
    /// back out of the tree if any of them is rejected
    fn init_params(&mut self, values: &Map<String, Value>, host: &mut S) -> ChangeResult<()> {
        let Err(err) = self.set_params(values, host) else {
            return Ok(());
        };
        if let Err(undo) = self.undo(host) {
            tracing::warn!(error = %undo, "CreateGeomChange: could not remove item");
        }
        self.destroy(host);
        Err(err)
    }

    fn placement(&self) -> ChangeResult<(S::NodeId, S::NodeId)> {
        match (self.item, self.parent) {
            (Some(item), Some(parent)) => Ok((item, parent)),
            _ => Err(ChangeError::Uninitialized(Self::NAME.to_string())),
        }
    }
}

impl<S: GeometryHost> Default for CreateGeomChange<S> {
    fn default() -> Self {
        Self {
            kind: String::new(),
            geom_name: String::new(),
            parent: None,
            item: None,
            index: 0,
            params: Map::new(),
        }
    }
}

impl<S: GeometryHost + 'static> Change<S> for CreateGeomChange<S> {
    fn description(&self) -> String {
        format!("Create {}", self.kind)
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        let (item, parent) = self.placement()?;
        require_child_at(host, parent, item, self.index)?;
        host.remove_child(parent, self.index)?;
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        let (item, parent) = self.placement()?;
        host.insert_child(parent, item, self.index)?;
        Ok(())
    }

    /// Expects an object of parameter name to value, e.g. `{ "Radius": 2.0 }`
    fn update(&mut self, data: &Value, host: &mut S) -> ChangeResult<()> {
        let values = data
            .as_object()
            .ok_or_else(|| ChangeError::MalformedData("expected an object of parameter values".into()))?;
        self.set_params(values, host)
    }

    fn to_json(&self, host: &S) -> ChangeResult<Value> {
        let (_, parent) = self.placement()?;
        let parent_path = host
            .item_path(parent)
            .ok_or_else(|| ChangeError::UnresolvedPath(format!("{:?}", parent)))?;
        Ok(json!({
            "name": Self::NAME,
            "parentItemPath": parent_path,
            "geomItemName": self.geom_name,
            "geomKind": self.kind,
            "params": self.params,
        }))
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        let parent_path = str_field(json, "parentItemPath")?;
        let Some(parent) = host.resolve_item(parent_path) else {
            tracing::warn!(path = %parent_path, "CreateGeomChange: parent not found");
            return Err(ChangeError::UnresolvedPath(parent_path.to_string()));
        };
        let kind = str_field(json, "geomKind")?;
        let name = str_field(json, "geomItemName")?;

        self.create(kind, name, parent, host)?;
        if let Some(params) = json.get("params").and_then(Value::as_object) {
            self.init_params(params, host)?;
        }
        Ok(())
    }

    fn destroy(&mut self, host: &mut S) {
        if let Some(item) = self.item.take() {
            host.release(item);
        }
    }
}
