// ParameterValueChange - a single parameter edit

use crate::change::registry::RegistryError;
use crate::change::trait_def::{Change, ChangeError, ChangeResult, field, str_field};
use crate::host::ParameterHost;
use serde_json::{Value, json};

/// Change of one parameter's value
///
/// Records the value the parameter had when the change was created and the
/// most recent value applied to it. Repeated `update` calls (e.g. while a
/// slider or handle is dragged) only replace the next value; undo always
/// returns to the original.
///
/// Secondary changes ride along with the primary one: they are updated,
/// undone and redone together with it. With `suppress_primary_change` set the
/// primary parameter is left alone and only the secondary changes are driven,
/// which is how compound multi-target edits are expressed.
pub struct ParameterValueChange<S: ParameterHost> {
    param: Option<S::ParamId>,
    description: String,
    prev_value: Value,
    next_value: Option<Value>,
    suppress_primary_change: bool,
    secondary_changes: Vec<Box<dyn Change<S>>>,
}

impl<S: ParameterHost + 'static> ParameterValueChange<S> {
    pub const NAME: &'static str = "ParameterValueChange";

    /// Record the current value of `param` without changing it
    pub fn new(param: S::ParamId, host: &S) -> ChangeResult<Self> {
        let prev_value = host.parameter_value(&param)?;
        let description = describe(host, &param);
        Ok(Self {
            param: Some(param),
            description,
            prev_value,
            next_value: None,
            suppress_primary_change: false,
            secondary_changes: Vec::new(),
        })
    }

    /// Record the current value of `param`, then set it to `value`
    pub fn apply(param: S::ParamId, value: Value, host: &mut S) -> ChangeResult<Self> {
        let mut change = Self::new(param.clone(), host)?;
        host.set_parameter_value(&param, value.clone())?;
        change.next_value = Some(value);
        Ok(change)
    }

    /// Leave the primary parameter untouched on update/undo/redo
    pub fn suppress_primary_change(mut self, suppress: bool) -> Self {
        self.suppress_primary_change = suppress;
        self
    }

    pub fn with_secondary_change(mut self, change: Box<dyn Change<S>>) -> Self {
        self.secondary_changes.push(change);
        self
    }

    pub fn add_secondary_change(&mut self, change: Box<dyn Change<S>>) {
        self.secondary_changes.push(change);
    }

    pub fn param(&self) -> Option<&S::ParamId> {
        self.param.as_ref()
    }

    pub fn prev_value(&self) -> &Value {
        &self.prev_value
    }

    pub fn next_value(&self) -> Option<&Value> {
        self.next_value.as_ref()
    }

    /// Rebuild a secondary change from its envelope
    ///
    /// Only parameter edits ride along as secondaries on the wire.
    fn secondary_from_json(envelope: &Value, host: &mut S) -> ChangeResult<Self> {
        let name = envelope
            .get("name")
            .and_then(Value::as_str)
            .ok_or(RegistryError::MissingName)?;
        if name != Self::NAME {
            tracing::warn!(%name, "ParameterValueChange: unsupported secondary change");
            return Err(RegistryError::NotFound(name.to_string()).into());
        }

        let mut secondary = Self::default();
        secondary.from_json(envelope, host)?;
        Ok(secondary)
    }

    fn require_param(&self) -> ChangeResult<&S::ParamId> {
        self.param
            .as_ref()
            .ok_or_else(|| ChangeError::Uninitialized(Self::NAME.to_string()))
    }
}

fn describe<S: ParameterHost>(host: &S, param: &S::ParamId) -> String {
    match host.parameter_name(param) {
        Some(name) => format!("{} Changed", name),
        None => "Parameter Changed".to_string(),
    }
}

impl<S: ParameterHost> Default for ParameterValueChange<S> {
    fn default() -> Self {
        Self {
            param: None,
            description: "Parameter Changed".to_string(),
            prev_value: Value::Null,
            next_value: None,
            suppress_primary_change: false,
            secondary_changes: Vec::new(),
        }
    }
}

impl<S: ParameterHost + 'static> Change<S> for ParameterValueChange<S> {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        if !self.suppress_primary_change {
            let param = self.require_param()?;
            host.set_parameter_value(param, self.prev_value.clone())?;
        }
        for change in self.secondary_changes.iter_mut().rev() {
            change.undo(host)?;
        }
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        if !self.suppress_primary_change {
            let param = self.require_param()?;
            if let Some(value) = &self.next_value {
                host.set_parameter_value(param, value.clone())?;
            }
        }
        for change in self.secondary_changes.iter_mut() {
            change.redo(host)?;
        }
        Ok(())
    }

    /// Expects `{ "value": <new value> }`
    fn update(&mut self, data: &Value, host: &mut S) -> ChangeResult<()> {
        let value = field(data, "value")?.clone();
        if !self.suppress_primary_change {
            let param = self.require_param()?;
            host.set_parameter_value(param, value.clone())?;
        }
        self.next_value = Some(value);
        for change in self.secondary_changes.iter_mut() {
            change.update(data, host)?;
        }
        Ok(())
    }

    fn to_json(&self, host: &S) -> ChangeResult<Value> {
        let param = self.require_param()?;
        let path = host
            .parameter_path(param)
            .ok_or_else(|| ChangeError::UnresolvedPath(format!("{:?}", param)))?;

        let mut json = json!({
            "name": Self::NAME,
            "paramPath": path,
        });
        if let Some(value) = &self.next_value {
            json["value"] = value.clone();
        }
        if self.suppress_primary_change {
            json["suppressPrimaryChange"] = Value::Bool(true);
        }
        if !self.secondary_changes.is_empty() {
            let secondaries = self
                .secondary_changes
                .iter()
                .map(|change| change.to_json(host))
                .collect::<ChangeResult<Vec<_>>>()?;
            json["secondaryChanges"] = Value::Array(secondaries);
        }
        Ok(json)
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        let path = str_field(json, "paramPath")?;
        let Some(param) = host.resolve_parameter(path) else {
            tracing::warn!(%path, "ParameterValueChange: parameter not found");
            return Err(ChangeError::UnresolvedPath(path.to_string()));
        };

        self.prev_value = host.parameter_value(&param)?;
        self.description = describe(host, &param);
        self.param = Some(param);
        self.suppress_primary_change = json
            .get("suppressPrimaryChange")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        self.secondary_changes.clear();
        if let Some(secondaries) = json.get("secondaryChanges") {
            let secondaries = secondaries
                .as_array()
                .ok_or_else(|| ChangeError::MalformedData("secondaryChanges".into()))?;
            for envelope in secondaries {
                self.secondary_changes
                    .push(Box::new(Self::secondary_from_json(envelope, host)?));
            }
        }

        if json.get("value").is_some() {
            self.update_from_json(json, host)?;
        }
        Ok(())
    }
}
