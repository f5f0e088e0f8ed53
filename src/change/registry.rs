// ChangeRegistry - rebuilds changes by name
//
// Serialized changes carry a `name` field. The registry maps that name to a
// factory producing an empty instance, which is then populated with
// `Change::from_json`. Lookups never depend on Rust type names.

use crate::change::trait_def::{Change, ChangeResult};
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;

/// Factory producing an empty change ready for `from_json`
pub type ChangeFactory<S> = Box<dyn Fn() -> Box<dyn Change<S>>>;

/// Registry lookup failures
///
/// These are recoverable: they usually mean serialized data was produced by a
/// different version of the application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("No change registered under '{0}'")]
    NotFound(String),

    #[error("Change type was never registered")]
    UnregisteredType,

    #[error("Serialized change has no 'name' field")]
    MissingName,
}

/// Name-to-factory mapping for change types
pub struct ChangeRegistry<S> {
    factories: HashMap<String, ChangeFactory<S>>,
    names: HashMap<TypeId, String>,
}

impl<S: 'static> ChangeRegistry<S> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Register a change type constructed through `Default`
    ///
    /// Registering a name again replaces the previous entry.
    pub fn register<C>(&mut self, name: impl Into<String>)
    where
        C: Change<S> + Default,
    {
        let name = name.into();
        self.bind_name(TypeId::of::<C>(), &name);
        self.factories
            .insert(name, Box::new(|| Box::new(C::default()) as Box<dyn Change<S>>));
    }

    /// Register a custom factory
    ///
    /// The type produced by the factory is probed once so `get_name` can
    /// resolve instances built by it.
    pub fn register_factory<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Change<S>> + 'static,
    {
        let name = name.into();
        let probe = factory();
        self.bind_name(probe.change_type_id(), &name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Point `name` at `type_id` only; a displaced type stops resolving
    fn bind_name(&mut self, type_id: TypeId, name: &str) {
        self.names.retain(|_, existing| existing != name);
        self.names.insert(type_id, name.to_string());
    }

    /// Instantiate an empty change registered under `name`
    pub fn construct(&self, name: &str) -> Result<Box<dyn Change<S>>, RegistryError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Name under which the type of `change` was registered
    pub fn get_name(&self, change: &dyn Change<S>) -> Result<&str, RegistryError> {
        self.names
            .get(&change.change_type_id())
            .map(String::as_str)
            .ok_or(RegistryError::UnregisteredType)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Serialize a change into its envelope `{ name, ...fields }`
    pub fn serialize(&self, change: &dyn Change<S>, host: &S) -> ChangeResult<Value> {
        let name = self.get_name(change)?;
        let mut json = change.to_json(host)?;
        match json.as_object_mut() {
            Some(fields) => {
                fields.insert("name".to_string(), Value::String(name.to_string()));
            }
            None => {
                json = serde_json::json!({ "name": name });
            }
        }
        Ok(json)
    }

    /// Rebuild a change from its envelope
    pub fn deserialize(&self, envelope: &Value, host: &mut S) -> ChangeResult<Box<dyn Change<S>>> {
        let name = envelope
            .get("name")
            .and_then(Value::as_str)
            .ok_or(RegistryError::MissingName)?;
        let mut change = self.construct(name)?;
        change.from_json(envelope, host)?;
        Ok(change)
    }
}

impl<S: 'static> Default for ChangeRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
