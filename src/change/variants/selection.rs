// SelectionChange - replace the selection set

use crate::change::trait_def::{Change, ChangeError, ChangeResult, field};
use crate::host::SelectionHost;
use serde_json::{Value, json};

/// Swap between two selection sets
pub struct SelectionChange<S: SelectionHost> {
    prev_selection: Vec<S::NodeId>,
    new_selection: Vec<S::NodeId>,
}

impl<S: SelectionHost + 'static> SelectionChange<S> {
    pub const NAME: &'static str = "SelectionChange";

    /// Record a selection switch that has already happened
    pub fn new(prev_selection: Vec<S::NodeId>, new_selection: Vec<S::NodeId>) -> Self {
        Self {
            prev_selection,
            new_selection,
        }
    }

    /// Select `items`, remembering the current selection
    pub fn apply(items: Vec<S::NodeId>, host: &mut S) -> Self {
        let prev_selection = host.selection();
        host.set_selection(&items);
        Self::new(prev_selection, items)
    }

    pub fn prev_selection(&self) -> &[S::NodeId] {
        &self.prev_selection
    }

    pub fn new_selection(&self) -> &[S::NodeId] {
        &self.new_selection
    }
}

impl<S: SelectionHost> Default for SelectionChange<S> {
    fn default() -> Self {
        Self {
            prev_selection: Vec::new(),
            new_selection: Vec::new(),
        }
    }
}

fn paths<S: SelectionHost>(host: &S, items: &[S::NodeId]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            let path = host.item_path(*item);
            if path.is_none() {
                tracing::debug!(?item, "Selected item has no path; left out of snapshot");
            }
            path
        })
        .collect()
}

fn resolve<S: SelectionHost>(host: &S, json: &Value, key: &str) -> ChangeResult<Vec<S::NodeId>> {
    let Some(entries) = field(json, key)?.as_array() else {
        return Err(ChangeError::MalformedData(format!(
            "field '{}' is not an array",
            key
        )));
    };
    let mut items = Vec::with_capacity(entries.len());
    for path in entries.iter().filter_map(Value::as_str) {
        match host.resolve_item(path) {
            Some(item) => items.push(item),
            None => tracing::warn!(%path, "SelectionChange: item not found"),
        }
    }
    Ok(items)
}

impl<S: SelectionHost + 'static> Change<S> for SelectionChange<S> {
    fn description(&self) -> String {
        "Selection Changed".to_string()
    }

    fn undo(&mut self, host: &mut S) -> ChangeResult<()> {
        host.set_selection(&self.prev_selection);
        Ok(())
    }

    fn redo(&mut self, host: &mut S) -> ChangeResult<()> {
        host.set_selection(&self.new_selection);
        Ok(())
    }

    fn to_json(&self, host: &S) -> ChangeResult<Value> {
        Ok(json!({
            "name": Self::NAME,
            "prevSelection": paths(host, &self.prev_selection),
            "newSelection": paths(host, &self.new_selection),
        }))
    }

    fn from_json(&mut self, json: &Value, host: &mut S) -> ChangeResult<()> {
        self.prev_selection = resolve(host, json, "prevSelection")?;
        self.new_selection = resolve(host, json, "newSelection")?;
        host.set_selection(&self.new_selection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneTree;

    #[test]
    fn test_apply_undo_redo() {
        let mut scene = SceneTree::new();
        let a = scene.add_item(scene.root(), "a").unwrap();
        let b = scene.add_item(scene.root(), "b").unwrap();
        scene.set_selection(&[a]);

        let mut change = SelectionChange::apply(vec![a, b], &mut scene);
        assert_eq!(scene.selection(), vec![a, b]);

        change.undo(&mut scene).unwrap();
        assert_eq!(scene.selection(), vec![a]);

        change.redo(&mut scene).unwrap();
        assert_eq!(scene.selection(), vec![a, b]);
    }

    #[test]
    fn test_json_uses_paths() {
        let mut scene = SceneTree::new();
        let a = scene.add_item(scene.root(), "a").unwrap();
        let change = SelectionChange::apply(vec![a], &mut scene);

        let json = change.to_json(&scene).unwrap();
        assert_eq!(json["prevSelection"], json!([]));
        assert_eq!(json["newSelection"], json!(["/root/a"]));

        let mut remote = SceneTree::new();
        let remote_a = remote.add_item(remote.root(), "a").unwrap();
        let mut rebuilt = SelectionChange::<SceneTree>::default();
        rebuilt.from_json(&json, &mut remote).unwrap();
        assert_eq!(remote.selection(), vec![remote_a]);
        assert_eq!(rebuilt.new_selection(), &[remote_a]);
    }

    #[test]
    fn test_unknown_paths_are_skipped() {
        let mut scene = SceneTree::new();
        let mut change = SelectionChange::<SceneTree>::default();
        let json = json!({ "prevSelection": [], "newSelection": ["/root/ghost"] });
        change.from_json(&json, &mut scene).unwrap();
        assert!(change.new_selection().is_empty());
    }
}
