use serde_json::{Map, Value};

use crate::{CodecError, StoreEvent};

/// Local mirror of the value under a streamed path.
///
/// Writes follow the store's semantics: writing `null` deletes, and objects
/// left empty disappear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotTree {
    root: Value,
}

impl SnapshotTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn put(&mut self, path: &str, data: Value) {
        set(&mut self.root, &segments(path), data);
    }

    /// Merges the children of `data` into the object at `path`.
    pub fn patch(&mut self, path: &str, data: Value) -> Result<(), CodecError> {
        let Value::Object(children) = data else {
            return Err(CodecError::UnexpectedShape("non-object patch"));
        };

        let base = segments(path);
        for (key, value) in children {
            let mut target = base.clone();
            target.extend(segments(&key));
            set(&mut self.root, &target, value);
        }

        Ok(())
    }

    /// Applies a put/patch event. Returns `true` when the tree may have
    /// changed.
    pub fn apply(&mut self, event: StoreEvent) -> Result<bool, CodecError> {
        match event {
            StoreEvent::Put { path, data } => {
                self.put(&path, data);
                Ok(true)
            }
            StoreEvent::Patch { path, data } => {
                self.patch(&path, data)?;
                Ok(true)
            }
            StoreEvent::KeepAlive | StoreEvent::Cancel(_) | StoreEvent::AuthRevoked(_) => Ok(false),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn set(node: &mut Value, path: &[&str], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = data;
        return;
    };

    if let Value::Array(items) = node {
        let map = std::mem::take(items)
            .into_iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| (index.to_string(), value))
            .collect::<Map<_, _>>();
        *node = Value::Object(map);
    }

    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let emptied = match node {
        Value::Object(map) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set(child, rest, data);
            if child.is_null() {
                map.remove(*head);
            }
            map.is_empty()
        }
        _ => false,
    };

    if emptied {
        *node = Value::Null;
    }
}
