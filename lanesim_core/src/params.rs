//! Hierarchical parameter server.
//!
//! Parameters live in a single JSON tree shared by every handle. A handle
//! obtained with [`ParameterServer::child`] addresses a subtree, so
//! `params.child("BehaviorIDMClassic").set("DesiredVelocity", 5.0)` and
//! `params.get_real("BehaviorIDMClassic::DesiredVelocity", .., ..)` touch
//! the same entry.
//!
//! Lookups carry a default and a description. Reading an unset key stores
//! the default, so a parameter file saved after a run lists every parameter
//! the run consulted.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};

/// Separator for hierarchical keys.
pub const KEY_SEPARATOR: &str = "::";

/// Errors raised while loading, saving or writing parameters.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("Parameter file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parameter JSON invalid: {0}")]
    Json(#[from] serde_json::Error),

    /// A key path runs through a value that is not an object
    #[error("Parameter '{0}' is not an object")]
    NotAnObject(String),
}

/// Shared, hierarchical parameter store.
#[derive(Clone)]
pub struct ParameterServer {
    root: Arc<Mutex<Value>>,
    descriptions: Arc<Mutex<BTreeMap<String, String>>>,
    prefix: Vec<String>,
}

impl Default for ParameterServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterServer")
            .field("prefix", &self.prefix.join(KEY_SEPARATOR))
            .finish()
    }
}

impl ParameterServer {
    /// Creates an empty parameter server.
    pub fn new() -> Self {
        Self {
            root: Arc::new(Mutex::new(Value::Object(Map::new()))),
            descriptions: Arc::new(Mutex::new(BTreeMap::new())),
            prefix: Vec::new(),
        }
    }

    /// Wraps an existing JSON object.
    pub fn from_value(value: Value) -> Result<Self, ParamsError> {
        if !value.is_object() {
            return Err(ParamsError::NotAnObject("<root>".to_string()));
        }
        let server = Self::new();
        *server.lock_root() = value;
        Ok(server)
    }

    /// Loads parameters from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text)?;
        debug!("Loaded parameters from {}", path.display());
        Self::from_value(value)
    }

    /// Writes the whole tree (not only this handle's subtree) as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        let json = serde_json::to_string_pretty(&*self.lock_root())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Returns a handle addressing the subtree under `key`.
    pub fn child(&self, key: &str) -> ParameterServer {
        Self {
            root: Arc::clone(&self.root),
            descriptions: Arc::clone(&self.descriptions),
            prefix: self.full_path(key),
        }
    }

    /// Reads `key`, storing `default` when unset.
    ///
    /// A stored value of the wrong type is left untouched and the default
    /// is returned.
    pub fn get<T>(&self, key: &str, description: &str, default: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        let path = self.full_path(key);
        let joined = path.join(KEY_SEPARATOR);
        self.lock_descriptions()
            .entry(joined.clone())
            .or_insert_with(|| description.to_string());

        let mut root = self.lock_root();
        let Some((leaf, parents)) = path.split_last() else {
            return default;
        };
        let Some(parent) = descend(&mut root, parents) else {
            warn!("Parameter '{}' shadowed by a non-object value, using default", joined);
            return default;
        };

        match parent.get(leaf) {
            Some(stored) => match serde_json::from_value::<T>(stored.clone()) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Parameter '{}' has unexpected type ({}), using default", joined, e);
                    default
                }
            },
            None => {
                match serde_json::to_value(&default) {
                    Ok(value) => {
                        parent.insert(leaf.clone(), value);
                    }
                    Err(e) => warn!("Default for '{}' not representable: {}", joined, e),
                }
                default
            }
        }
    }

    pub fn get_real(&self, key: &str, description: &str, default: f64) -> f64 {
        self.get(key, description, default)
    }

    pub fn get_int(&self, key: &str, description: &str, default: i64) -> i64 {
        self.get(key, description, default)
    }

    pub fn get_bool(&self, key: &str, description: &str, default: bool) -> bool {
        self.get(key, description, default)
    }

    pub fn get_string(&self, key: &str, description: &str, default: &str) -> String {
        self.get(key, description, default.to_string())
    }

    pub fn get_list<T>(&self, key: &str, description: &str, default: Vec<T>) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.get(key, description, default)
    }

    /// Returns the raw value under `key` without storing anything.
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        let path = self.full_path(key);
        let root = self.lock_root();
        path.iter()
            .try_fold(&*root, |node, segment| node.get(segment))
            .cloned()
    }

    /// Sets `key`, creating intermediate objects as needed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), ParamsError> {
        let path = self.full_path(key);
        let joined = path.join(KEY_SEPARATOR);
        let mut root = self.lock_root();
        let (leaf, parents) = path
            .split_last()
            .ok_or_else(|| ParamsError::NotAnObject(joined.clone()))?;
        let parent = descend(&mut root, parents).ok_or(ParamsError::NotAnObject(joined))?;
        parent.insert(leaf.clone(), value.into());
        Ok(())
    }

    /// Snapshot of this handle's subtree.
    pub fn to_json(&self) -> Value {
        self.get_raw("").unwrap_or(Value::Null)
    }

    /// Descriptions recorded by lookups, keyed by full parameter path.
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.lock_descriptions().clone()
    }

    fn full_path(&self, key: &str) -> Vec<String> {
        self.prefix
            .iter()
            .cloned()
            .chain(
                key.split(KEY_SEPARATOR)
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string),
            )
            .collect()
    }

    fn lock_root(&self) -> MutexGuard<'_, Value> {
        self.root.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_descriptions(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.descriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Walks (and creates) the object chain for `path`.
fn descend<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Map<String, Value>> {
    let mut node = root.as_object_mut()?;
    for segment in path {
        node = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_stored() {
        let params = ParameterServer::new();
        let step = params.child("simulation").get_real("step_time", "Step-time used in simulation", 0.2);
        assert_eq!(step, 0.2);
        assert_eq!(params.get_raw("simulation::step_time"), Some(json!(0.2)));

        // Second lookup returns the stored value, not the new default
        let again = params.get_real("simulation::step_time", "Step-time used in simulation", 1.0);
        assert_eq!(again, 0.2);
    }

    #[test]
    fn test_child_handles_share_tree() {
        let params = ParameterServer::new();
        params
            .child("BehaviorIDMClassic")
            .set("DesiredVelocity", 5.0)
            .unwrap();

        assert_eq!(params.get_real("BehaviorIDMClassic::DesiredVelocity", "", 15.0), 5.0);
        assert_eq!(
            params.to_json(),
            json!({"BehaviorIDMClassic": {"DesiredVelocity": 5.0}})
        );
    }

    #[test]
    fn test_type_mismatch_returns_default() {
        let params = ParameterServer::new();
        params.set("a::b", "text").unwrap();

        assert_eq!(params.get_real("a::b", "", 1.5), 1.5);
        // Stored value untouched
        assert_eq!(params.get_string("a::b", "", "other"), "text");
    }

    #[test]
    fn test_integer_reads_as_real() {
        let params = ParameterServer::from_value(json!({"x": 3})).unwrap();
        assert_eq!(params.get_real("x", "", 0.0), 3.0);
        assert_eq!(params.get_int("x", "", 0), 3);
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let params = ParameterServer::new();
        params.set("a", 1.0).unwrap();
        assert!(matches!(params.set("a::b", 2.0), Err(ParamsError::NotAnObject(_))));
        assert_eq!(params.get_real("a::b", "", 7.0), 7.0);
    }

    #[test]
    fn test_descriptions_recorded() {
        let params = ParameterServer::new();
        params.get_bool("viewer::draw_goals", "Draw goal polygons", true);
        assert_eq!(
            params.descriptions().get("viewer::draw_goals").map(String::as_str),
            Some("Draw goal polygons")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = ParameterServer::new();
        params.set("simulation::real_time_factor", 2.0).unwrap();
        params.get_list("list", "", vec![1.0, 2.0]);
        params.save(&path).unwrap();

        let loaded = ParameterServer::load(&path).unwrap();
        assert_eq!(loaded.get_real("simulation::real_time_factor", "", 1.0), 2.0);
        assert_eq!(loaded.get_list::<f64>("list", "", vec![]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_from_value_rejects_scalar() {
        assert!(ParameterServer::from_value(json!(3)).is_err());
    }
}
