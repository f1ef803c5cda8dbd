use std::collections::BTreeMap;
use std::env as stdenv;
use std::path::PathBuf;

/// The interpreter's variable store and working state.
///
/// Variables are seeded from the process environment at start-up and from
/// then on this store is authoritative: spawned programs receive a
/// [`snapshot`](Environment::snapshot) of it, never the live map.
///
/// - `current_dir`: the directory `cd` last changed to.
/// - `should_exit`: set by `exit`; the main loop checks it after every line.
#[derive(Debug, Clone)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process environment.
    pub fn new() -> Self {
        Self::from_vars(stdenv::vars())
    }

    /// Build a store holding exactly the given variables.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Set or override a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable, returning its old value.
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    /// All variables, ordered by name.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A frozen copy of the store as `name=value` strings, ordered by name.
    pub fn snapshot(&self) -> Vec<String> {
        self.vars.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
