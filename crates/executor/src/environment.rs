//! Environment preparation for build steps

use kiln_formula::Formula;
use std::collections::BTreeMap;
use std::path::Path;

/// Immutable environment handed to every step
///
/// Steps never see the process environment directly; they run with exactly
/// the variables held here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshot of the current process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    #[must_use]
    pub fn inherited() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Variables sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Expand `$NAME` references in `command` against this environment
    #[must_use]
    pub fn expand(&self, command: &str) -> String {
        kiln_formula::expand(command, |name| self.get(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Build the environment a formula's steps run with
///
/// Starts from `base`, applies the formula's overrides in order (later
/// entries win on collision) and finally sets the formula's prefix variable
/// to `install_prefix`. Pure: neither `base` nor the process environment is
/// modified.
#[must_use]
pub fn prepare_environment(base: &Environment, formula: &Formula, install_prefix: &Path) -> Environment {
    let mut vars = base.vars.clone();

    for (name, value) in formula.effective_overrides() {
        vars.insert(name.to_string(), value.to_string());
    }

    vars.insert(
        formula.prefix_variable.clone(),
        install_prefix.display().to_string(),
    );

    Environment { vars }
}
