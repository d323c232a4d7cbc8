//! Formula data model

use kiln_errors::FormulaError;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Variable that receives the install prefix unless a formula names another
pub const DEFAULT_PREFIX_VARIABLE: &str = "PREFIX";

/// Overrides applied when a formula asks for a single build job
const DEPARALLELIZE_OVERRIDES: [(&str, &str); 2] = [("MAKEFLAGS", "-j1"), ("JOBS", "1")];

/// Complete formula definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,

    pub source: SourceLocation,

    /// Environment overrides, in declaration order
    #[serde(default)]
    pub environment: EnvOverrides,

    /// Force build tooling to a single job
    #[serde(default)]
    pub deparallelize: bool,

    /// Name of the variable that receives the install prefix
    #[serde(default = "default_prefix_variable")]
    pub prefix_variable: String,

    /// Shell commands, executed in order
    #[serde(default)]
    pub steps: Vec<String>,
}

fn default_prefix_variable() -> String {
    DEFAULT_PREFIX_VARIABLE.to_string()
}

/// Where the source lives and how to get it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub uri: String,

    pub method: FetchMethod,

    /// Branch or tag to clone; the remote HEAD when absent
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Expected SHA-256 of a downloaded archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Source acquisition strategy
///
/// Unknown tags are kept rather than rejected at parse time so that the
/// fetch phase can report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FetchMethod {
    /// Version-control clone
    Git,
    /// Archive download followed by extraction
    Archive,
    /// Copy of a directory on the local filesystem
    Local,
    /// Anything else
    Other(String),
}

impl FetchMethod {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Git => "git",
            Self::Archive => "archive",
            Self::Local => "local",
            Self::Other(tag) => tag,
        }
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for FetchMethod {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "git" | "clone" => Self::Git,
            "archive" | "url" | "download" => Self::Archive,
            "local" | "path" => Self::Local,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for FetchMethod {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<FetchMethod> for String {
    fn from(method: FetchMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered environment overrides
///
/// Duplicate names are kept; the later entry wins when the environment is
/// prepared. Deserializes from a mapping or from a list of `NAME=VALUE`
/// strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides(Vec<(String, String)>);

impl EnvOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value a name resolves to after last-write-wins
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for EnvOverrides {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvOverrides {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EnvOverridesVisitor)
    }
}

struct EnvOverridesVisitor;

impl<'de> Visitor<'de> for EnvOverridesVisitor {
    type Value = EnvOverrides;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of variable names to values or a list of NAME=VALUE strings")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(EnvOverrides::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, ScalarString>()? {
            entries.push((key, value.0));
        }
        Ok(EnvOverrides(entries))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element::<String>()? {
            let (name, value) = item.split_once('=').ok_or_else(|| {
                de::Error::custom(format!("environment entry {item:?} is not NAME=VALUE"))
            })?;
            entries.push((name.to_string(), value.to_string()));
        }
        Ok(EnvOverrides(entries))
    }
}

/// Accepts numbers and booleans as strings (`JOBS: 1`)
struct ScalarString(String);

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = ScalarString;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, number or boolean")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(ScalarString(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ScalarString(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(ScalarString(v.to_string()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl Formula {
    /// Create a formula with no overrides and no steps
    #[must_use]
    pub fn new(name: impl Into<String>, source: SourceLocation) -> Self {
        Self {
            name: name.into(),
            source,
            environment: EnvOverrides::default(),
            deparallelize: false,
            prefix_variable: default_prefix_variable(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.push(name, value);
        self
    }

    #[must_use]
    pub fn with_step(mut self, command: impl Into<String>) -> Self {
        self.steps.push(command.into());
        self
    }

    #[must_use]
    pub fn with_deparallelize(mut self, enabled: bool) -> Self {
        self.deparallelize = enabled;
        self
    }

    #[must_use]
    pub fn with_prefix_variable(mut self, name: impl Into<String>) -> Self {
        self.prefix_variable = name.into();
        self
    }

    /// Overrides in application order: deparallelization first, then the
    /// declared overrides
    pub fn effective_overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        let deparallelize: &[(&str, &str)] = if self.deparallelize {
            &DEPARALLELIZE_OVERRIDES[..]
        } else {
            &[]
        };
        deparallelize
            .iter()
            .copied()
            .chain(self.environment.iter())
    }

    /// Check the formula before any side effect happens
    ///
    /// # Errors
    ///
    /// Returns the first problem found: an empty or path-like name, an
    /// empty source URI, a checksum on a source that is not an archive, a
    /// blank step, or a malformed variable name.
    pub fn validate(&self) -> Result<(), FormulaError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormulaError::MissingName);
        }
        if name != self.name {
            return Err(FormulaError::InvalidName {
                name: self.name.clone(),
                reason: "leading or trailing whitespace".to_string(),
            });
        }
        if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
            return Err(FormulaError::InvalidName {
                name: self.name.clone(),
                reason: "must not be a path".to_string(),
            });
        }

        if self.source.uri.trim().is_empty() {
            return Err(FormulaError::MissingSource);
        }
        if self.source.sha256.is_some() && !matches!(self.source.method, FetchMethod::Archive) {
            return Err(FormulaError::ChecksumNotSupported {
                method: self.source.method.to_string(),
            });
        }

        for (name, _) in self.environment.iter() {
            check_variable_name(name)?;
        }
        check_variable_name(&self.prefix_variable)?;

        if let Some(index) = self.steps.iter().position(|s| s.trim().is_empty()) {
            return Err(FormulaError::EmptyStep { index: index + 1 });
        }

        Ok(())
    }
}

fn check_variable_name(name: &str) -> Result<(), FormulaError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('=') {
        "name contains '='"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(FormulaError::InvalidOverride {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

impl SourceLocation {
    #[must_use]
    pub fn new(uri: impl Into<String>, method: impl Into<FetchMethod>) -> Self {
        Self {
            uri: uri.into(),
            method: method.into(),
            reference: None,
            sha256: None,
        }
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    #[must_use]
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceLocation {
        SourceLocation::new("git://example/x.git", FetchMethod::Git)
    }

    #[test]
    fn test_fetch_method_aliases() {
        assert_eq!(FetchMethod::from("clone"), FetchMethod::Git);
        assert_eq!(FetchMethod::from("Download"), FetchMethod::Archive);
        assert_eq!(FetchMethod::from("path"), FetchMethod::Local);
        assert_eq!(
            FetchMethod::from("svn"),
            FetchMethod::Other("svn".to_string())
        );
        assert!(!FetchMethod::from("svn").is_supported());
    }

    #[test]
    fn test_last_override_wins() {
        let overrides: EnvOverrides = [("CC", "gcc"), ("CC", "clang")].into_iter().collect();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("CC"), Some("clang"));
        assert_eq!(overrides.get("CXX"), None);
    }

    #[test]
    fn test_deparallelize_precedes_declared_overrides() {
        let formula = Formula::new("x", source())
            .with_deparallelize(true)
            .with_env("JOBS", "4");
        let effective: Vec<_> = formula.effective_overrides().collect();
        assert_eq!(
            effective,
            vec![("MAKEFLAGS", "-j1"), ("JOBS", "1"), ("JOBS", "4")]
        );
    }

    #[test]
    fn test_validate_zero_steps_is_valid() {
        assert!(Formula::new("x", source()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(matches!(
            Formula::new("", source()).validate(),
            Err(FormulaError::MissingName)
        ));
        assert!(matches!(
            Formula::new("../x", source()).validate(),
            Err(FormulaError::InvalidName { .. })
        ));
        assert!(matches!(
            Formula::new("..", source()).validate(),
            Err(FormulaError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_source_and_steps() {
        let formula = Formula::new("x", SourceLocation::new("  ", FetchMethod::Git));
        assert!(matches!(
            formula.validate(),
            Err(FormulaError::MissingSource)
        ));

        let formula = Formula::new("x", source()).with_step("make").with_step(" ");
        assert!(matches!(
            formula.validate(),
            Err(FormulaError::EmptyStep { index: 2 })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_override_names() {
        let formula = Formula::new("x", source()).with_env("A=B", "1");
        assert!(matches!(
            formula.validate(),
            Err(FormulaError::InvalidOverride { .. })
        ));
        let formula = Formula::new("x", source()).with_prefix_variable("");
        assert!(matches!(
            formula.validate(),
            Err(FormulaError::InvalidOverride { .. })
        ));
    }

    #[test]
    fn test_validate_checksum_only_for_archives() {
        let formula = Formula::new("x", source().with_sha256("ab".repeat(32)));
        assert!(matches!(
            formula.validate(),
            Err(FormulaError::ChecksumNotSupported { ref method }) if method == "git"
        ));

        let local = SourceLocation::new("/src/x", FetchMethod::Local).with_sha256("00");
        assert!(Formula::new("x", local).validate().is_err());

        let archive = SourceLocation::new("https://example.com/x-1.0.tar.gz", FetchMethod::Archive)
            .with_sha256("ab".repeat(32));
        assert!(Formula::new("x", archive).validate().is_ok());
    }
}
