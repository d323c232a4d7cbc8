//! Formula parser with validation

use super::model::{FetchMethod, Formula};
use kiln_errors::{Error, FormulaError};
use std::path::Path;

/// On-disk formula syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaFormat {
    Yaml,
    Toml,
}

impl FormulaFormat {
    /// Pick the format from a file extension
    ///
    /// # Errors
    ///
    /// Returns an error for extensions other than `yml`, `yaml` and `toml`.
    pub fn from_path(path: &Path) -> Result<Self, FormulaError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml" | "yaml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            other => Err(FormulaError::UnsupportedFormat {
                extension: other.unwrap_or("").to_string(),
            }),
        }
    }
}

/// Load, validate and resolve a formula file
///
/// Relative `local` source paths are resolved against the directory that
/// contains the formula.
///
/// # Errors
///
/// Returns an error if:
/// - The extension is not a known formula format
/// - The file cannot be read
/// - The contents do not parse
/// - Validation fails
pub async fn load_formula(path: &Path) -> Result<Formula, Error> {
    let format = FormulaFormat::from_path(path)?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FormulaError::ReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    let mut formula = parse_formula(&content, format)?;

    if formula.source.method == FetchMethod::Local {
        let source = Path::new(&formula.source.uri);
        if source.is_relative() {
            if let Some(dir) = path.parent() {
                formula.source.uri = dir.join(source).display().to_string();
            }
        }
    }

    tracing::debug!(
        formula = %formula.name,
        path = %path.display(),
        steps = formula.steps.len(),
        "loaded formula"
    );
    Ok(formula)
}

/// Parse and validate a formula from text
///
/// # Errors
///
/// Returns an error if the text does not parse or validation fails.
pub fn parse_formula(content: &str, format: FormulaFormat) -> Result<Formula, Error> {
    let formula: Formula = match format {
        FormulaFormat::Yaml => serde_yml::from_str(content).map_err(|e| {
            FormulaError::ParseError {
                message: e.to_string(),
            }
        })?,
        FormulaFormat::Toml => toml::from_str(content).map_err(|e| FormulaError::ParseError {
            message: e.to_string(),
        })?,
    };

    formula.validate()?;
    Ok(formula)
}
