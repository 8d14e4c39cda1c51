//! Label schema shared by every metric family
//!
//! The base label names are fixed when the registry is built. Each family
//! may append one extra label name of its own (compiler type, function
//! name, request result). All validation happens here, at construction
//! time, so a misconfigured schema never reaches the update path.

use std::collections::HashSet;

use crate::errors::{MetricsError, Result};

/// Ordered, immutable set of base label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    base: Vec<String>,
}

impl LabelSchema {
    /// Build a schema from base label names.
    ///
    /// Fails on empty or malformed names and on duplicates.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base: Vec<String> = names.into_iter().map(Into::into).collect();

        let mut seen = HashSet::with_capacity(base.len());
        for name in &base {
            validate_label_name(name)?;
            if !seen.insert(name.as_str()) {
                return Err(MetricsError::label_schema(format!(
                    "duplicate base label name '{}'",
                    name
                )));
            }
        }

        Ok(Self { base })
    }

    /// Base label names in declaration order.
    pub fn base(&self) -> &[String] {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Full label sequence for a family: base names, then `extra` if present.
    pub fn derive(&self, extra: Option<&str>) -> Result<Vec<String>> {
        let mut names = self.base.clone();
        if let Some(extra) = extra {
            validate_label_name(extra)?;
            if self.base.iter().any(|b| b == extra) {
                return Err(MetricsError::label_schema(format!(
                    "extra label name '{}' collides with a base label",
                    extra
                )));
            }
            names.push(extra.to_string());
        }
        Ok(names)
    }
}

/// Exposition label names: `[a-zA-Z_][a-zA-Z0-9_]*`, `__` prefix reserved.
fn validate_label_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MetricsError::label_schema("label name must not be empty"));
    }
    if name.starts_with("__") {
        return Err(MetricsError::label_schema(format!(
            "label name '{}' uses the reserved '__' prefix",
            name
        )));
    }

    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_first || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MetricsError::label_schema(format!(
            "invalid label name '{}'",
            name
        )));
    }
    Ok(())
}
