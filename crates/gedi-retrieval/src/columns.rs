//! Column selection for retrieval.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::Schema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// Which columns a retrieval returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnSelector {
    /// Every column of the partition schema, labelled by position.
    #[default]
    All,
    /// An ordered list of named columns.
    Subset(Vec<String>),
}

impl ColumnSelector {
    /// Build a subset selector from names.
    pub fn subset<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Subset(names.into_iter().map(Into::into).collect())
    }

    /// Column names in output order, checked against a partition schema.
    pub fn resolve(&self, schema: &Schema) -> Result<Vec<String>> {
        match self {
            Self::All => Ok(schema.fields().iter().map(|f| f.name().clone()).collect()),
            Self::Subset(names) => {
                for name in names {
                    if schema.field_with_name(name).is_err() {
                        return Err(RetrievalError::ColumnNotFound(name.clone()));
                    }
                }
                Ok(names.clone())
            }
        }
    }
}

impl FromStr for ColumnSelector {
    type Err = RetrievalError;

    /// Parse `*`, `all` or a comma-separated column list.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == "*" || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let names: Vec<String> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .collect();

        if names.is_empty() {
            return Err(RetrievalError::config("empty column list"));
        }
        Ok(Self::Subset(names))
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Subset(names) => write!(f, "{}", names.join(",")),
        }
    }
}
