//! Column role detection.
//!
//! [`detect`] assigns each [`SemanticRole`] to at most one header by scanning
//! the role's candidate terms in priority order and, for each term, the headers
//! in their original order. The first header whose lowercased name contains
//! the term wins. Roles are resolved independently of each other, so one
//! header may serve several roles.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::vocabulary::{SemanticRole, Vocabulary};

/// Source column chosen for each role. Roles without a column are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMapping {
    columns: BTreeMap<SemanticRole, String>,
}

impl RoleMapping {
    pub fn column(&self, role: SemanticRole) -> Option<&str> {
        self.columns.get(&role).map(String::as_str)
    }

    pub fn is_mapped(&self, role: SemanticRole) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn assign(&mut self, role: SemanticRole, column: impl Into<String>) {
        self.columns.insert(role, column.into());
    }

    pub fn clear(&mut self, role: SemanticRole) {
        self.columns.remove(&role);
    }

    /// Mapped roles in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (SemanticRole, &str)> {
        self.columns.iter().map(|(role, column)| (*role, column.as_str()))
    }

    pub fn unmapped(&self) -> Vec<SemanticRole> {
        SemanticRole::ALL
            .into_iter()
            .filter(|role| !self.is_mapped(*role))
            .collect()
    }

    /// Applies manual overrides on top of detection. Every override column must
    /// exist in `headers`.
    pub fn apply_overrides(&mut self, overrides: &[RoleOverride], headers: &[String]) -> Result<()> {
        for entry in overrides {
            match &entry.column {
                Some(column) => {
                    if !headers.iter().any(|h| h == column) {
                        bail!(
                            "Cannot map role '{}' to column '{}': no such column in input",
                            entry.role,
                            column
                        );
                    }
                    self.assign(entry.role, column.clone());
                }
                None => self.clear(entry.role),
            }
        }
        Ok(())
    }
}

pub fn detect<S>(headers: &[S], vocabulary: &Vocabulary) -> RoleMapping
where
    S: AsRef<str>,
{
    let lowered = headers
        .iter()
        .map(|h| h.as_ref().to_lowercase())
        .collect::<Vec<_>>();
    let mut mapping = RoleMapping::default();
    for role in SemanticRole::ALL {
        let found = vocabulary.terms(role).iter().find_map(|term| {
            lowered
                .iter()
                .position(|header| header.contains(term.as_str()))
        });
        if let Some(idx) = found {
            mapping.assign(role, headers[idx].as_ref());
        }
    }
    mapping
}

/// A `role=column` directive from the command line. An empty column
/// (`role=`) unmaps the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleOverride {
    pub role: SemanticRole,
    pub column: Option<String>,
}

impl RoleOverride {
    pub fn parse(spec: &str) -> Result<Self> {
        let (role, column) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Mapping override '{spec}' must look like role=column"))?;
        let role = role
            .trim()
            .parse::<SemanticRole>()
            .map_err(|err| anyhow!("Mapping override '{spec}': {err}"))?;
        let column = Some(column.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        Ok(RoleOverride { role, column })
    }
}

pub fn parse_overrides(specs: &[String]) -> Result<Vec<RoleOverride>> {
    specs.iter().map(|spec| RoleOverride::parse(spec)).collect()
}
