//! Section mappings: which palette indices make up each part of a costume
//!
//! Mappings are stored as JSON, one file per job:
//!
//! ```json
//! {
//!   "job": "Knight_Male",
//!   "sprite": "battle_knight_m_spr.bin",
//!   "sections": [
//!     { "name": "cape", "displayName": "Cape",
//!       "indices": [3, 4, 5], "roles": ["shadow", "base", "highlight"] },
//!     { "name": "trim", "displayName": "Trim",
//!       "indices": [6], "roles": ["base"], "linkedTo": "cape" }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::palette::PALETTE_COLORS;
use crate::shades::Role;

/// Section mapping loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SectionError {
    /// File I/O error
    #[error("Failed to read section mapping: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error
    #[error("Failed to parse section mapping: {0}")]
    Parse(#[from] serde_json::Error),
    /// Structural problems found by [`SectionMapping::validate`]
    #[error("Section mapping validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
    /// Lookup of a section name that does not exist
    #[error("unknown section '{0}'")]
    UnknownSection(String),
}

/// A named group of palette indices with their roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSection {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub indices: Vec<u8>,
    pub roles: Vec<Role>,
    /// Section driven by the same color input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_to: Option<String>,
    /// Index the relative shade generator anchors on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_index: Option<u8>,
}

impl JobSection {
    pub fn new(name: impl Into<String>, indices: Vec<u8>, roles: Vec<Role>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            indices,
            roles,
            linked_to: None,
            primary_index: None,
        }
    }

    pub fn with_linked_to(mut self, target: impl Into<String>) -> Self {
        self.linked_to = Some(target.into());
        self
    }

    pub fn with_primary_index(mut self, index: u8) -> Self {
        self.primary_index = Some(index);
        self
    }

    /// `(index, role)` pairs in declaration order.
    pub fn pairs(&self) -> impl Iterator<Item = (u8, Role)> + '_ {
        self.indices.iter().copied().zip(self.roles.iter().copied())
    }

    /// Anchor index for relative shading.
    ///
    /// The explicit `primary_index` wins, then the first `base` index, then
    /// the first index. `None` only for an empty section.
    pub fn primary_index(&self) -> Option<u8> {
        self.primary_index
            .or_else(|| self.pairs().find(|(_, role)| *role == Role::Base).map(|(i, _)| i))
            .or_else(|| self.indices.first().copied())
    }

    fn is_linked_with(&self, other: &JobSection) -> bool {
        self.linked_to.as_deref() == Some(other.name.as_str())
            || other.linked_to.as_deref() == Some(self.name.as_str())
    }
}

/// All sections of one job's sprite template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMapping {
    pub job: String,
    pub sprite: String,
    pub sections: Vec<JobSection>,
}

impl SectionMapping {
    /// Parse and validate a mapping from JSON text.
    pub fn from_json(json: &str) -> Result<Self, SectionError> {
        let mapping: SectionMapping = serde_json::from_str(json)?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Load and validate a mapping file.
    pub fn load(path: &Path) -> Result<Self, SectionError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn section(&self, name: &str) -> Result<&JobSection, SectionError> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SectionError::UnknownSection(name.to_string()))
    }

    /// Names of sections that other sections link into.
    pub fn link_targets(&self) -> HashMap<&str, Vec<&str>> {
        let mut targets: HashMap<&str, Vec<&str>> = HashMap::new();
        for section in &self.sections {
            if let Some(target) = section.linked_to.as_deref() {
                targets.entry(target).or_default().push(section.name.as_str());
            }
        }
        targets
    }

    /// Every section driven by the same color input as `name`.
    ///
    /// Follows `linked_to` in both directions until no new section is
    /// reached, so siblings that link to a shared target belong to one
    /// group. Each section appears once, starting with `name`.
    pub fn link_group(&self, name: &str) -> Result<Vec<&JobSection>, SectionError> {
        let start = self.section(name)?;
        let targets = self.link_targets();

        let mut visited: HashSet<&str> = HashSet::from([start.name.as_str()]);
        let mut group = vec![start];
        let mut next = 0;
        while next < group.len() {
            let current = group[next];
            next += 1;

            let linked_from = targets.get(current.name.as_str()).into_iter().flatten().copied();
            for neighbor in current.linked_to.as_deref().into_iter().chain(linked_from) {
                if visited.insert(neighbor) {
                    group.push(self.section(neighbor)?);
                }
            }
        }
        Ok(group)
    }

    /// Check the structural invariants of the mapping.
    ///
    /// Every index must be < 16, indices and roles must be parallel, no
    /// index may repeat within a section, two sections may share an index
    /// only when one links to the other, and link targets must exist.
    pub fn validate(&self) -> Result<(), SectionError> {
        let mut errors = Vec::new();
        let mut names: HashMap<&str, usize> = HashMap::new();

        for section in &self.sections {
            *names.entry(section.name.as_str()).or_default() += 1;

            if section.indices.is_empty() {
                errors.push(format!("section '{}' has no indices", section.name));
            }
            if section.indices.len() != section.roles.len() {
                errors.push(format!(
                    "section '{}' has {} indices but {} roles",
                    section.name,
                    section.indices.len(),
                    section.roles.len()
                ));
            }
            let mut seen = [false; PALETTE_COLORS];
            for &index in &section.indices {
                if index as usize >= PALETTE_COLORS {
                    errors.push(format!(
                        "section '{}' references index {} (must be < {})",
                        section.name, index, PALETTE_COLORS
                    ));
                } else if std::mem::replace(&mut seen[index as usize], true) {
                    errors.push(format!("section '{}' repeats index {}", section.name, index));
                }
            }
            if let Some(primary) = section.primary_index {
                if !section.indices.contains(&primary) {
                    errors.push(format!(
                        "section '{}' primary index {} is not one of its indices",
                        section.name, primary
                    ));
                }
            }
        }

        for (name, count) in &names {
            if *count > 1 {
                errors.push(format!("section name '{}' is declared {} times", name, count));
            }
        }

        for section in &self.sections {
            if let Some(target) = section.linked_to.as_deref() {
                if !names.contains_key(target) {
                    errors.push(format!(
                        "section '{}' links to unknown section '{}'",
                        section.name, target
                    ));
                } else if target == section.name {
                    errors.push(format!("section '{}' links to itself", section.name));
                }
            }
        }

        // Index ownership: first owner of every index
        let mut owners: BTreeMap<u8, &JobSection> = BTreeMap::new();
        for section in &self.sections {
            for &index in &section.indices {
                match owners.get(&index) {
                    Some(owner) if !owner.is_linked_with(section) => errors.push(format!(
                        "index {} is owned by both '{}' and '{}'",
                        index, owner.name, section.name
                    )),
                    Some(_) => {}
                    None => {
                        owners.insert(index, section);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SectionError::Validation(errors))
        }
    }
}
