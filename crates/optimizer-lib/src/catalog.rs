//! Instance catalog
//!
//! Static reference data describing the instance types the engine can
//! recommend. Declaration order matters: candidate searches walk the catalog
//! front to back and the first qualifying entry wins.

use crate::models::InstanceType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered list of known instance types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceCatalog {
    types: Vec<InstanceType>,
}

impl InstanceCatalog {
    pub fn new(types: Vec<InstanceType>) -> Self {
        Self { types }
    }

    /// General purpose burstable types priced for us-east-1 on-demand
    pub fn aws_general_purpose() -> Self {
        Self::new(vec![
            InstanceType::new("t3.micro", 2, 1.0, 0.0104),
            InstanceType::new("t3.small", 2, 2.0, 0.0208),
            InstanceType::new("t3.medium", 2, 4.0, 0.0416),
            InstanceType::new("t3.large", 2, 8.0, 0.0832),
            InstanceType::new("t3.xlarge", 4, 16.0, 0.1664),
            InstanceType::new("t3.2xlarge", 8, 32.0, 0.3328),
        ])
    }

    /// Load a catalog from a JSON array of instance types
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let types: Vec<InstanceType> =
            serde_json::from_str(&content).context("Failed to parse catalog")?;
        Ok(Self::new(types))
    }

    /// Exact, case-sensitive lookup by type name
    pub fn lookup(&self, name: &str) -> Option<&InstanceType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &InstanceType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for InstanceCatalog {
    fn default() -> Self {
        Self::aws_general_purpose()
    }
}
