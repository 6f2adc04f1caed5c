use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// A desired group role.
///
/// For example:
///
/// ```json
/// {
///   "name": "app_group",
///   "inherit": true,
///   "privileges": ["CONNECT"],
///   "databases": ["app"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Whether members inherit the group's privileges without `SET ROLE`.
    #[serde(default = "default_true")]
    pub inherit: bool,
    #[serde(default)]
    pub privileges: Vec<String>,
    #[serde(default)]
    pub databases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inherit: true,
            privileges: vec![],
            databases: vec![],
            description: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("group name is empty"));
        }

        Ok(())
    }
}
