use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One column description of a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateKey {
    pub key: String,
    pub kind: String,
    pub tag: String,
}

/// Column descriptions for a CSV layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "data")]
    pub keys: Vec<TemplateKey>,
}

impl Template {
    /// Parse a template from a JSON array of keys
    pub fn from_json(json: &str) -> Result<Self> {
        let keys: Vec<TemplateKey> = serde_json::from_str(json)?;
        Ok(Template { keys })
    }
}
