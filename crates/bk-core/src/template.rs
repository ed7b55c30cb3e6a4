//! Template JSON: a [`Scene`] plus catalogue metadata.
//!
//! ```json
//! { "id": "t1", "name": "Minimal", "width": 1050, "height": 600,
//!   "orientation": "landscape", "background": { "type": "solid", "color1": "#FFF" },
//!   "layers": [ { "props": { "type": "Text", "id": "title", ... }, "editable": true } ],
//!   "groups": [], "tags": [], "category": "business", "colors": [], "features": [] }
//! ```
//!
//! Unknown top-level keys are carried through untouched.

use crate::error::{CoreError, Result};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub scene: Scene,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Template {
    pub fn new(id: &str, name: &str, scene: Scene) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            scene,
            tags: Vec::new(),
            category: String::new(),
            colors: Vec::new(),
            features: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Parse and validate a template. Either the whole document is
    /// accepted or nothing is: the caller only ever sees a finished
    /// `Template` or an error.
    pub fn from_json(text: &str) -> Result<Self> {
        let template: Template = serde_json::from_str(text)
            .map_err(|e| CoreError::MalformedTemplateJson(e.to_string()))?;
        template.validated()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let template: Template = serde_json::from_value(value)
            .map_err(|e| CoreError::MalformedTemplateJson(e.to_string()))?;
        template.validated()
    }

    fn validated(mut self) -> Result<Self> {
        if !(self.scene.width > 0.0 && self.scene.height > 0.0) {
            return Err(CoreError::MalformedTemplateJson(format!(
                "card size {}x{} must be positive",
                self.scene.width, self.scene.height
            )));
        }
        self.scene.check_unique_ids()?;
        self.scene.repair_group_references()?;
        log::debug!(
            "loaded template `{}` with {} layers",
            self.id,
            self.scene.len()
        );
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::MalformedTemplateJson(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| CoreError::MalformedTemplateJson(e.to_string()))
    }
}
