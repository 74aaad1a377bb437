//! Pipeline input

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One natural-language command plus the editor's current scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    #[serde(default)]
    pub scene: Option<Value>,
}

impl Command {
    pub fn new(text: impl Into<String>, scene: Option<Value>) -> Self {
        Self {
            text: text.into(),
            scene,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Scene as compact JSON, `null` when absent
    pub fn scene_json(&self) -> String {
        match &self.scene {
            Some(scene) => scene.to_string(),
            None => "null".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blank() {
        assert!(Command::new("  \n\t", None).is_blank());
        assert!(!Command::new("add a box", None).is_blank());
    }

    #[test]
    fn test_scene_json() {
        assert_eq!(Command::new("x", None).scene_json(), "null");
        assert_eq!(
            Command::new("x", Some(json!({"entities": []}))).scene_json(),
            r#"{"entities":[]}"#
        );
    }
}
