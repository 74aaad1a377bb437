//! Scene-edit operations
//!
//! The closed set of mutations the editor understands. Documents are only
//! built from validated JSON (see `validate`), never patched as text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A 2D float pair (`[x, y]`)
pub type Vec2 = [f64; 2];

/// Component name whose `value.path` points at an image asset
pub const TEXTURE_COMPONENT: &str = "Texture2D";

/// One atomic scene mutation; always targets at most one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    SpawnBox {
        pos: Vec2,
        size: Vec2,
        #[serde(rename = "colorHex", default, skip_serializing_if = "Option::is_none")]
        color_hex: Option<String>,
    },
    SetTransform {
        entity: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Vec2>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<Vec2>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<f64>,
    },
    RemoveEntity {
        entity: u32,
    },
    SetComponent {
        entity: u32,
        component: String,
        value: Map<String, Value>,
    },
}

impl Operation {
    /// Wire name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SpawnBox { .. } => "spawn_box",
            Operation::SetTransform { .. } => "set_transform",
            Operation::RemoveEntity { .. } => "remove_entity",
            Operation::SetComponent { .. } => "set_component",
        }
    }

    /// Texture path set by a `Texture2D` component operation
    pub fn texture_path(&self) -> Option<&str> {
        match self {
            Operation::SetComponent { component, value, .. } if component == TEXTURE_COMPONENT => {
                value.get("path").and_then(Value::as_str)
            }
            _ => None,
        }
    }
}

/// `{ "ops": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationsDocument {
    pub ops: Vec<Operation>,
}

impl OperationsDocument {
    pub fn new(ops: Vec<Operation>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Rewrite every `spawn_box.colorHex` as `#RRGGBBAA`
    ///
    /// Only called on validated documents, so colors are already 6 or 8 hex digits.
    pub fn normalize_colors(&mut self) {
        for op in &mut self.ops {
            if let Operation::SpawnBox {
                color_hex: Some(color), ..
            } = op
            {
                *color = normalize_color_hex(color);
            }
        }
    }
}

/// Uppercase, `#`-prefixed, opaque alpha appended to 6-digit colors
pub fn normalize_color_hex(color: &str) -> String {
    let digits = color.trim().trim_start_matches('#').to_ascii_uppercase();
    if digits.len() == 6 {
        format!("#{}FF", digits)
    } else {
        format!("#{}", digits)
    }
}

/// True for 6 or 8 hex digits with an optional leading `#`
pub fn is_color_hex(color: &str) -> bool {
    let digits = color.strip_prefix('#').unwrap_or(color);
    matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_spawn_box() {
        let op = Operation::SpawnBox {
            pos: [64.0, 128.0],
            size: [96.0, 32.0],
            color_hex: Some("#00FF00FF".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op":"spawn_box","pos":[64.0,128.0],"size":[96.0,32.0],"colorHex":"#00FF00FF"})
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let op = Operation::SetTransform {
            entity: 3,
            position: Some([32.0, 0.0]),
            scale: None,
            rotation: None,
        };
        let value = serde_json::to_value(&op).unwrap();
        assert!(value.get("scale").is_none());
        assert!(value.get("rotation").is_none());
        assert_eq!(value["entity"], 3);
    }

    #[test]
    fn test_texture_path() {
        let op: Operation = serde_json::from_value(json!({
            "op": "set_component",
            "entity": 2,
            "component": "Texture2D",
            "value": {"path": "Assets/Generated/stone.png"}
        }))
        .unwrap();
        assert_eq!(op.texture_path(), Some("Assets/Generated/stone.png"));
        assert_eq!(op.name(), "set_component");

        let sprite: Operation = serde_json::from_value(json!({
            "op": "set_component", "entity": 2, "component": "Sprite", "value": {"path": "x"}
        }))
        .unwrap();
        assert_eq!(sprite.texture_path(), None);
    }

    #[test]
    fn test_normalize_color_hex() {
        assert_eq!(normalize_color_hex("00ff00"), "#00FF00FF");
        assert_eq!(normalize_color_hex("#00ff0080"), "#00FF0080");
        assert_eq!(normalize_color_hex("#ABCDEF"), "#ABCDEFFF");
    }

    #[test]
    fn test_is_color_hex() {
        assert!(is_color_hex("#00FF00"));
        assert!(is_color_hex("00ff00aa"));
        assert!(!is_color_hex("#0F0"));
        assert!(!is_color_hex("green"));
        assert!(!is_color_hex("#00FF00F"));
        assert!(!is_color_hex("##00FF00"));
    }

    #[test]
    fn test_document_normalize_colors() {
        let mut doc = OperationsDocument::new(vec![
            Operation::SpawnBox {
                pos: [0.0, 0.0],
                size: [32.0, 32.0],
                color_hex: Some("#22aa22".to_string()),
            },
            Operation::SpawnBox {
                pos: [0.0, 0.0],
                size: [32.0, 32.0],
                color_hex: None,
            },
        ]);
        doc.normalize_colors();
        assert_eq!(
            doc.ops[0],
            Operation::SpawnBox {
                pos: [0.0, 0.0],
                size: [32.0, 32.0],
                color_hex: Some("#22AA22FF".to_string())
            }
        );
        assert!(matches!(doc.ops[1], Operation::SpawnBox { color_hex: None, .. }));
    }
}
