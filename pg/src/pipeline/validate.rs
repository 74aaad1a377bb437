//! Operations schema validation
//!
//! Checks an untrusted JSON value against the closed operation schema and only
//! then converts it into a typed `OperationsDocument`.

use serde_json::{Map, Value};
use tracing::debug;

use super::ops::{OperationsDocument, TEXTURE_COMPONENT, is_color_hex};

/// Validate a candidate operations document
///
/// Returns the typed document, or a message naming the first offending
/// operation and field.
pub fn try_validate_ops(doc: &Value) -> Result<OperationsDocument, String> {
    debug!("try_validate_ops: called");
    let root = doc.as_object().ok_or("document must be a JSON object")?;
    let ops = root
        .get("ops")
        .and_then(Value::as_array)
        .ok_or("document must contain an 'ops' array")?;

    for (index, op) in ops.iter().enumerate() {
        validate_op(op).map_err(|e| format!("ops[{}]: {}", index, e))?;
    }

    serde_json::from_value(doc.clone()).map_err(|e| format!("operations do not match the schema: {}", e))
}

fn validate_op(op: &Value) -> Result<(), String> {
    let obj = op.as_object().ok_or("operation must be an object")?;
    let name = obj.get("op").and_then(Value::as_str).ok_or("missing 'op' string")?;

    if obj.contains_key("entities") {
        return Err(format!("{}: 'entities' is not allowed; emit one operation per entity", name));
    }

    match name {
        "spawn_box" => {
            require_vec2(obj, "pos")?;
            require_vec2(obj, "size")?;
            let bad_color = obj
                .get("colorHex")
                .is_some_and(|c| !c.is_null() && !c.as_str().is_some_and(is_color_hex));
            if bad_color {
                return Err("spawn_box: 'colorHex' must be 6 or 8 hex digits".to_string());
            }
        }
        "set_transform" => {
            require_entity(obj, name)?;
            optional_vec2(obj, "position")?;
            optional_vec2(obj, "scale")?;
            if obj.get("rotation").is_some_and(|r| !r.is_null() && !r.is_number()) {
                return Err("set_transform: 'rotation' must be a number".to_string());
            }
        }
        "remove_entity" => require_entity(obj, name)?,
        "set_component" => {
            require_entity(obj, name)?;
            let component = obj
                .get("component")
                .and_then(Value::as_str)
                .ok_or("set_component: 'component' must be a string")?;
            let value = obj
                .get("value")
                .and_then(Value::as_object)
                .ok_or("set_component: 'value' must be an object")?;
            if component == TEXTURE_COMPONENT && !value.get("path").is_some_and(Value::is_string) {
                return Err("set_component: Texture2D 'value.path' must be a string".to_string());
            }
        }
        other => return Err(format!("unknown operation: {}", other)),
    }
    Ok(())
}

fn require_entity(obj: &Map<String, Value>, name: &str) -> Result<(), String> {
    match obj.get("entity").and_then(Value::as_u64).and_then(|v| u32::try_from(v).ok()) {
        Some(_) => Ok(()),
        None => Err(format!("{}: 'entity' must be an unsigned 32-bit integer", name)),
    }
}

fn is_vec2(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.len() == 2 && items.iter().all(Value::is_number))
}

fn require_vec2(obj: &Map<String, Value>, field: &str) -> Result<(), String> {
    match obj.get(field) {
        Some(v) if is_vec2(v) => Ok(()),
        _ => Err(format!("'{}' must be an array of 2 numbers", field)),
    }
}

fn optional_vec2(obj: &Map<String, Value>, field: &str) -> Result<(), String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(v) if is_vec2(v) => Ok(()),
        Some(_) => Err(format!("'{}' must be an array of 2 numbers", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ops::Operation;
    use serde_json::json;

    #[test]
    fn test_accepts_every_variant() {
        let doc = json!({"ops": [
            {"op": "spawn_box", "pos": [0, 64], "size": [96, 32], "colorHex": "#00FF00FF"},
            {"op": "set_transform", "entity": 1, "position": [32, 32], "rotation": 90},
            {"op": "remove_entity", "entity": 4},
            {"op": "set_component", "entity": 2, "component": "Texture2D", "value": {"path": "Assets/Generated/a.png"}},
            {"op": "set_component", "entity": 2, "component": "Sprite", "value": {"colorHex": "#FF0000FF"}}
        ]});

        let parsed = try_validate_ops(&doc).unwrap();
        assert_eq!(parsed.ops.len(), 5);
        assert!(matches!(parsed.ops[2], Operation::RemoveEntity { entity: 4 }));
    }

    #[test]
    fn test_empty_ops_is_valid() {
        assert!(try_validate_ops(&json!({"ops": []})).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_missing_ops() {
        assert!(try_validate_ops(&json!({"operations": []})).unwrap_err().contains("'ops'"));
        assert!(try_validate_ops(&json!([])).is_err());
        assert!(try_validate_ops(&json!({"ops": {}})).is_err());
    }

    #[test]
    fn test_rejects_unknown_op() {
        let err = try_validate_ops(&json!({"ops": [{"op": "explode", "entity": 1}]})).unwrap_err();
        assert_eq!(err, "ops[0]: unknown operation: explode");
    }

    #[test]
    fn test_rejects_bad_vectors() {
        let err = try_validate_ops(&json!({"ops": [{"op": "spawn_box", "pos": [0], "size": [32, 32]}]})).unwrap_err();
        assert!(err.contains("'pos'"));

        let err =
            try_validate_ops(&json!({"ops": [{"op": "spawn_box", "pos": [0, "1"], "size": [32, 32]}]})).unwrap_err();
        assert!(err.contains("'pos'"));

        let err =
            try_validate_ops(&json!({"ops": [{"op": "set_transform", "entity": 1, "scale": [1, 2, 3]}]})).unwrap_err();
        assert!(err.contains("'scale'"));
    }

    #[test]
    fn test_rejects_bad_entity() {
        for entity in [json!(-1), json!("player"), json!(1.5), json!(5_000_000_000u64)] {
            let doc = json!({"ops": [{"op": "remove_entity", "entity": entity}]});
            assert!(try_validate_ops(&doc).unwrap_err().contains("'entity'"));
        }
        assert!(try_validate_ops(&json!({"ops": [{"op": "remove_entity"}]})).is_err());
    }

    #[test]
    fn test_rejects_grouped_entities() {
        let doc = json!({"ops": [{"op": "remove_entity", "entity": 1, "entities": [1, 2]}]});
        assert!(try_validate_ops(&doc).unwrap_err().contains("one operation per entity"));
    }

    #[test]
    fn test_texture_requires_path() {
        let doc = json!({"ops": [{"op": "set_component", "entity": 1, "component": "Texture2D", "value": {}}]});
        assert!(try_validate_ops(&doc).unwrap_err().contains("value.path"));

        let doc = json!({"ops": [{"op": "set_component", "entity": 1, "component": "Texture2D", "value": "x.png"}]});
        assert!(try_validate_ops(&doc).unwrap_err().contains("'value'"));
    }

    #[test]
    fn test_rejects_bad_color() {
        let doc = json!({"ops": [{"op": "spawn_box", "pos": [0, 0], "size": [32, 32], "colorHex": "green"}]});
        assert!(try_validate_ops(&doc).unwrap_err().contains("colorHex"));
    }

    #[test]
    fn test_reports_index_of_first_bad_op() {
        let doc = json!({"ops": [
            {"op": "remove_entity", "entity": 1},
            {"op": "remove_entity", "entity": 2},
            {"nope": true}
        ]});
        assert_eq!(try_validate_ops(&doc).unwrap_err(), "ops[2]: missing 'op' string");
    }
}
