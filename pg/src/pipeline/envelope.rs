//! Response envelopes returned to the editor
//!
//! Every envelope serializes with an explicit `kind` discriminator.

use serde::{Deserialize, Serialize};

use super::ops::{Operation, OperationsDocument};

/// Generated image, carried inline as base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub file_name: String,
    /// Project-relative path the editor should save the file under
    pub path: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Generated Lua script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDescriptor {
    pub file_name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    Text { message: String },
    Ops { ops: Vec<Operation> },
    Asset(AssetDescriptor),
    Script(ScriptDescriptor),
    /// Never contains another bundle when built with [`ResponseEnvelope::bundle`]
    Bundle { items: Vec<ResponseEnvelope> },
}

impl ResponseEnvelope {
    pub fn text(message: impl Into<String>) -> Self {
        ResponseEnvelope::Text {
            message: message.into(),
        }
    }

    pub fn ops(doc: OperationsDocument) -> Self {
        ResponseEnvelope::Ops { ops: doc.ops }
    }

    /// Build a bundle, lifting the items of any nested bundle into this one
    pub fn bundle(items: impl IntoIterator<Item = ResponseEnvelope>) -> Self {
        let mut flat = Vec::new();
        for item in items {
            item.flatten_into(&mut flat);
        }
        ResponseEnvelope::Bundle { items: flat }
    }

    fn flatten_into(self, out: &mut Vec<ResponseEnvelope>) {
        match self {
            ResponseEnvelope::Bundle { items } => {
                for item in items {
                    item.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }

    /// The `kind` discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseEnvelope::Text { .. } => "text",
            ResponseEnvelope::Ops { .. } => "ops",
            ResponseEnvelope::Asset(_) => "asset",
            ResponseEnvelope::Script(_) => "script",
            ResponseEnvelope::Bundle { .. } => "bundle",
        }
    }
}

impl From<AssetDescriptor> for ResponseEnvelope {
    fn from(asset: AssetDescriptor) -> Self {
        ResponseEnvelope::Asset(asset)
    }
}

impl From<ScriptDescriptor> for ResponseEnvelope {
    fn from(script: ScriptDescriptor) -> Self {
        ResponseEnvelope::Script(script)
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_wire_format() {
        let v = serde_json::to_value(ResponseEnvelope::text("hello")).unwrap();
        assert_eq!(v, json!({"kind": "text", "message": "hello"}));
    }

    #[test]
    fn test_ops_wire_format() {
        let doc = OperationsDocument::new(vec![Operation::RemoveEntity { entity: 3 }]);
        let v = serde_json::to_value(ResponseEnvelope::ops(doc)).unwrap();
        assert_eq!(v, json!({"kind": "ops", "ops": [{"op": "remove_entity", "entity": 3}]}));
    }

    #[test]
    fn test_asset_wire_format() {
        let asset = AssetDescriptor {
            file_name: "20250101_120000000.png".to_string(),
            path: "Assets/Generated/20250101_120000000.png".to_string(),
            data: b"PNG".to_vec(),
        };
        let v = serde_json::to_value(ResponseEnvelope::from(asset.clone())).unwrap();
        assert_eq!(
            v,
            json!({
                "kind": "asset",
                "fileName": "20250101_120000000.png",
                "path": "Assets/Generated/20250101_120000000.png",
                "data": "UE5H"
            })
        );

        let back: ResponseEnvelope = serde_json::from_value(v).unwrap();
        assert_eq!(back, ResponseEnvelope::Asset(asset));
    }

    #[test]
    fn test_script_wire_format() {
        let script = ScriptDescriptor {
            file_name: "patrol.lua".to_string(),
            code: "function on_update(dt) end".to_string(),
        };
        let v = serde_json::to_value(ResponseEnvelope::from(script)).unwrap();
        assert_eq!(
            v,
            json!({"kind": "script", "fileName": "patrol.lua", "code": "function on_update(dt) end"})
        );
    }

    #[test]
    fn test_bundle_flattens_nested_bundles() {
        let nested = ResponseEnvelope::bundle([ResponseEnvelope::text("a"), ResponseEnvelope::text("b")]);
        let bundle = ResponseEnvelope::bundle([nested, ResponseEnvelope::text("c")]);

        let ResponseEnvelope::Bundle { items } = &bundle else {
            panic!("expected bundle");
        };
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.kind() == "text"));

        let v = serde_json::to_value(&bundle).unwrap();
        assert_eq!(v["kind"], "bundle");
        assert_eq!(v["items"][2]["message"], "c");
    }

    #[test]
    fn test_bad_base64_is_rejected() {
        let result: Result<ResponseEnvelope, _> =
            serde_json::from_value(json!({"kind": "asset", "fileName": "a.png", "path": "p", "data": "***"}));
        assert!(result.is_err());
    }
}
