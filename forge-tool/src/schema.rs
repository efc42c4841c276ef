use schemars::{JsonSchema, r#gen::SchemaSettings};
use serde_json::Value;

/// Generate a Gemini-compatible schema (no $schema, $ref, or definitions)
pub fn generate_gemini_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::openapi3().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let generator = schemars::r#gen::SchemaGenerator::new(settings);
    let mut schema = generator.into_root_schema_for::<T>();
    schema.schema.metadata().title = None;

    let mut value = serde_json::to_value(schema.schema).unwrap_or_else(|_| {
        serde_json::json!({ "type": "object", "properties": {} })
    });
    clean_schema(&mut value);
    value
}

/// Remove fields that Gemini doesn't support
fn clean_schema(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove("$schema");
        map.remove("definitions");
        map.remove("$ref");
        map.remove("additionalProperties");

        for (_, v) in map.iter_mut() {
            clean_schema(v);
        }
    } else if let Value::Array(arr) = value {
        for v in arr.iter_mut() {
            clean_schema(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Inner {
        depth: u32,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    #[serde(deny_unknown_fields)]
    struct Params {
        /// Project to inspect
        project_name: String,
        inner: Option<Inner>,
    }

    #[test]
    fn test_schema_is_flat_and_untitled() {
        let schema = generate_gemini_schema::<Params>();
        assert_eq!(schema["type"], "object");
        assert!(schema.get("title").is_none());
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("definitions").is_none());
        assert!(schema.get("additionalProperties").is_none());
        assert_eq!(schema["properties"]["project_name"]["type"], "string");
        assert_eq!(schema["properties"]["project_name"]["description"], "Project to inspect");
        // nested struct inlined instead of referenced
        assert!(schema["properties"]["inner"].get("$ref").is_none());
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 1);
    }
}
