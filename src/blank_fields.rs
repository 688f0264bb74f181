use serde_json::{Map as JsonMap, Value as JsonValue};

/// Remove fields whose value is an empty string or null.
///
/// Only the top level of the payload is touched; nested objects are opaque.
pub fn strip_blank_fields(fields: &mut JsonMap<String, JsonValue>) {
    fields.retain(|_, value| !is_blank(value));
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}
