use serde_yaml::Value;

/// Human readable name of a YAML value's shape, used in error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Render a value as compact single line YAML for logs and errors
pub fn value_preview(value: &Value) -> String {
    match serde_yaml::to_string(value) {
        Ok(text) => {
            let text = text.trim_end().replace('\n', " ");
            if text.chars().count() > 80 {
                let mut short: String = text.chars().take(77).collect();
                short.push_str("...");
                short
            } else {
                text
            }
        }
        Err(_) => value_kind(value).to_string(),
    }
}
