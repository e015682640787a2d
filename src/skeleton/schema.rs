//! OpenAPI schema → DTO field mapping.

use crate::templates::FieldDef;
use serde_json::Value;

/// Convert a snake_case or kebab-case schema name to UpperCamel.
pub fn to_camel_case(s: &str) -> String {
    s.split(|c| c == '_' || c == '-')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Whether a type string names a custom DTO type rather than a primitive.
pub fn is_named_type(ty: &str) -> bool {
    let primitives = [
        "String",
        "i32",
        "i64",
        "f32",
        "f64",
        "bool",
        "Value",
        "serde_json::Value",
    ];
    let inner = ty
        .strip_prefix("Vec<")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(ty);
    !primitives.contains(&inner)
        && !inner.starts_with("serde_json")
        && matches!(inner.chars().next(), Some('A'..='Z'))
}

fn sanitize_field_name(name: &str) -> String {
    const KEYWORDS: &[&str] = &[
        "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn",
        "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
        "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
        "where", "while", "async", "await", "dyn",
    ];
    let mut s: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.is_empty() {
        s = "_".to_string();
    }
    if s.chars()
        .next()
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
    {
        s.insert(0, '_');
    }
    if KEYWORDS.contains(&s.as_str()) {
        format!("r#{s}")
    } else {
        s
    }
}

/// Map a JSON Schema to a Rust type string.
pub fn schema_to_type(schema: &Value) -> String {
    if let Some(r) = schema.get("$ref").and_then(|v| v.as_str()) {
        if let Some(name) = r.strip_prefix("#/components/schemas/") {
            return to_camel_case(name);
        }
        return "serde_json::Value".to_string();
    }
    match schema.get("type").and_then(|t| t.as_str()) {
        Some("string") => "String".to_string(),
        Some("integer") => "i64".to_string(),
        Some("number") => "f64".to_string(),
        Some("boolean") => "bool".to_string(),
        Some("array") => match schema.get("items") {
            Some(items) => format!("Vec<{}>", schema_to_type(items)),
            None => "Vec<serde_json::Value>".to_string(),
        },
        _ => "serde_json::Value".to_string(),
    }
}

/// Extract DTO fields from an object schema.
pub fn extract_fields(schema: &Value) -> Vec<FieldDef> {
    let required: Vec<String> = schema
        .get("required")
        .and_then(|v| v.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let mut fields = Vec::new();
    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (name, prop) in props {
            fields.push(FieldDef {
                name: sanitize_field_name(name),
                original_name: name.clone(),
                ty: schema_to_type(prop),
                optional: !required.contains(name),
            });
        }
    }
    fields
}
