//! Operation harvesting from a rendered skeleton interface.
//!
//! The bridge synthesizer and the wrapper stack both key off the first
//! operation of the `<Resource>ApiService` trait. Signatures are recovered
//! from the emitted source text so the bridge is guaranteed to mirror
//! exactly what downstream code will compile against.

use once_cell::sync::Lazy;
use regex::Regex;

static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"fn\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*&self\s*,\s*([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([^)]+?)\s*\)\s*->\s*([^;{]+)")
        .unwrap_or_else(|e| panic!("invalid method signature pattern: {e}"))
});

/// One method of the skeleton interface, as declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub param: String,
    /// The DTO parameter type conveyed across the channel
    pub dto: String,
    /// Declared return type, verbatim
    pub ret: String,
}

impl OperationDescriptor {
    /// The reply payload carried inside the declared return. Returns the
    /// generic argument of `ApiResponse<..>`, or the JSON top type when the
    /// return declares no payload.
    pub fn reply_payload(&self) -> String {
        self.ret
            .strip_prefix("ApiResponse<")
            .and_then(|s| s.strip_suffix('>'))
            .map(str::to_string)
            .unwrap_or_else(|| "serde_json::Value".to_string())
    }
}

/// Extract every `&self` method signature from skeleton interface source.
pub fn extract_operations(source: &str) -> Vec<OperationDescriptor> {
    METHOD_RE
        .captures_iter(source)
        .map(|cap| OperationDescriptor {
            name: cap[1].to_string(),
            param: cap[2].to_string(),
            dto: cap[3].trim().to_string(),
            ret: cap[4].trim().to_string(),
        })
        .collect()
}

/// The first declared operation, which the bridge and stack are built from.
pub fn first_operation(source: &str) -> Option<OperationDescriptor> {
    extract_operations(source).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAIT_SRC: &str = r#"
pub trait OrderApiService: Send + Sync {
    fn submit(&self, body: Order) -> ApiResponse<Receipt>;
    fn cancel(&self, body: CancelRequest) -> ApiResponse<serde_json::Value>;
}
"#;

    #[test]
    fn extracts_all_signatures() {
        let ops = extract_operations(TRAIT_SRC);
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "submit");
        assert_eq!(ops[0].param, "body");
        assert_eq!(ops[0].dto, "Order");
        assert_eq!(ops[0].ret, "ApiResponse<Receipt>");
        assert_eq!(ops[1].name, "cancel");
    }

    #[test]
    fn first_operation_is_declaration_order() {
        let op = first_operation(TRAIT_SRC).unwrap();
        assert_eq!(op.name, "submit");
    }

    #[test]
    fn reply_payload_unwraps_api_response() {
        let op = first_operation(TRAIT_SRC).unwrap();
        assert_eq!(op.reply_payload(), "Receipt");
    }

    #[test]
    fn reply_payload_falls_back_to_json_value() {
        let op = OperationDescriptor {
            name: "f".to_string(),
            param: "body".to_string(),
            dto: "X".to_string(),
            ret: "Status".to_string(),
        };
        assert_eq!(op.reply_payload(), "serde_json::Value");
    }

    #[test]
    fn empty_trait_has_no_operations() {
        assert!(first_operation("pub trait EmptyApiService {}").is_none());
    }
}
