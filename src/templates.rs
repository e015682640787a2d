//! Askama template data for every emitted source kind.
//!
//! The sub-generator renders DTOs and the API skeleton interface; the bridge
//! synthesizer and the wrapper stack render everything else. One template
//! struct per source kind, templates live in `templates/`.

use askama::Template;

/// A DTO field extracted from an OpenAPI schema.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Sanitized Rust field name
    pub name: String,
    /// Original property name from the schema (for serde rename)
    pub original_name: String,
    /// Rust type (e.g. `String`, `i64`, `Vec<Item>`)
    pub ty: String,
    /// Whether the property is optional (`Option<T>`)
    pub optional: bool,
}

impl FieldDef {
    /// Whether the serialized name differs from the Rust field name.
    pub fn renamed(&self) -> bool {
        self.name != self.original_name
    }
}

/// One skeleton interface method.
#[derive(Debug, Clone)]
pub struct OperationSig {
    /// Method name (operationId verbatim)
    pub name: String,
    /// First parameter name
    pub param: String,
    /// DTO type conveyed across the channel
    pub dto: String,
    /// Declared return, e.g. `ApiResponse<Order>`
    pub ret: String,
}

/// Data class under the `dto` package.
#[derive(Template)]
#[template(path = "dto.rs.txt", escape = "none")]
pub struct DtoTemplateData {
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Sibling DTO types referenced by the fields
    pub imports: Vec<String>,
    /// Emit validation derives (fixed on by the skeleton generator)
    pub validation: bool,
}

/// `<Resource>ApiService` interface under the `api` package.
#[derive(Template)]
#[template(path = "api_service.rs.txt", escape = "none")]
pub struct ApiServiceTemplateData {
    pub resource: String,
    pub operations: Vec<OperationSig>,
    /// `use` paths for the DTO types (module form, e.g. `summer::gen::dto::Order`)
    pub imports: Vec<String>,
}

/// SYNC bridge: skeleton interface → injected handler.
#[derive(Template)]
#[template(path = "service_impl_sync.rs.txt", escape = "none")]
pub struct SyncBridgeTemplateData {
    pub resource: String,
    pub api_path: String,
    pub dto_path: String,
    pub handler_path: String,
    pub dto: String,
    pub op_name: String,
    pub param: String,
    pub ret: String,
}

/// ASYNC bridge: skeleton interface → injected channel.
#[derive(Template)]
#[template(path = "service_impl_async.rs.txt", escape = "none")]
pub struct AsyncBridgeTemplateData {
    pub resource: String,
    pub api_path: String,
    pub dto_path: String,
    pub dto: String,
    pub op_name: String,
    pub param: String,
    pub ret: String,
    /// Reply payload type (declared result or the `serde_json::Value` top type)
    pub reply_ty: String,
    pub send_channel: String,
    /// `request` + 200 when true, `send` + 202 otherwise
    pub request_reply: bool,
}

/// Base channel: placeholder queue pair, the only transport-bearing layer.
#[derive(Template)]
#[template(path = "base_channel.rs.txt", escape = "none")]
pub struct BaseChannelTemplateData {
    pub struct_name: String,
    pub qualifier: String,
    pub dto_path: String,
    pub dto: String,
    /// `dto` or `Vec<dto>` when the stack batches
    pub payload: String,
}

/// Retry wrapper source.
#[derive(Template)]
#[template(path = "retry_channel.rs.txt", escape = "none")]
pub struct RetryChannelTemplateData {
    pub struct_name: String,
    pub qualifier: String,
    pub inner_qualifier: String,
    pub dto_path: String,
    pub dto: String,
    pub payload: String,
    /// `<= 0` retries indefinitely
    pub max_retries: i32,
}

/// Circuit-breaker wrapper source.
#[derive(Template)]
#[template(path = "breaker_channel.rs.txt", escape = "none")]
pub struct BreakerChannelTemplateData {
    pub struct_name: String,
    pub qualifier: String,
    pub inner_qualifier: String,
    pub dto_path: String,
    pub dto: String,
    pub payload: String,
    pub threshold: u32,
    pub delay_secs: u64,
}

/// Dead-letter wrapper source.
#[derive(Template)]
#[template(path = "dlq_channel.rs.txt", escape = "none")]
pub struct DlqChannelTemplateData {
    pub struct_name: String,
    pub qualifier: String,
    pub inner_qualifier: String,
    pub dlq_qualifier: String,
    pub dto_path: String,
    pub dto: String,
    pub payload: String,
}

/// Batching wrapper source (always the outermost layer when present).
#[derive(Template)]
#[template(path = "batch_channel.rs.txt", escape = "none")]
pub struct BatchChannelTemplateData {
    pub struct_name: String,
    pub qualifier: String,
    pub inner_qualifier: String,
    pub dto_path: String,
    pub dto: String,
    pub size: u32,
    pub interval_ms: u64,
}

/// Request/reply correlator emitted alongside the stack.
#[derive(Template)]
#[template(path = "correlator.rs.txt", escape = "none")]
pub struct CorrelatorTemplateData {
    pub struct_name: String,
    pub send_qualifier: String,
    pub reply_qualifier: String,
    pub dto_path: String,
    pub dto: String,
    pub reply_ty: String,
    pub timeout_secs: u64,
}
