//! Fixed-option sub-generator backend.
//!
//! Parses the OpenAPI contract and renders DTOs plus the skeleton interface
//! into an in-memory filesystem. Options are fixed; declarations cannot
//! reconfigure the backend.

use std::collections::BTreeSet;

use anyhow::{anyhow, Context};
use askama::Template;
use serde_json::Value;

use crate::contract::Contract;
use crate::skeleton::memfs::MemFs;
use crate::skeleton::schema::{extract_fields, is_named_type, schema_to_type, to_camel_case};
use crate::templates::{ApiServiceTemplateData, DtoTemplateData, OperationSig};

/// Generation options. Every run uses [`BackendOptions::fixed`]; the struct
/// exists so the fixed profile is visible and testable rather than scattered.
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub interface_only: bool,
    pub use_validation: bool,
    pub model_mutable: bool,
    pub serialization: &'static str,
}

impl BackendOptions {
    /// The single supported profile: interfaces only, validation on,
    /// immutable models, JSON serialization.
    pub fn fixed() -> Self {
        Self {
            interface_only: true,
            use_validation: true,
            model_mutable: false,
            serialization: "json",
        }
    }
}

/// A sub-generator that turns a contract into skeleton sources rooted at
/// `out_root` inside the given in-memory filesystem.
pub trait SkeletonBackend {
    fn generate(
        &self,
        contract: &Contract,
        opts: &BackendOptions,
        out_root: &str,
        fs: &mut MemFs,
    ) -> anyhow::Result<()>;
}

/// The OpenAPI-driven backend. Accepts a filesystem path or an http(s) URL
/// as the contract location and sniffs YAML versus JSON by extension.
#[derive(Debug, Default)]
pub struct OpenApiBackend;

impl OpenApiBackend {
    pub fn new() -> Self {
        Self
    }

    fn load_document(location: &str) -> anyhow::Result<String> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = url::Url::parse(location)
                .with_context(|| format!("invalid contract URL `{location}`"))?;
            let body = reqwest::blocking::get(url)
                .with_context(|| format!("failed to fetch contract from `{location}`"))?
                .error_for_status()?
                .text()?;
            Ok(body)
        } else {
            std::fs::read_to_string(location)
                .with_context(|| format!("failed to read contract file `{location}`"))
        }
    }

    fn parse_document(location: &str, content: &str) -> anyhow::Result<Value> {
        let doc: Value = if location.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("invalid JSON contract `{location}`"))?
        } else {
            serde_yaml::from_str(content)
                .with_context(|| format!("invalid YAML contract `{location}`"))?
        };
        if doc.get("openapi").is_none() {
            return Err(anyhow!("contract `{location}` has no `openapi` version field"));
        }
        Ok(doc)
    }

    /// Resolve the payload type of a request body or response.
    fn content_type_of(node: &Value) -> Option<String> {
        let schema = node
            .get("content")?
            .get("application/json")?
            .get("schema")?;
        Some(schema_to_type(schema))
    }

    fn operations_of(doc: &Value) -> Vec<OperationSig> {
        let mut ops = Vec::new();
        let Some(paths) = doc.get("paths").and_then(|p| p.as_object()) else {
            return ops;
        };
        for item in paths.values() {
            let Some(methods) = item.as_object() else {
                continue;
            };
            for (method, op) in methods {
                if !matches!(
                    method.as_str(),
                    "get" | "put" | "post" | "delete" | "patch" | "head" | "options" | "trace"
                ) {
                    continue;
                }
                let Some(op_id) = op.get("operationId").and_then(|v| v.as_str()) else {
                    continue;
                };
                let dto = op
                    .get("requestBody")
                    .and_then(Self::content_type_of)
                    .unwrap_or_else(|| "serde_json::Value".to_string());
                let reply = op
                    .get("responses")
                    .and_then(|r| r.get("200").or_else(|| r.get("201")))
                    .and_then(Self::content_type_of)
                    .unwrap_or_else(|| "serde_json::Value".to_string());
                ops.push(OperationSig {
                    name: op_id.to_string(),
                    param: "body".to_string(),
                    dto,
                    ret: format!("ApiResponse<{reply}>"),
                });
            }
        }
        ops
    }
}

impl SkeletonBackend for OpenApiBackend {
    fn generate(
        &self,
        contract: &Contract,
        opts: &BackendOptions,
        out_root: &str,
        fs: &mut MemFs,
    ) -> anyhow::Result<()> {
        let content = Self::load_document(&contract.spec)?;
        let doc = Self::parse_document(&contract.spec, &content)?;

        let dto_dir = contract.packages.dto.replace('.', "/");
        let api_dir = contract.packages.api.replace('.', "/");

        // One data class per named schema.
        if let Some(schemas) = doc
            .pointer("/components/schemas")
            .and_then(|s| s.as_object())
        {
            for (raw_name, schema) in schemas {
                let name = to_camel_case(raw_name);
                let fields = extract_fields(schema);
                let imports: BTreeSet<String> = fields
                    .iter()
                    .filter(|f| is_named_type(&f.ty))
                    .map(|f| {
                        f.ty.strip_prefix("Vec<")
                            .and_then(|s| s.strip_suffix('>'))
                            .unwrap_or(&f.ty)
                            .to_string()
                    })
                    .filter(|ty| *ty != name)
                    .collect();
                let rendered = DtoTemplateData {
                    name: name.clone(),
                    fields,
                    imports: imports.into_iter().collect(),
                    validation: opts.use_validation,
                }
                .render()
                .with_context(|| format!("failed to render DTO `{name}`"))?;
                fs.write(format!("{out_root}/{dto_dir}/{name}.rs"), rendered);
            }
        }

        // The skeleton interface, interface-only.
        let operations = Self::operations_of(&doc);
        let dto_prefix = contract.packages.dto.replace('.', "::");
        let imports: BTreeSet<String> = operations
            .iter()
            .flat_map(|op| {
                let reply = op
                    .ret
                    .strip_prefix("ApiResponse<")
                    .and_then(|s| s.strip_suffix('>'))
                    .unwrap_or(&op.ret);
                [op.dto.clone(), reply.to_string()]
            })
            .filter(|ty| is_named_type(ty))
            .map(|ty| {
                let inner = ty
                    .strip_prefix("Vec<")
                    .and_then(|s| s.strip_suffix('>'))
                    .unwrap_or(&ty);
                format!("{dto_prefix}::{inner}")
            })
            .collect();
        let rendered = ApiServiceTemplateData {
            resource: contract.resource.clone(),
            operations,
            imports: imports.into_iter().collect(),
        }
        .render()
        .with_context(|| format!("failed to render `{}ApiService`", contract.resource))?;
        fs.write(
            format!("{out_root}/{api_dir}/{}ApiService.rs", contract.resource),
            rendered,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPEC: &str = r#"
openapi: 3.1.0
info:
  title: Orders
  version: "1.0"
paths:
  /orders:
    post:
      operationId: submit
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/order'
      responses:
        "200":
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/receipt'
components:
  schemas:
    order:
      type: object
      required: [id]
      properties:
        id: { type: string }
        total: { type: number }
    receipt:
      type: object
      properties:
        ref: { type: string }
"#;

    fn test_contract(spec_path: &str) -> Contract {
        use crate::contract::{normalize, RawContract};
        use crate::placeholder::PlaceholderResolver;
        let raw = RawContract {
            name: "OrderApi".to_string(),
            spec: spec_path.to_string(),
            cluster: "orders".to_string(),
            ..RawContract::default()
        };
        normalize(&raw, &PlaceholderResolver::from_process()).unwrap()
    }

    #[test]
    fn fixed_profile() {
        let opts = BackendOptions::fixed();
        assert!(opts.interface_only);
        assert!(opts.use_validation);
        assert!(!opts.model_mutable);
        assert_eq!(opts.serialization, "json");
    }

    #[test]
    fn operation_extraction_from_document() {
        let doc: Value = serde_yaml::from_str(SPEC).unwrap();
        let ops = OpenApiBackend::operations_of(&doc);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].name, "submit");
        assert_eq!(ops[0].dto, "Order");
        assert_eq!(ops[0].ret, "ApiResponse<Receipt>");
    }

    #[test]
    fn operations_without_id_are_skipped() {
        let doc = json!({
            "openapi": "3.1.0",
            "paths": {"/x": {"get": {"responses": {}}}}
        });
        assert!(OpenApiBackend::operations_of(&doc).is_empty());
    }

    #[test]
    fn generates_dtos_and_interface_into_memfs() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("orders.yaml");
        std::fs::write(&spec_path, SPEC).unwrap();

        let contract = test_contract(spec_path.to_str().unwrap());
        let mut fs = MemFs::new();
        OpenApiBackend::new()
            .generate(&contract, &BackendOptions::fixed(), "/gen/src", &mut fs)
            .unwrap();

        let order = fs.read("/gen/src/summer/gen/dto/Order.rs").unwrap();
        assert!(order.contains("pub struct Order"));
        assert!(order.contains("pub total: Option<f64>"));
        let api = fs
            .read("/gen/src/summer/gen/api/OrderApiService.rs")
            .unwrap();
        assert!(api.contains("pub trait OrderApiService"));
        assert!(api.contains("fn submit(&self, body: Order) -> ApiResponse<Receipt>;"));
    }

    #[test]
    fn rejects_document_without_version() {
        let err = OpenApiBackend::parse_document("x.yaml", "info: {}").unwrap_err();
        assert!(err.to_string().contains("openapi"));
    }
}
