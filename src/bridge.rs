//! Service bridge synthesis.
//!
//! Takes the harvested skeleton and produces the `<Resource>ApiServiceImpl`
//! source that connects the generated interface to either an injected
//! handler (SYNC) or an injected channel (ASYNC). The bridge method mirrors
//! the first skeleton operation signature exactly.

use askama::Template;

use crate::contract::{ChannelSpec, Contract, Mode};
use crate::errors::PipelineError;
use crate::skeleton::{first_operation, ApiSkeleton};
use crate::templates::{AsyncBridgeTemplateData, SyncBridgeTemplateData};

/// A synthesized bridge source, plus the channel it binds to for ASYNC
/// declarations (the stack generator builds the matching wrapper chain).
#[derive(Debug)]
pub struct BridgeSource {
    pub fqn: String,
    pub source: String,
    pub channel: Option<ChannelSpec>,
}

fn module_path(package: &str) -> String {
    package.replace('.', "::")
}

/// Synthesize the bridge for one contract from its harvested skeleton.
pub fn synthesize(
    contract: &Contract,
    skeleton: &ApiSkeleton,
) -> Result<BridgeSource, PipelineError> {
    let interface = ApiSkeleton::interface_fqn(contract);
    let source = skeleton
        .interface_source(contract)
        .ok_or_else(|| PipelineError::DegenerateSkeleton {
            message: format!("`{interface}` missing from harvested skeleton"),
        })?;
    let op = first_operation(source).ok_or_else(|| PipelineError::DegenerateSkeleton {
        message: format!("`{interface}` declares no operations"),
    })?;

    let fqn = format!(
        "{}.{}ApiServiceImpl",
        contract.packages.service, contract.resource
    );
    let api_path = module_path(&contract.packages.api);
    let dto_path = module_path(&contract.packages.dto);

    let rendered = match contract.mode {
        Mode::Sync => SyncBridgeTemplateData {
            resource: contract.resource.clone(),
            api_path,
            dto_path,
            handler_path: module_path(&contract.packages.handler),
            dto: op.dto.clone(),
            op_name: op.name.clone(),
            param: op.param.clone(),
            ret: op.ret.clone(),
        }
        .render(),
        Mode::Async => {
            let spec = contract.channel_spec(&op.name);
            AsyncBridgeTemplateData {
                resource: contract.resource.clone(),
                api_path,
                dto_path,
                dto: op.dto.clone(),
                op_name: op.name.clone(),
                param: op.param.clone(),
                ret: op.ret.clone(),
                reply_ty: op.reply_payload(),
                send_channel: spec.send.clone(),
                request_reply: contract.request_reply,
            }
            .render()
        }
    }
    .map_err(|e| PipelineError::SkeletonGenerationFailed {
        message: format!("failed to render `{fqn}`: {e}"),
    })?;

    let channel = match contract.mode {
        Mode::Sync => None,
        Mode::Async => Some(contract.channel_spec(&op.name)),
    };
    tracing::debug!(declaration = %contract.name, bridge = %fqn, mode = ?contract.mode, "bridge synthesized");

    Ok(BridgeSource {
        fqn,
        source: rendered,
        channel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{normalize, RawContract};
    use crate::placeholder::PlaceholderResolver;

    const TRAIT_SRC: &str = "pub trait OrderApiService: Send + Sync {\n    fn submit(&self, body: Order) -> ApiResponse<Receipt>;\n}\n";

    fn contract(mode: Mode) -> Contract {
        let raw = RawContract {
            name: "OrderApi".to_string(),
            spec: "orders.yaml".to_string(),
            cluster: "orders".to_string(),
            mode,
            ..RawContract::default()
        };
        normalize(&raw, &PlaceholderResolver::from_process()).unwrap()
    }

    fn skeleton(contract: &Contract) -> ApiSkeleton {
        let mut skeleton = ApiSkeleton::default();
        skeleton.sources.insert(
            ApiSkeleton::interface_fqn(contract),
            TRAIT_SRC.to_string(),
        );
        skeleton
    }

    #[test]
    fn sync_bridge_delegates_to_handler() {
        let c = contract(Mode::Sync);
        let bridge = synthesize(&c, &skeleton(&c)).unwrap();
        assert_eq!(bridge.fqn, "summer.gen.service.OrderApiServiceImpl");
        assert!(bridge.channel.is_none());
        assert!(bridge
            .source
            .contains("fn submit(&self, body: Order) -> ApiResponse<Receipt>"));
        assert!(bridge.source.contains("self.handler.handle(body)"));
    }

    #[test]
    fn async_bridge_injects_outermost_channel() {
        let c = contract(Mode::Async);
        let bridge = synthesize(&c, &skeleton(&c)).unwrap();
        let spec = bridge.channel.unwrap();
        assert_eq!(spec.send, "channel.orders.order.submit");
        assert!(bridge
            .source
            .contains("#[summer::channel(\"channel.orders.order.submit\")]"));
        assert!(bridge
            .source
            .contains("fn submit(&self, body: Order) -> ApiResponse<Receipt>"));
    }

    #[test]
    fn bridge_signature_matches_skeleton_signature() {
        let c = contract(Mode::Async);
        let bridge = synthesize(&c, &skeleton(&c)).unwrap();
        let skeleton_op = first_operation(TRAIT_SRC).unwrap();
        let bridge_op = first_operation(&bridge.source).unwrap();
        assert_eq!(bridge_op, skeleton_op);
    }

    #[test]
    fn missing_interface_fails() {
        let c = contract(Mode::Sync);
        let err = synthesize(&c, &ApiSkeleton::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateSkeleton { .. }));
    }
}
