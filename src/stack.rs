//! Channel wrapper stack generation.
//!
//! For an ASYNC declaration the stack generator plans the layered channel
//! chain from the contract's resiliency settings, renders one source per
//! layer and emits them under the channel package. Layers nest inner-first:
//! the base transport, then retry, then the circuit breaker, then the
//! dead-letter diversion, then batching on the outside. The outermost layer
//! always carries the bare channel qualifier so the bridge resolves the full
//! stack without knowing its shape.

use askama::Template;

use crate::contract::Contract;
use crate::emit::EmissionSink;
use crate::errors::PipelineError;
use crate::skeleton::OperationDescriptor;
use crate::templates::{
    BaseChannelTemplateData, BatchChannelTemplateData, BreakerChannelTemplateData,
    CorrelatorTemplateData, DlqChannelTemplateData, RetryChannelTemplateData,
};

/// Reply wait budget for generated correlators, in seconds.
const REPLY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Base,
    Retry,
    Breaker,
    DeadLetter,
    Batch,
}

impl LayerKind {
    /// Qualifier suffix for non-outermost layers.
    fn token(self) -> &'static str {
        match self {
            LayerKind::Base => "base",
            LayerKind::Retry => "retry",
            LayerKind::Breaker => "breaker",
            LayerKind::DeadLetter => "dlq",
            LayerKind::Batch => "batch",
        }
    }

    fn struct_fragment(self) -> &'static str {
        match self {
            LayerKind::Base => "",
            LayerKind::Retry => "Retry",
            LayerKind::Breaker => "Breaker",
            LayerKind::DeadLetter => "Dlq",
            LayerKind::Batch => "Batch",
        }
    }
}

/// One planned layer of the stack.
#[derive(Debug, Clone)]
pub struct StackLayer {
    pub kind: LayerKind,
    pub fqn: String,
    pub struct_name: String,
    /// Qualifier this layer registers under
    pub qualifier: String,
    /// Qualifier of the layer it wraps, absent for the base
    pub inner_qualifier: Option<String>,
    /// Message type flowing through the layer
    pub payload: String,
}

/// The planned stack for one channel, outermost layer first.
#[derive(Debug)]
pub struct StackPlan {
    pub layers: Vec<StackLayer>,
    /// Correlator FQN, planned only for request/reply declarations
    pub correlator: Option<String>,
}

impl StackPlan {
    pub fn outermost(&self) -> &StackLayer {
        // plan() always places the base layer
        &self.layers[0]
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Plan the layer chain for a contract's first operation.
pub fn plan(contract: &Contract, op: &OperationDescriptor) -> StackPlan {
    let r = &contract.resiliency;
    let mut kinds = vec![LayerKind::Base];
    if r.max_retries != 0 {
        kinds.push(LayerKind::Retry);
    }
    if r.circuit_breaker {
        kinds.push(LayerKind::Breaker);
    }
    if r.dlq.is_some() {
        kinds.push(LayerKind::DeadLetter);
    }
    if r.batching() {
        kinds.push(LayerKind::Batch);
    }

    let send = contract.channel_name(&op.name);
    let prefix = format!("{}{}", contract.resource, upper_first(&op.name));
    let outer_idx = kinds.len() - 1;
    // Everything the batcher wraps carries the batched payload.
    let batched = r.batching();

    let mut layers: Vec<StackLayer> = kinds
        .iter()
        .enumerate()
        .map(|(idx, kind)| {
            let qualifier = if idx == outer_idx {
                send.clone()
            } else {
                format!("{send}.{}", kind.token())
            };
            let inner_qualifier = if idx == 0 {
                None
            } else {
                Some(format!("{send}.{}", kinds[idx - 1].token()))
            };
            let struct_name = format!("{prefix}{}Channel", kind.struct_fragment());
            let payload = if batched && *kind != LayerKind::Batch {
                format!("Vec<{}>", op.dto)
            } else {
                op.dto.clone()
            };
            StackLayer {
                kind: *kind,
                fqn: format!("{}.{struct_name}", contract.packages.channel),
                struct_name,
                qualifier,
                inner_qualifier,
                payload,
            }
        })
        .collect();
    layers.reverse();

    let correlator = contract
        .request_reply
        .then(|| format!("{}.{prefix}Correlator", contract.packages.channel));

    StackPlan { layers, correlator }
}

fn render_layer(
    contract: &Contract,
    op: &OperationDescriptor,
    layer: &StackLayer,
) -> Result<String, askama::Error> {
    let r = &contract.resiliency;
    let dto_path = contract.packages.dto.replace('.', "::");
    let inner = layer.inner_qualifier.clone().unwrap_or_default();
    match layer.kind {
        LayerKind::Base => BaseChannelTemplateData {
            struct_name: layer.struct_name.clone(),
            qualifier: layer.qualifier.clone(),
            dto_path,
            dto: op.dto.clone(),
            payload: layer.payload.clone(),
        }
        .render(),
        LayerKind::Retry => RetryChannelTemplateData {
            struct_name: layer.struct_name.clone(),
            qualifier: layer.qualifier.clone(),
            inner_qualifier: inner,
            dto_path,
            dto: op.dto.clone(),
            payload: layer.payload.clone(),
            max_retries: r.max_retries,
        }
        .render(),
        LayerKind::Breaker => BreakerChannelTemplateData {
            struct_name: layer.struct_name.clone(),
            qualifier: layer.qualifier.clone(),
            inner_qualifier: inner,
            dto_path,
            dto: op.dto.clone(),
            payload: layer.payload.clone(),
            threshold: r.cb_failure_threshold,
            delay_secs: r.cb_delay.as_secs(),
        }
        .render(),
        LayerKind::DeadLetter => DlqChannelTemplateData {
            struct_name: layer.struct_name.clone(),
            qualifier: layer.qualifier.clone(),
            inner_qualifier: inner,
            dlq_qualifier: r.dlq.clone().unwrap_or_default(),
            dto_path,
            dto: op.dto.clone(),
            payload: layer.payload.clone(),
        }
        .render(),
        LayerKind::Batch => BatchChannelTemplateData {
            struct_name: layer.struct_name.clone(),
            qualifier: layer.qualifier.clone(),
            inner_qualifier: inner,
            dto_path,
            dto: op.dto.clone(),
            size: r.batch_size,
            interval_ms: r
                .batch_interval
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
        .render(),
    }
}

/// Render and emit the full stack (and correlator, when planned).
pub fn emit(
    contract: &Contract,
    op: &OperationDescriptor,
    sink: &mut EmissionSink<'_>,
) -> Result<StackPlan, PipelineError> {
    let stack = plan(contract, op);
    for layer in &stack.layers {
        let source =
            render_layer(contract, op, layer).map_err(|e| PipelineError::SkeletonGenerationFailed {
                message: format!("failed to render `{}`: {e}", layer.fqn),
            })?;
        sink.emit(&layer.fqn, &source)?;
    }

    if let Some(fqn) = &stack.correlator {
        let spec = contract.channel_spec(&op.name);
        let struct_name = fqn
            .rsplit('.')
            .next()
            .unwrap_or(fqn.as_str())
            .to_string();
        let source = CorrelatorTemplateData {
            struct_name,
            send_qualifier: spec.send.clone(),
            reply_qualifier: spec.reply.clone().unwrap_or_default(),
            dto_path: contract.packages.dto.replace('.', "::"),
            dto: op.dto.clone(),
            reply_ty: op.reply_payload(),
            timeout_secs: REPLY_TIMEOUT_SECS,
        }
        .render()
        .map_err(|e| PipelineError::SkeletonGenerationFailed {
            message: format!("failed to render `{fqn}`: {e}"),
        })?;
        sink.emit(fqn, &source)?;
    }

    tracing::debug!(
        declaration = %contract.name,
        layers = stack.layers.len(),
        correlator = stack.correlator.is_some(),
        "channel stack emitted"
    );
    Ok(stack)
}
