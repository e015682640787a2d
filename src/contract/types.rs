use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delivery mode of an annotated declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Bridge delegates to a synchronous handler
    Sync,
    /// Bridge delegates to a message channel (+ wrapper stack)
    Async,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Sync
    }
}

/// Raw annotation surface, field-for-field as written on the declaration.
///
/// Defaults mirror the `@Summer` marker; string fields may contain
/// `${KEY:default}` placeholders and are resolved during normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawContract {
    /// Simple name of the annotated declaration (e.g. `OrderApi`)
    pub name: String,
    /// Path or URL of the OpenAPI document
    pub spec: String,
    /// Logical namespace prefix for channel names
    pub cluster: String,
    pub mode: Mode,
    /// `<= 0` means unbounded (ASYNC only)
    pub max_retries: i32,
    pub circuit_breaker: bool,
    pub cb_failure_threshold: i32,
    pub cb_delay_seconds: i32,
    /// Dead-letter channel; empty disables
    pub dlq: String,
    /// `<= 1` disables batching
    pub batch_size: i32,
    /// e.g. `"50ms"`, `"5s"`; empty disables
    pub batch_interval: String,
    pub base_package: String,
    pub dto_package: String,
    pub api_package: String,
    pub service_package: String,
    pub handler_package: String,
    pub channel_package: String,
    /// Empty derives `channel.<cluster>.<resource>.reply`
    pub reply_channel: String,
}

impl Default for RawContract {
    fn default() -> Self {
        RawContract {
            name: String::new(),
            spec: String::new(),
            cluster: String::new(),
            mode: Mode::Sync,
            max_retries: 3,
            circuit_breaker: false,
            cb_failure_threshold: 5,
            cb_delay_seconds: 30,
            dlq: String::new(),
            batch_size: 1,
            batch_interval: String::new(),
            base_package: "summer.gen".to_string(),
            dto_package: String::new(),
            api_package: String::new(),
            service_package: String::new(),
            handler_package: String::new(),
            channel_package: String::new(),
            reply_channel: String::new(),
        }
    }
}

/// Packaging layout after derivation; every field is a non-empty dotted
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packages {
    pub base: String,
    pub dto: String,
    pub api: String,
    pub service: String,
    pub handler: String,
    pub channel: String,
}

/// Resiliency configuration carried verbatim onto the channel spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resiliency {
    /// `<= 0` means unbounded
    pub max_retries: i32,
    pub circuit_breaker: bool,
    pub cb_failure_threshold: u32,
    pub cb_delay: Duration,
    /// Dead-letter channel name, if enabled
    pub dlq: Option<String>,
    pub batch_size: u32,
    pub batch_interval: Option<Duration>,
}

impl Resiliency {
    /// Whether any batching is configured.
    pub fn batching(&self) -> bool {
        self.batch_size > 1 || self.batch_interval.is_some()
    }
}

/// Normalized, validated contract for one annotated declaration.
#[derive(Debug, Clone)]
pub struct Contract {
    /// Declaration simple name (e.g. `OrderApi`)
    pub name: String,
    /// UpperCamel resource derived from the name (e.g. `Order`)
    pub resource: String,
    /// Resolved OpenAPI document location
    pub spec: String,
    pub cluster: String,
    pub mode: Mode,
    pub packages: Packages,
    pub resiliency: Resiliency,
    /// Always non-empty after normalization
    pub reply_channel: String,
    /// True when the annotation set `replyChannel` explicitly; selects
    /// request/reply bridging and correlator generation
    pub request_reply: bool,
}

impl Contract {
    /// Lowercased resource segment used in channel identifiers.
    pub fn resource_segment(&self) -> String {
        self.resource.to_lowercase()
    }

    /// Logical send channel identifier for `operation`.
    pub fn channel_name(&self, operation: &str) -> String {
        format!(
            "channel.{}.{}.{}",
            self.cluster,
            self.resource_segment(),
            operation
        )
    }

    /// Channel spec for `operation`, resiliency carried verbatim.
    pub fn channel_spec(&self, operation: &str) -> ChannelSpec {
        ChannelSpec {
            send: self.channel_name(operation),
            reply: if self.request_reply {
                Some(self.reply_channel.clone())
            } else {
                None
            },
            resiliency: self.resiliency.clone(),
        }
    }
}

/// Logical channel identifiers plus the resiliency that drives the wrapper
/// stack.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    /// `channel.<cluster>.<resource>.<operation>`
    pub send: String,
    /// Reply channel when the contract is request/reply
    pub reply: Option<String>,
    pub resiliency: Resiliency,
}

/// Parse a compact duration literal: `500ms`, `5s`, `2m`, or bare digits
/// (milliseconds). Zero is not a valid interval.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (digits, unit_ms): (&str, u64) = if let Some(d) = s.strip_suffix("ms") {
        (d, 1)
    } else if let Some(d) = s.strip_suffix('s') {
        (d, 1_000)
    } else if let Some(d) = s.strip_suffix('m') {
        (d, 60_000)
    } else {
        (s, 1)
    };
    let n: u64 = digits.trim().parse().ok()?;
    if n == 0 {
        return None;
    }
    Some(Duration::from_millis(n * unit_ms))
}
