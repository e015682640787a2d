use super::types::{parse_duration, Contract, Mode, Packages, RawContract, Resiliency};
use crate::errors::PipelineError;
use crate::placeholder::PlaceholderResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Dotted identifier: segments of `[A-Za-z_][A-Za-z0-9_]*` joined by dots.
static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});

fn invalid(field: &str, value: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidContract {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Derive the UpperCamel resource from a declaration simple name by stripping
/// the trailing `Api` segment.
fn resource_of(name: &str) -> String {
    let stem = name.strip_suffix("Api").unwrap_or(name);
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn derive_package(explicit: &str, base: &str, suffix: &str) -> String {
    if explicit.is_empty() {
        format!("{base}.{suffix}")
    } else {
        explicit.to_string()
    }
}

/// Normalize a raw annotation into a validated [`Contract`].
///
/// Every string field goes through the placeholder resolver first; empty
/// packaging fields derive from `basePackage` by convention; the reply
/// channel defaults to `channel.<cluster>.<resource>.reply`. Validation
/// failures are collected so each broken invariant surfaces as its own
/// `InvalidContract`.
pub fn normalize(
    raw: &RawContract,
    resolver: &PlaceholderResolver,
) -> Result<Contract, Vec<PipelineError>> {
    let mut errors = Vec::new();

    let mut resolve = |value: &str| match resolver.resolve(value) {
        Ok(v) => v,
        Err(err) => {
            errors.push(err);
            value.to_string()
        }
    };

    let spec = resolve(&raw.spec);
    let cluster = resolve(&raw.cluster);
    let dlq = resolve(&raw.dlq);
    let batch_interval_raw = resolve(&raw.batch_interval);
    let base = resolve(&raw.base_package);
    let dto = resolve(&raw.dto_package);
    let api = resolve(&raw.api_package);
    let service = resolve(&raw.service_package);
    let handler = resolve(&raw.handler_package);
    let channel = resolve(&raw.channel_package);
    let reply_raw = resolve(&raw.reply_channel);

    if raw.name.is_empty() {
        errors.push(invalid("name", "", "declaration name must not be empty"));
    }
    let resource = resource_of(&raw.name);
    if resource.is_empty() && !raw.name.is_empty() {
        errors.push(invalid(
            "name",
            &raw.name,
            "no resource remains after stripping the trailing 'Api'",
        ));
    }

    if spec.is_empty() {
        errors.push(invalid("spec", "", "OpenAPI document location required"));
    }

    let packages = Packages {
        dto: derive_package(&dto, &base, "dto"),
        api: derive_package(&api, &base, "api"),
        service: derive_package(&service, &base, "service"),
        handler: derive_package(&handler, &base, "handlers"),
        channel: derive_package(&channel, &base, "channels.generated"),
        base,
    };
    for (field, value) in [
        ("basePackage", &packages.base),
        ("dtoPackage", &packages.dto),
        ("apiPackage", &packages.api),
        ("servicePackage", &packages.service),
        ("handlerPackage", &packages.handler),
        ("channelPackage", &packages.channel),
    ] {
        if value.is_empty() || !PACKAGE_RE.is_match(value) {
            errors.push(invalid(field, value, "must be a non-empty dotted identifier"));
        }
    }

    if raw.max_retries <= 0 && raw.mode != Mode::Async {
        errors.push(invalid(
            "maxRetries",
            &raw.max_retries.to_string(),
            "unbounded retries are only legal in ASYNC mode",
        ));
    }
    if raw.circuit_breaker && raw.cb_failure_threshold < 1 {
        errors.push(invalid(
            "cbFailureThreshold",
            &raw.cb_failure_threshold.to_string(),
            "must be >= 1 when circuitBreaker is enabled",
        ));
    }
    if raw.cb_delay_seconds < 0 {
        errors.push(invalid(
            "cbDelaySeconds",
            &raw.cb_delay_seconds.to_string(),
            "must be >= 0",
        ));
    }

    let batch_interval = if batch_interval_raw.is_empty() {
        None
    } else {
        let parsed = parse_duration(&batch_interval_raw);
        if parsed.is_none() {
            errors.push(invalid(
                "batchInterval",
                &batch_interval_raw,
                "must parse as a positive duration (e.g. 50ms, 5s)",
            ));
        }
        parsed
    };
    if raw.batch_size > 1 && batch_interval.is_none() {
        errors.push(invalid(
            "batchInterval",
            &batch_interval_raw,
            "required as a positive duration when batchSize > 1",
        ));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let resource_segment = resource.to_lowercase();
    let request_reply = !reply_raw.is_empty();
    let reply_channel = if request_reply {
        reply_raw
    } else {
        format!("channel.{cluster}.{resource_segment}.reply")
    };

    Ok(Contract {
        name: raw.name.clone(),
        resource,
        spec,
        cluster,
        mode: raw.mode,
        packages,
        resiliency: Resiliency {
            max_retries: raw.max_retries,
            circuit_breaker: raw.circuit_breaker,
            cb_failure_threshold: raw.cb_failure_threshold.max(1) as u32,
            cb_delay: Duration::from_secs(raw.cb_delay_seconds as u64),
            dlq: if dlq.is_empty() { None } else { Some(dlq) },
            batch_size: raw.batch_size.max(1) as u32,
            batch_interval,
        },
        reply_channel,
        request_reply,
    })
}
