//! # Summer
//!
//! **Summer** turns an annotated [OpenAPI](https://spec.openapis.org/oas/v3.1.0)
//! contract into service-layer sources at build time: DTOs, an API skeleton
//! interface, a service bridge and, for asynchronous declarations, a layered
//! stack of resilient message-channel wrappers.
//!
//! ## Architecture
//!
//! One generation round flows each annotated declaration through:
//!
//! - **[`placeholder`]** - `${KEY:default}` expansion against configuration and environment
//! - **[`contract`]** - annotation normalization and invariant validation
//! - **[`skeleton`]** - OpenAPI sub-generation into an isolated in-memory filesystem
//! - **[`bridge`]** - `<Resource>ApiServiceImpl` synthesis (handler or channel backed)
//! - **[`stack`]** - retry / circuit-breaker / dead-letter / batching wrapper planning and rendering
//! - **[`emit`]** - duplicate-checked emission through the host
//! - **[`pipeline`]** - the round driver tying the stages together
//!
//! Generated wrapper sources are thin structs over the combinators in
//! **[`runtime`]**, so retry schedules, breaker state machines, batching and
//! reply correlation are implemented once and linked, not re-rendered.
//!
//! ## Example
//!
//! ```no_run
//! use summer::contract::{normalize, Mode, RawContract};
//! use summer::host::MemoryHost;
//! use summer::pipeline;
//! use summer::placeholder::PlaceholderResolver;
//!
//! let decl = RawContract {
//!     name: "OrderApi".to_string(),
//!     spec: "openapi.yaml".to_string(),
//!     cluster: "orders".to_string(),
//!     mode: Mode::Async,
//!     ..RawContract::default()
//! };
//! let resolver = PlaceholderResolver::from_process();
//! let mut host = MemoryHost::new();
//! let report = pipeline::run_round(&[decl], &resolver, &mut host)?;
//! assert!(!report.has_errors());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bridge;
pub mod cli;
pub mod contract;
pub mod emit;
pub mod errors;
pub mod host;
pub mod pipeline;
pub mod placeholder;
pub mod runtime;
pub mod skeleton;
pub mod stack;
pub mod templates;

pub use errors::{Diagnostic, PipelineError, Severity};
pub use pipeline::{run_round, RoundReport};
