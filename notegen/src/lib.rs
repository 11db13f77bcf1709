//! Prompt variant management and rendering for creator notes.
//!
//! This facade bundles the workspace crates behind feature flags so
//! downstream users can pull in only the layers they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use notegen_primitives as primitives;

/// Configuration schema and loader (enabled by `config` feature).
#[cfg(feature = "config")]
pub use notegen_config as config;

/// Template store, resolution, binding, and constraint extraction (enabled by `prompts` feature).
#[cfg(feature = "prompts")]
pub use notegen_prompts as prompts;

/// Completion service boundary and adapters (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use notegen_adapters as adapters;

/// Output validation (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use notegen_policy as policy;

/// Rendering pipeline and routing (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use notegen_kernel as kernel;

/// Logging bootstrap (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use notegen_telemetry as telemetry;
