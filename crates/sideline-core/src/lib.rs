//! Sideline core business logic.
//!
//! Pure Rust crate with no platform dependencies: session bookkeeping,
//! presence handling, and the premium gate for live coaching streams.
//! Consumed by native UI shells; media transport stays behind the
//! room provider traits.

pub mod broadcast;
pub mod config;
pub mod controls;
pub mod errors;
pub mod events;
pub mod gate;
pub mod lifecycle;
pub mod permissions;
pub mod presence;
pub mod provider;
pub mod room;
pub mod roster;
pub mod session;
pub mod store;
pub mod viewer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use errors::SidelineError;
pub use events::SidelineEvent;

/// Initialize tracing/logging. Call once from the host shell at startup.
pub fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "sideline_core=debug".parse().unwrap()),
            )
            .with_ansi(false)
            .init();
    });
}
