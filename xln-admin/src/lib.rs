#![allow(dead_code)]

// Config, logging bring-up, system policy knobs: "admin, config, system
// policies, logging, audit, metrics". Nothing here participates in any
// protocol hash — it is wiring consumed once at bring-up, not state that
// travels through a tick.

use xln_jurisdiction::EvmType;

/// The knobs the embedding host must supply before running a tick.
/// `fixed_point_iteration_bound` is the default-64 cap on the intra-tick
/// `accountInput` delivery loop, made overridable here so tests can
/// shrink it to exercise the "carried over to next tick" branch without
/// constructing 64 real hops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub default_block_delay_ms: u64,
    pub fixed_point_iteration_bound: usize,
}

impl Config {
    pub const DEFAULT_FIXED_POINT_ITERATION_BOUND: usize = 64;

    pub fn new(default_block_delay_ms: u64) -> Self {
        Config {
            default_block_delay_ms,
            fixed_point_iteration_bound: Self::DEFAULT_FIXED_POINT_ITERATION_BOUND,
        }
    }

    pub fn with_fixed_point_iteration_bound(mut self, bound: usize) -> Self {
        self.fixed_point_iteration_bound = bound;
        self
    }

    /// The `EvmType -> EvmBackend` binding table: dispatches
    /// through `xln_adapt::backend_for` rather than re-declaring the
    /// mapping here.
    pub fn backend_for(&self, evm_type: EvmType) -> Box<dyn xln_adapt::EvmBackend> {
        xln_adapt::backend_for(evm_type)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(1000)
    }
}

/// Logging bring-up (`tracing-subscriber`): an `EnvFilter`-driven
/// `FmtSubscriber`, defaulting to `default_level` when `RUST_LOG` is
/// unset. Idempotent-ish in the sense
/// that a second call is a harmless no-op (`try_init` never panics the
/// process on a redundant subscriber).
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_uses_the_spec_default_iteration_bound() {
        let config = Config::default();
        assert_eq!(config.fixed_point_iteration_bound, 64);
    }

    #[test]
    fn overriding_the_iteration_bound_leaves_block_delay_untouched() {
        let config = Config::new(500).with_fixed_point_iteration_bound(4);
        assert_eq!(config.fixed_point_iteration_bound, 4);
        assert_eq!(config.default_block_delay_ms, 500);
    }
}
