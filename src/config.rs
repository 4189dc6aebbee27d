//! Tunables for the population store and group algebra.

/// Capacity of a single genotype block. Kept as a named constant rather
/// than threaded through `SimConfig` since block-boundary behaviour is
/// defined in terms of it.
pub const BLOCK_CAPACITY: usize = 1000;

/// Knobs that are genuinely configurable without changing documented
/// behaviour.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Initial capacity hint for the parent-pair -> tag map used by
    /// `groups::split_into_families`. Just a `HashMap` sizing hint, not a
    /// hard limit.
    pub family_split_map_hint: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            family_split_map_hint: 64,
        }
    }
}

/// Installs `env_logger` as the global logger, ignoring the error if a
/// logger is already set (harmless when called more than once, e.g. from
/// multiple integration test binaries).
pub fn init_logging() {
    let _ = env_logger::try_init();
}
