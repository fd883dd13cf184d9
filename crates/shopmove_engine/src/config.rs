//! Configuration for the migration engine.

/// Tasks executed per tick.
pub const DEFAULT_TICK_BATCH_SIZE: usize = 5;

/// Upper bound on source products fetched while planning.
pub const DEFAULT_MAX_PRODUCTS: usize = 2500;

/// Destination product window inspected for demo items.
pub const DEFAULT_DEMO_PROBE_LIMIT: usize = 100;

/// Configuration for [`crate::MigrationEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix of every store key the engine owns.
    pub key_prefix: String,
    /// Tasks executed per tick.
    pub tick_batch_size: usize,
    /// Upper bound on source products fetched while planning.
    pub max_products: usize,
    /// Demo detection only trusts destination catalogs of at most this many
    /// products.
    pub demo_probe_limit: usize,
}

impl EngineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            key_prefix: "importer".into(),
            tick_batch_size: DEFAULT_TICK_BATCH_SIZE,
            max_products: DEFAULT_MAX_PRODUCTS,
            demo_probe_limit: DEFAULT_DEMO_PROBE_LIMIT,
        }
    }

    /// Sets the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the tick batch size. Zero is raised to one.
    pub fn with_tick_batch_size(mut self, size: usize) -> Self {
        self.tick_batch_size = size.max(1);
        self
    }

    /// Sets the product fetch cap.
    pub fn with_max_products(mut self, max: usize) -> Self {
        self.max_products = max;
        self
    }

    /// Sets the demo probe window.
    pub fn with_demo_probe_limit(mut self, limit: usize) -> Self {
        self.demo_probe_limit = limit;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
