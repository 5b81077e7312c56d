use strum::{Display, EnumString};

/// Which encoder [`crate::Codec::encode`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Strategy {
    /// Per-type step tables, generated on first use and cached.
    #[default]
    Compiled,
    /// Descriptor walking on every call.
    Generic,
}

/// Settings of a [`crate::Codec`].
///
/// ## Example
///
/// ```
/// # use schemabuf::{Config, Strategy};
/// let config = Config::new()
///     .with_strategy("generic".parse().unwrap())
///     .with_initial_capacity(256);
/// assert_eq!(config.strategy, Strategy::Generic);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub strategy: Strategy,
    /// Initial capacity of writers created by the codec.
    pub initial_capacity: usize,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}
