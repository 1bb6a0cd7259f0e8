//! Configuration source wrangling
// (c) 2026 Ross Younger

use anyhow::{Context as _, Result};
use figment::{Figment, Provider, providers::Env};

use super::Configuration;

/// Prefix of the environment variables we read
const ENV_PREFIX: &str = "BLEFT_";

/// Processes and merges all configuration sources.
#[derive(Debug)]
pub struct Manager {
    data: Figment,
}

impl Manager {
    fn new(apply_env: bool) -> Self {
        let mut new1 = Self {
            data: Figment::new(),
        };
        new1.apply_system_default();
        if apply_env {
            new1.merge_provider(Env::prefixed(ENV_PREFIX));
        }
        new1
    }

    /// General constructor for production use.
    ///
    /// Applies the system defaults, then the environment.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(true)
    }

    /// Constructor which applies only the system defaults
    #[must_use]
    pub fn without_env() -> Self {
        Self::new(false)
    }

    /// Merges in a data set, which is some sort of [figment::Provider](https://docs.rs/figment/latest/figment/trait.Provider.html).
    /// This uses figment's `merge` operation, which prefers to _replace_ existing items.
    pub fn merge_provider<T>(&mut self, provider: T)
    where
        T: Provider,
    {
        let f = std::mem::take(&mut self.data);
        self.data = f.merge(provider); // in the error case, this leaves the provider in a fused state
    }

    /// Applies the built-in defaults, at a lower priority than everything else
    fn apply_system_default(&mut self) {
        let f = std::mem::take(&mut self.data);
        self.data = f.join(*Configuration::system_default());
    }

    /// Extracts and validates the working [`Configuration`]
    pub fn get(&self) -> Result<Configuration> {
        let cfg: Configuration = self
            .data
            .extract()
            .context("failed to extract configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }
}
