// (c) 2026 Ross Younger
//! # 📖 Configuration management
//!
//! Run-time configuration is obtained from the following sources, highest priority first:
//! 1. Anything the caller merges in with [`Manager::merge_provider`]
//! 2. Environment variables, prefixed `BLEFT_` (for example `BLEFT_MAX_CHUNK_SIZE=512`)
//! 3. Hard-wired defaults
//!
//! The same [`Configuration`] serves both ends of a connection; each end uses the fields which concern it.

use figment::value::{Dict, Map};
use figment::{Metadata, Profile, Provider, providers::Serialized};
use serde::{Deserialize, Serialize};

mod manager;
pub use manager::Manager;

/// The protocol engine's tunable parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// The chunk size a requester asks for when reading a file, in bytes.
    ///
    /// This is advisory: the responder decides how much to send in each round.
    pub read_chunk_size: u32,

    /// The largest chunk a responder will send or accept in one round, in bytes.
    ///
    /// This bounds the responder's buffering.
    pub max_chunk_size: u32,
}

static SYSTEM_DEFAULT: Configuration = Configuration {
    read_chunk_size: 4000,
    max_chunk_size: 4000,
};

impl Configuration {
    /// Hard-wired configuration defaults
    #[must_use]
    pub fn system_default() -> &'static Self {
        &SYSTEM_DEFAULT
    }

    /// Checks that the configuration is usable
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.read_chunk_size > 0, "read_chunk_size must be nonzero");
        anyhow::ensure!(self.max_chunk_size > 0, "max_chunk_size must be nonzero");
        Ok(())
    }

    /// The most a responder sends or grants in one round. Never zero, even if
    /// `max_chunk_size` is, so every round makes progress.
    #[must_use]
    pub(crate) fn chunk_limit(&self) -> u32 {
        self.max_chunk_size.max(1)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        *Self::system_default()
    }
}

/// A `Configuration` is itself a source of configuration; this is how the defaults reach the [`Manager`].
impl Provider for Configuration {
    fn metadata(&self) -> Metadata {
        Metadata::named("built-in defaults")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
