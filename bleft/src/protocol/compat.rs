// (c) 2026 Ross Younger

//! Protocol version compatibility

/// The protocol version this crate speaks
pub const OUR_COMPATIBILITY_LEVEL: u32 = 4;

/// The protocol version advertised by a peer, as read from the transport at connection time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, derive_more::Display)]
pub enum Compatibility {
    /// Not yet known (nothing has been read from the peer)
    #[default]
    #[display("unknown")]
    Unknown,
    /// The peer speaks a version newer than [`OUR_COMPATIBILITY_LEVEL`]
    #[display("newer")]
    Newer,
    /// The peer speaks this version
    #[display("version {_0}")]
    Level(u32),
}

impl From<u32> for Compatibility {
    fn from(value: u32) -> Self {
        if value > OUR_COMPATIBILITY_LEVEL {
            Compatibility::Newer
        } else {
            Compatibility::Level(value)
        }
    }
}

/// Protocol features, and the [`Compatibility`] level which introduced each.
///
/// ```
/// use bleft::protocol::{Compatibility, Feature};
/// assert_eq!(Feature::Move.level(), Compatibility::Level(4));
/// assert_eq!(Feature::Move.to_string(), "MOVE");
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::VariantArray,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Feature {
    /// The header set with 64-bit modification times.
    /// Peers older than this cannot be served at all.
    ModificationTimes,
    /// The `Move` command
    Move,
}

impl Feature {
    /// The protocol version which introduced this feature
    #[must_use]
    pub const fn level(self) -> Compatibility {
        match self {
            Feature::ModificationTimes => Compatibility::Level(3),
            Feature::Move => Compatibility::Level(4),
        }
    }
}

impl Compatibility {
    /// Can a peer at this level use `feature`?
    #[must_use]
    pub fn supports(self, feature: Feature) -> bool {
        let Compatibility::Level(needed) = feature.level() else {
            return false;
        };
        match self {
            Compatibility::Unknown => false,
            Compatibility::Newer => true,
            Compatibility::Level(have) => have >= needed,
        }
    }
}
