//! Protocol versioning.
//!
//! Every chunk carries a format tag identifying the protocol version it was
//! produced under. Serializers and deserializers are constructed against a
//! specific [`ProtocolVersion`]; a chunk carrying a different tag is rejected
//! up front rather than silently mixed.

use crate::chunk::MetaPointer;

/// Language key under which the built-in declarations live.
pub const BUILTINS_LANGUAGE_KEY: &str = "model-builtins";

/// The protocol version a serialization session operates under.
///
/// The version selects the format tag written into every chunk and the
/// meta-pointers of the built-in declarations (the builtins language is
/// versioned in lockstep with the protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVersion {
    /// The 2023.1 protocol.
    V2023_1,
    /// The 2024.1 protocol (current default).
    #[default]
    V2024_1,
}

impl ProtocolVersion {
    /// Returns the format tag stored in [`crate::SerializedChunk`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2023_1 => "2023.1",
            Self::V2024_1 => "2024.1",
        }
    }

    /// Parses a chunk format tag back into a version.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "2023.1" => Some(Self::V2023_1),
            "2024.1" => Some(Self::V2024_1),
            _ => None,
        }
    }

    /// Version string of the builtins language under this protocol.
    pub fn builtins_version(&self) -> &'static str {
        self.as_str()
    }

    /// Meta-pointer of the built-in "name" property of named instances.
    pub fn named_property_pointer(&self) -> MetaPointer {
        MetaPointer::new(
            BUILTINS_LANGUAGE_KEY,
            self.builtins_version(),
            "model-builtins-Named-name",
        )
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
