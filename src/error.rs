//! Centralized error handling for flatmodel.
//!
//! All failure conditions are represented as `Result` values; the library
//! never panics on malformed input (enforced by `#![deny(clippy::panic)]`
//! and `#![deny(clippy::unwrap_used)]`).
//!
//! ## Error Categories
//!
//! Deserialization-time failures abort the whole call — there is no
//! partial-graph recovery:
//!
//! - **UnresolvedClassifier:** a meta-pointer matches no registered language
//! - **DuplicateId:** two chunk entries share the same non-null ID
//! - **CyclicContainment:** containment links form a cycle (the model must be a forest)
//! - **DanglingReference:** a reference target ID resolves to no instance
//! - **AmbiguousNullId:** positional resolution of a null-ID child found no candidate
//! - **Deserialization:** a custom construction function failed, or the chunk
//!   is otherwise unusable (version mismatch, unresolvable annotation)
//!
//! Serialization failures ([`FlatModelError::Serialization`]) are limited to
//! malformed live-graph invariants: an instance reachable through two owners,
//! or a containment cycle in the live graph. Reference cycles are explicitly
//! **not** an error.
//!
//! ## Usage
//!
//! ```rust
//! use flatmodel::{FlatModelError, Result};
//!
//! fn check(err: &FlatModelError) {
//!     match err {
//!         FlatModelError::DanglingReference { target } => {
//!             eprintln!("unknown reference target: {target}");
//!         }
//!         other => eprintln!("{other}"),
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for flatmodel operations.
pub type Result<T> = std::result::Result<T, FlatModelError>;

/// The master error enum covering all failure domains in flatmodel.
///
/// This type is `Clone` so errors can be stored for later analysis; I/O
/// errors are wrapped in an `Arc` to make cloning cheap.
#[derive(Debug, Clone)]
pub enum FlatModelError {
    /// A meta-pointer could not be resolved against the registered languages.
    ///
    /// Raised during deserialization Phase 1 (classify and index) when no
    /// registered language exposes a classifier matching the pointer's
    /// (language key, language version, key) triple.
    UnresolvedClassifier {
        /// Language key of the offending meta-pointer.
        language: String,
        /// Language version of the offending meta-pointer.
        version: String,
        /// Classifier key of the offending meta-pointer.
        key: String,
    },

    /// Two serialized entries in the same chunk carry the same non-null ID.
    DuplicateId {
        /// The ID that appeared more than once.
        id: String,
    },

    /// Containment links form a cycle.
    ///
    /// The containment relation must be a forest. Detected incrementally
    /// during dependency-ordered instantiation (an entry revisited while
    /// still on the current descent path), and during serialization of a
    /// malformed live graph.
    CyclicContainment {
        /// ID of the entry at which the cycle was detected, if it has one.
        at: Option<String>,
    },

    /// A reference target ID does not resolve to any instance in the chunk.
    ///
    /// Null target IDs are a legal "unset" reference and never raise this.
    DanglingReference {
        /// The unresolved target ID.
        target: String,
    },

    /// Positional resolution of a null-ID containment child found no
    /// unconsumed candidate entry declaring the expected parent.
    AmbiguousNullId {
        /// ID of the parent whose containment slot could not be filled,
        /// if the parent itself has one.
        parent: Option<String>,
    },

    /// Generic deserialization failure.
    ///
    /// Covers custom construction function failures, protocol-version
    /// mismatches, unresolvable annotation IDs and malformed property
    /// values. The string carries the diagnostic detail.
    Deserialization(String),

    /// The live graph violates a structural invariant and cannot be
    /// serialized (double ownership, containment cycle, an annotation
    /// without an ID).
    Serialization(String),

    /// A codec failed to encode or decode a chunk.
    Codec(String),

    /// Low-level I/O failure from the file convenience entry points.
    ///
    /// The underlying `io::Error` is wrapped in an `Arc` to keep the error
    /// `Clone`.
    Io(Arc<io::Error>),
}

impl fmt::Display for FlatModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedClassifier {
                language,
                version,
                key,
            } => write!(
                f,
                "Unresolved classifier: no registered language exposes \
                 ({language}, {version}, {key})"
            ),
            Self::DuplicateId { id } => {
                write!(f, "Duplicate ID in chunk: {id}")
            }
            Self::CyclicContainment { at } => match at {
                Some(id) => write!(f, "Cyclic containment detected at instance {id}"),
                None => write!(f, "Cyclic containment detected at an instance without ID"),
            },
            Self::DanglingReference { target } => {
                write!(f, "Dangling reference: no instance with ID {target}")
            }
            Self::AmbiguousNullId { parent } => match parent {
                Some(id) => write!(
                    f,
                    "Ambiguous null-ID child: no unconsumed candidate declares parent {id}"
                ),
                None => write!(
                    f,
                    "Ambiguous null-ID child: the parent has no ID, so no candidate can declare it"
                ),
            },
            Self::Deserialization(s) => write!(f, "Deserialization Error: {s}"),
            Self::Serialization(s) => write!(f, "Serialization Error: {s}"),
            Self::Codec(s) => write!(f, "Codec Error: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
        }
    }
}

impl std::error::Error for FlatModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FlatModelError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
