//! # flatmodel
//!
//! A graph-flattening serialization library for typed object-graph models:
//! trees of typed nodes linked by strict containment and free-form
//! cross-references, with annotations as a second attachment axis. flatmodel
//! flattens such graphs into an order-preserving, format-agnostic
//! [`SerializedChunk`], encodes chunks to bytes through pluggable codecs,
//! and rebuilds live graphs — identity, ordering and linkage intact.
//!
//! ## Overview
//!
//! flatmodel is the persistence and interchange layer for metamodel-instance
//! systems. Metamodels themselves (languages, classifiers, features) are
//! consumed via lookup, never defined here; domain object graphs built
//! against them round-trip exactly.
//!
//! ### Key Properties
//!
//! *   **Deterministic flattening:** depth-first pre-order — a node,
//!     then its annotations, then its containment subtree. Document order is
//!     part of the contract: the read side resolves ID-less children
//!     positionally.
//! *   **Dependency-ordered rebuilding:** children are instantiated before
//!     their parents, so custom construction functions can consume
//!     already-built children at construction time.
//! *   **Forests, not cycles:** containment must be acyclic and
//!     single-owner; both sides enforce it. Reference cycles are legal.
//! *   **Pluggable everything at the seams:** codecs ([`Codec`]), per-type
//!     construction ([`Instantiator`]), language registries
//!     ([`ClassifierResolver`]) — all scoped per [`Serialization`] session,
//!     never process-global.
//!
//! ## Architecture
//!
//! Data flow: live graph → [`Serializer`] → [`SerializedChunk`] → [`Codec`]
//! → bytes, and the reverse through [`Deserializer`], which resolves each
//! entry's classifier, instantiates in containment-topological order, then
//! links references once every instance exists.
//!
//! ## Usage
//!
//! ```rust
//! use flatmodel::{
//!     Classifier, DataType, DynamicInstance, JsonCodec, Language, ProtocolVersion, Property,
//!     PropertyValue, Serialization,
//! };
//!
//! // A metamodel, defined elsewhere and registered for lookup.
//! let mut lang = Language::new("demo", "1", "Demo");
//! let greeting = lang.add_classifier(
//!     Classifier::concept("demo-Greeting", "Greeting")
//!         .with_property(Property::new("demo-Greeting-text", "text", DataType::String)),
//! );
//!
//! let mut session = Serialization::new(ProtocolVersion::V2024_1);
//! session.register_language(lang);
//!
//! // A one-node graph.
//! let node = DynamicInstance::build(Some("g1"), &greeting);
//! node.borrow_mut()
//!     .set_property_value("demo-Greeting-text", PropertyValue::from("hello"));
//!
//! let bytes = session.serialize_trees_to_bytes(&[node], &JsonCodec)?;
//! let rebuilt = session.deserialize_bytes(&bytes, &JsonCodec)?;
//! assert_eq!(rebuilt.len(), 1);
//! # Ok::<(), flatmodel::FlatModelError>(())
//! ```
//!
//! ### Safety and Error Handling
//!
//! *   **No unsafe:** the crate is `#![deny(unsafe_code)]`.
//! *   **No panics:** no `unwrap()` or `panic!()` in the library (enforced
//!     by clippy lints). All failures surface as a [`FlatModelError`].
//! *   **All-or-nothing deserialization:** any failure aborts the whole
//!     call; there is no partial-graph recovery.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod chunk;
pub mod codec;
pub mod deserializer;
pub mod error;
pub mod instance;
pub mod instantiator;
pub mod language;
pub mod resolver;
pub mod serializer;
pub mod version;

// --- RE-EXPORTS ---

pub use api::Serialization;
pub use chunk::{
    MetaPointer, SerializedChunk, SerializedClassifierInstance, SerializedContainmentValue,
    SerializedPropertyValue, SerializedReferenceTarget, SerializedReferenceValue, UsedLanguage,
};
#[cfg(feature = "lz4")]
pub use codec::Lz4Codec;
pub use codec::{BinaryCodec, Codec, JsonCodec};
pub use deserializer::Deserializer;
pub use error::{FlatModelError, Result};
pub use instance::{
    attach_annotation, attach_child, detach, instances_equal, same_instance, ClassifierInstance,
    DynamicInstance, InstanceRef, PropertyValue, ReferenceValue, WeakInstanceRef,
};
pub use instantiator::{ConstructionFn, Instantiator};
pub use language::{
    Classifier, ClassifierKind, Containment, DataType, Language, Property, Reference,
};
pub use resolver::ClassifierResolver;
pub use serializer::Serializer;
pub use version::{ProtocolVersion, BUILTINS_LANGUAGE_KEY};
