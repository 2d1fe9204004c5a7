//! The main entry point: a self-contained serialization session.
//!
//! A [`Serialization`] bundles a protocol version with its own classifier
//! resolver and construction registry. Sessions are independent values:
//! two sessions with different language sets coexist safely, and nothing is
//! process-global. Registration is expected to happen during a
//! single-threaded setup phase; serialize/deserialize calls are then
//! synchronous traversals.

use std::fs;
use std::path::Path;

use crate::codec::Codec;
use crate::deserializer::Deserializer;
use crate::error::Result;
use crate::instance::InstanceRef;
use crate::instantiator::Instantiator;
use crate::language::Language;
use crate::resolver::ClassifierResolver;
use crate::serializer::Serializer;
use crate::version::ProtocolVersion;
use crate::SerializedChunk;

/// A configured serialization session: protocol version, registered
/// languages and custom construction functions.
///
/// ## Usage
///
/// ```rust,ignore
/// use flatmodel::{JsonCodec, ProtocolVersion, Serialization};
///
/// let mut session = Serialization::new(ProtocolVersion::V2024_1);
/// session.register_language(my_language);
///
/// let bytes = session.serialize_trees_to_bytes(&[root], &JsonCodec)?;
/// let rebuilt = session.deserialize_bytes(&bytes, &JsonCodec)?;
/// ```
#[derive(Debug, Default)]
pub struct Serialization {
    version: ProtocolVersion,
    resolver: ClassifierResolver,
    instantiator: Instantiator,
}

impl Serialization {
    /// Creates an empty session bound to a protocol version.
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            resolver: ClassifierResolver::new(version),
            instantiator: Instantiator::new(),
        }
    }

    /// The protocol version this session operates under.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Registers a language with the session's classifier resolver.
    /// Additive; re-registering the same (key, version) replaces it.
    pub fn register_language(&mut self, language: Language) {
        self.resolver.register_language(language);
    }

    /// Registers a custom construction function for a classifier key.
    /// Last write wins. See [`Instantiator::register`].
    pub fn register_custom_deserializer<F>(&mut self, classifier_key: impl Into<String>, build: F)
    where
        F: Fn(
                &std::rc::Rc<crate::language::Classifier>,
                &crate::chunk::SerializedClassifierInstance,
                &std::collections::HashMap<String, InstanceRef>,
                &[(String, crate::instance::PropertyValue)],
            ) -> Result<InstanceRef>
            + 'static,
    {
        self.instantiator.register(classifier_key, build);
    }

    /// The session's classifier resolver.
    pub fn resolver(&self) -> &ClassifierResolver {
        &self.resolver
    }

    /// The session's construction registry.
    pub fn instantiator(&self) -> &Instantiator {
        &self.instantiator
    }

    /// Serializes root instances as trees (containment and annotation
    /// closure). See [`Serializer::serialize_trees_to_chunk`].
    pub fn serialize_trees_to_chunk(&self, roots: &[InstanceRef]) -> Result<SerializedChunk> {
        Serializer::new(self.version).serialize_trees_to_chunk(roots)
    }

    /// Serializes an explicit instance set, with no implicit expansion.
    /// See [`Serializer::serialize_nodes_to_chunk`].
    pub fn serialize_nodes_to_chunk(&self, instances: &[InstanceRef]) -> Result<SerializedChunk> {
        Serializer::new(self.version).serialize_nodes_to_chunk(instances)
    }

    /// Serializes trees straight to bytes through the given codec.
    pub fn serialize_trees_to_bytes(
        &self,
        roots: &[InstanceRef],
        codec: &dyn Codec,
    ) -> Result<Vec<u8>> {
        Serializer::new(self.version).serialize_trees_to_bytes(roots, codec)
    }

    /// Serializes an explicit instance set straight to bytes.
    pub fn serialize_nodes_to_bytes(
        &self,
        instances: &[InstanceRef],
        codec: &dyn Codec,
    ) -> Result<Vec<u8>> {
        Serializer::new(self.version).serialize_nodes_to_bytes(instances, codec)
    }

    /// Rebuilds all instances of a chunk, in original flat order.
    /// See [`Deserializer::deserialize_chunk`].
    pub fn deserialize_chunk(&self, chunk: &SerializedChunk) -> Result<Vec<InstanceRef>> {
        Deserializer::new(&self.resolver, &self.instantiator, self.version)
            .deserialize_chunk(chunk)
    }

    /// Decodes bytes through the given codec, then rebuilds the graph.
    pub fn deserialize_bytes(&self, bytes: &[u8], codec: &dyn Codec) -> Result<Vec<InstanceRef>> {
        Deserializer::new(&self.resolver, &self.instantiator, self.version)
            .deserialize_bytes(bytes, codec)
    }

    /// Serializes root trees and writes the encoded bytes to a file.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
        codec: &dyn Codec,
        roots: &[InstanceRef],
    ) -> Result<()> {
        let bytes = self.serialize_trees_to_bytes(roots, codec)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Reads a file and rebuilds the graph it encodes.
    pub fn load<P: AsRef<Path>>(&self, path: P, codec: &dyn Codec) -> Result<Vec<InstanceRef>> {
        let bytes = fs::read(path)?;
        self.deserialize_bytes(&bytes, codec)
    }
}
