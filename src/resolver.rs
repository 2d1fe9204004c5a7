//! Classifier resolution.
//!
//! Maps a [`MetaPointer`] to a registered [`Classifier`] descriptor.
//! Languages are registered explicitly before resolution; registration is
//! additive and idempotent per (key, version) — re-registering the same
//! language replaces the earlier entry.

use std::collections::HashMap;
use std::rc::Rc;

use crate::chunk::MetaPointer;
use crate::error::{FlatModelError, Result};
use crate::language::{Classifier, Language};
use crate::version::ProtocolVersion;

/// Resolves meta-pointers against an explicit set of registered languages.
///
/// Resolver state is scoped per serialization session (see
/// [`crate::Serialization`]), never process-wide, so independent sessions
/// with different language sets coexist safely.
#[derive(Debug, Default)]
pub struct ClassifierResolver {
    version: ProtocolVersion,
    languages: HashMap<(String, String), Language>,
}

impl ClassifierResolver {
    /// Creates an empty resolver bound to a protocol version.
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            languages: HashMap::new(),
        }
    }

    /// The protocol version this resolver was constructed against.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Registers a language, replacing any earlier registration with the
    /// same (key, version).
    pub fn register_language(&mut self, language: Language) {
        self.languages
            .insert((language.key.clone(), language.version.clone()), language);
    }

    /// Resolves a meta-pointer to its classifier descriptor.
    ///
    /// # Errors
    /// [`FlatModelError::UnresolvedClassifier`] when no registered language
    /// exposes a classifier matching the (language key, version, key) triple.
    pub fn resolve(&self, pointer: &MetaPointer) -> Result<Rc<Classifier>> {
        self.try_resolve(pointer)
            .ok_or_else(|| FlatModelError::UnresolvedClassifier {
                language: pointer.language.clone(),
                version: pointer.version.clone(),
                key: pointer.key.clone(),
            })
    }

    /// Resolves a meta-pointer, returning `None` instead of failing.
    ///
    /// For callers that accept unresolved placeholders.
    pub fn try_resolve(&self, pointer: &MetaPointer) -> Option<Rc<Classifier>> {
        self.languages
            .get(&(pointer.language.clone(), pointer.version.clone()))
            .and_then(|language| language.classifier_by_key(&pointer.key))
            .map(Rc::clone)
    }
}
