//! The flat intermediate representation.
//!
//! A [`SerializedChunk`] is the order-preserving, format-agnostic flattening
//! of an object graph: a format tag, the set of languages whose declarations
//! the graph touches, and one [`SerializedClassifierInstance`] record per
//! instance, in document order (a node immediately precedes its annotations,
//! which precede its containment subtree).
//!
//! These are passive value records: no behavior beyond accessors and
//! equality. A chunk is produced fresh by the serializer and consumed exactly
//! once by the deserializer, but may equally be hand-built or hand-inspected
//! by diagnostics and tests. All records derive `serde` traits so any codec
//! can be layered on top of the same data model.

use serde::{Deserialize, Serialize};

/// Identifies a declared language element: a (language key, language
/// version, element key) triple.
///
/// Meta-pointers name classifiers as well as individual features; the
/// element key disambiguates within the language.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaPointer {
    /// Key of the language declaring the element.
    pub language: String,
    /// Version of the language declaring the element.
    pub version: String,
    /// Key of the declared element itself.
    pub key: String,
}

impl MetaPointer {
    /// Creates a new meta-pointer.
    pub fn new(
        language: impl Into<String>,
        version: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            version: version.into(),
            key: key.into(),
        }
    }

    /// The (key, version) pair of the owning language.
    pub fn used_language(&self) -> UsedLanguage {
        UsedLanguage::new(self.language.clone(), self.version.clone())
    }
}

/// A (key, version) pair naming one language whose declarations the chunk
/// references, directly or through feature meta-pointers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsedLanguage {
    /// Language key.
    pub key: String,
    /// Language version.
    pub version: String,
}

impl UsedLanguage {
    /// Creates a new used-language entry.
    pub fn new(key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
        }
    }
}

/// One serialized property: the feature's meta-pointer and the scalar value
/// rendered as a string (`None` when the property is unset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPropertyValue {
    /// Meta-pointer of the property feature.
    #[serde(rename = "property")]
    pub meta_pointer: MetaPointer,
    /// The serialized scalar, or `None` for an unset property.
    pub value: Option<String>,
}

/// One serialized containment: the feature's meta-pointer and the ordered
/// child IDs.
///
/// A `None` child ID is legal: it marks a child that itself has no identity
/// string. Such children are re-associated positionally on the read side,
/// which is why within-feature order must be preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedContainmentValue {
    /// Meta-pointer of the containment feature.
    #[serde(rename = "containment")]
    pub meta_pointer: MetaPointer,
    /// Ordered, possibly-null child IDs.
    pub children: Vec<Option<String>>,
}

/// One target of a serialized reference: a possibly-null target ID plus an
/// optional human-readable resolve-info hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedReferenceTarget {
    /// ID of the referred instance; `None` is a legal unset reference.
    pub reference: Option<String>,
    /// Optional hint used when the target cannot be located.
    #[serde(rename = "resolveInfo")]
    pub resolve_info: Option<String>,
}

/// One serialized reference: the feature's meta-pointer and the ordered
/// target list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedReferenceValue {
    /// Meta-pointer of the reference feature.
    #[serde(rename = "reference")]
    pub meta_pointer: MetaPointer,
    /// Ordered reference targets.
    pub targets: Vec<SerializedReferenceTarget>,
}

/// The flat record for a single classifier instance.
///
/// Ordering invariants: property, containment and reference entries appear
/// in feature-declaration order; child and target lists preserve
/// within-feature element order; the annotation list preserves attachment
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedClassifierInstance {
    /// Identity of the instance, or `None` for structural identity.
    pub id: Option<String>,
    /// Meta-pointer of the instance's classifier.
    pub classifier: MetaPointer,
    /// ID of the owner (containing parent or annotated host), if any.
    pub parent_id: Option<String>,
    /// Property entries, in feature-declaration order.
    pub properties: Vec<SerializedPropertyValue>,
    /// Containment entries, in feature-declaration order.
    pub containments: Vec<SerializedContainmentValue>,
    /// Reference entries, in feature-declaration order.
    pub references: Vec<SerializedReferenceValue>,
    /// IDs of attached annotations, in attachment order.
    pub annotations: Vec<String>,
}

impl SerializedClassifierInstance {
    /// Creates an empty record for the given identity and classifier.
    pub fn new(id: Option<String>, classifier: MetaPointer) -> Self {
        Self {
            id,
            classifier,
            parent_id: None,
            properties: Vec::new(),
            containments: Vec::new(),
            references: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Returns the containment entry with the given feature key, if present.
    pub fn containment_by_key(&self, key: &str) -> Option<&SerializedContainmentValue> {
        self.containments.iter().find(|c| c.meta_pointer.key == key)
    }

    /// Returns the property entry with the given feature key, if present.
    pub fn property_by_key(&self, key: &str) -> Option<&SerializedPropertyValue> {
        self.properties.iter().find(|p| p.meta_pointer.key == key)
    }

    /// Returns the reference entry with the given feature key, if present.
    pub fn reference_by_key(&self, key: &str) -> Option<&SerializedReferenceValue> {
        self.references.iter().find(|r| r.meta_pointer.key == key)
    }
}

/// The flat, order-preserving intermediate representation of a graph, ready
/// for byte encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedChunk {
    /// Protocol format tag (see [`crate::ProtocolVersion`]).
    pub serialization_format_version: String,
    /// Every language whose classifiers or features the chunk references.
    pub languages: Vec<UsedLanguage>,
    /// The serialized instances, in document order.
    pub classifier_instances: Vec<SerializedClassifierInstance>,
}

impl SerializedChunk {
    /// Creates an empty chunk tagged with the given format version.
    pub fn new(format_version: impl Into<String>) -> Self {
        Self {
            serialization_format_version: format_version.into(),
            languages: Vec::new(),
            classifier_instances: Vec::new(),
        }
    }

    /// Records a used language, ignoring duplicates.
    ///
    /// The language list behaves as an insertion-ordered set, keeping chunk
    /// equality deterministic.
    pub fn add_language(&mut self, language: UsedLanguage) {
        if !self.languages.contains(&language) {
            self.languages.push(language);
        }
    }

    /// Appends an instance record in document order.
    pub fn add_instance(&mut self, instance: SerializedClassifierInstance) {
        self.classifier_instances.push(instance);
    }

    /// Looks up an instance record by its non-null ID.
    pub fn instance_by_id(&self, id: &str) -> Option<&SerializedClassifierInstance> {
        self.classifier_instances
            .iter()
            .find(|i| i.id.as_deref() == Some(id))
    }
}
