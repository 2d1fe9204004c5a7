//! The consumed metamodel: languages, classifiers and their features.
//!
//! flatmodel does not define metamodels — it looks them up. A [`Language`]
//! is a versioned bundle of [`Classifier`] descriptors; each classifier
//! declares its [`Property`], [`Containment`] and [`Reference`] features in
//! a fixed declaration order, which the serializer relies on for
//! deterministic output.
//!
//! Classifiers are shared via `Rc`: the resolver hands them out, live
//! instances hold them, and identity is the (language key, language version,
//! classifier key) triple rather than pointer identity.

use std::rc::Rc;

use crate::chunk::MetaPointer;

/// Scalar datatype of a property, used to parse serialized values back into
/// typed [`crate::PropertyValue`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// UTF-8 string.
    String,
    /// Signed integer.
    Integer,
    /// Boolean.
    Boolean,
}

/// A declared property feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Feature key, unique within the declaring language.
    pub key: String,
    /// Human-readable feature name.
    pub name: String,
    /// Scalar datatype of the property's values.
    pub datatype: DataType,
    /// (key, version) of the declaring language, when it differs from the
    /// classifier's own language (e.g. a built-in property).
    pub declared_in: Option<(String, String)>,
}

impl Property {
    /// Declares a property owned by the classifier's own language.
    pub fn new(key: impl Into<String>, name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            datatype,
            declared_in: None,
        }
    }

    /// Attributes the property to a different declaring language.
    pub fn declared_in(
        mut self,
        language_key: impl Into<String>,
        language_version: impl Into<String>,
    ) -> Self {
        self.declared_in = Some((language_key.into(), language_version.into()));
        self
    }
}

/// A declared containment feature (ownership relation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Containment {
    /// Feature key, unique within the declaring language.
    pub key: String,
    /// Human-readable feature name.
    pub name: String,
    /// (key, version) of the declaring language, when it differs from the
    /// classifier's own language (e.g. an inherited feature).
    pub declared_in: Option<(String, String)>,
}

impl Containment {
    /// Declares a containment feature owned by the classifier's own language.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            declared_in: None,
        }
    }

    /// Attributes the containment to a different declaring language.
    pub fn declared_in(
        mut self,
        language_key: impl Into<String>,
        language_version: impl Into<String>,
    ) -> Self {
        self.declared_in = Some((language_key.into(), language_version.into()));
        self
    }
}

/// A declared reference feature (non-owning link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Feature key, unique within the declaring language.
    pub key: String,
    /// Human-readable feature name.
    pub name: String,
    /// (key, version) of the declaring language, when it differs from the
    /// classifier's own language (e.g. an inherited feature).
    pub declared_in: Option<(String, String)>,
}

impl Reference {
    /// Declares a reference feature owned by the classifier's own language.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            declared_in: None,
        }
    }

    /// Attributes the reference to a different declaring language.
    pub fn declared_in(
        mut self,
        language_key: impl Into<String>,
        language_version: impl Into<String>,
    ) -> Self {
        self.declared_in = Some((language_key.into(), language_version.into()));
        self
    }
}

/// Whether a classifier describes regular nodes or annotation instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// A concept: instances live in containment slots.
    Concept,
    /// An annotation type: instances attach to an annotated host.
    Annotation,
}

/// A named type descriptor with declared features.
///
/// Two classifiers are equal when they come from the same language (key and
/// version) and carry the same classifier key; feature lists do not
/// participate in identity.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Classifier key, unique within the declaring language.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Concept or annotation type.
    pub kind: ClassifierKind,
    /// Key of the declaring language; stamped by [`Language::add_classifier`].
    pub language_key: String,
    /// Version of the declaring language; stamped by [`Language::add_classifier`].
    pub language_version: String,
    /// Declared properties, in declaration order.
    pub properties: Vec<Property>,
    /// Declared containments, in declaration order.
    pub containments: Vec<Containment>,
    /// Declared references, in declaration order.
    pub references: Vec<Reference>,
}

impl PartialEq for Classifier {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.language_key == other.language_key
            && self.language_version == other.language_version
    }
}

impl Eq for Classifier {}

impl Classifier {
    /// Creates a concept descriptor with no features.
    pub fn concept(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(key, name, ClassifierKind::Concept)
    }

    /// Creates an annotation-type descriptor with no features.
    pub fn annotation(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(key, name, ClassifierKind::Annotation)
    }

    fn new(key: impl Into<String>, name: impl Into<String>, kind: ClassifierKind) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            kind,
            language_key: String::new(),
            language_version: String::new(),
            properties: Vec::new(),
            containments: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Appends a property feature (declaration order is preserved).
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Appends a containment feature (declaration order is preserved).
    pub fn with_containment(mut self, containment: Containment) -> Self {
        self.containments.push(containment);
        self
    }

    /// Appends a reference feature (declaration order is preserved).
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Meta-pointer identifying this classifier.
    pub fn meta_pointer(&self) -> MetaPointer {
        MetaPointer::new(&self.language_key, &self.language_version, &self.key)
    }

    /// Meta-pointer of one of this classifier's property features.
    ///
    /// Honors the feature's declaring-language attribution: a built-in
    /// property contributes its own language, not the classifier's.
    pub fn property_pointer(&self, property: &Property) -> MetaPointer {
        match &property.declared_in {
            Some((lang, version)) => MetaPointer::new(lang, version, &property.key),
            None => MetaPointer::new(&self.language_key, &self.language_version, &property.key),
        }
    }

    /// Meta-pointer of one of this classifier's containment features.
    pub fn containment_pointer(&self, containment: &Containment) -> MetaPointer {
        match &containment.declared_in {
            Some((lang, version)) => MetaPointer::new(lang, version, &containment.key),
            None => MetaPointer::new(&self.language_key, &self.language_version, &containment.key),
        }
    }

    /// Meta-pointer of one of this classifier's reference features.
    pub fn reference_pointer(&self, reference: &Reference) -> MetaPointer {
        match &reference.declared_in {
            Some((lang, version)) => MetaPointer::new(lang, version, &reference.key),
            None => MetaPointer::new(&self.language_key, &self.language_version, &reference.key),
        }
    }

    /// Looks up a property by feature key.
    pub fn property_by_key(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }

    /// Looks up a property by feature name.
    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Looks up a containment by feature key.
    pub fn containment_by_key(&self, key: &str) -> Option<&Containment> {
        self.containments.iter().find(|c| c.key == key)
    }

    /// Looks up a containment by feature name.
    pub fn containment_by_name(&self, name: &str) -> Option<&Containment> {
        self.containments.iter().find(|c| c.name == name)
    }

    /// Looks up a reference by feature key.
    pub fn reference_by_key(&self, key: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.key == key)
    }

    /// Looks up a reference by feature name.
    pub fn reference_by_name(&self, name: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.name == name)
    }
}

/// A versioned bundle of classifier descriptors.
#[derive(Debug, Clone)]
pub struct Language {
    /// Language key.
    pub key: String,
    /// Language version.
    pub version: String,
    /// Human-readable name.
    pub name: String,
    classifiers: Vec<Rc<Classifier>>,
}

impl Language {
    /// Creates an empty language.
    pub fn new(
        key: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            version: version.into(),
            name: name.into(),
            classifiers: Vec::new(),
        }
    }

    /// Adds a classifier, stamping it with this language's key and version.
    ///
    /// Returns the shared descriptor handed to instances and resolvers.
    pub fn add_classifier(&mut self, mut classifier: Classifier) -> Rc<Classifier> {
        classifier.language_key = self.key.clone();
        classifier.language_version = self.version.clone();
        let shared = Rc::new(classifier);
        self.classifiers.push(Rc::clone(&shared));
        shared
    }

    /// Looks up a classifier by key.
    pub fn classifier_by_key(&self, key: &str) -> Option<&Rc<Classifier>> {
        self.classifiers.iter().find(|c| c.key == key)
    }

    /// Looks up a classifier by name.
    pub fn classifier_by_name(&self, name: &str) -> Option<&Rc<Classifier>> {
        self.classifiers.iter().find(|c| c.name == name)
    }

    /// All classifiers, in declaration order.
    pub fn classifiers(&self) -> &[Rc<Classifier>] {
        &self.classifiers
    }
}
