//! The construction registry.
//!
//! Maps classifier keys to custom construction functions, looked up at
//! instantiation time during deserialization. Registration is
//! last-write-wins; absence of a registration is not an error — the generic
//! [`DynamicInstance`] path is always available as fallback.
//!
//! A construction function receives the resolved classifier, the raw
//! serialized entry, the map of instances deserialized so far (children are
//! guaranteed to be built before their parent) and the already-parsed
//! property values. It may return any [`crate::ClassifierInstance`] variant.
//!
//! A function that performs its own ID-based child lookup receives no
//! automatic help for children serialized without an ID: looking up a null
//! key finds nothing, and the function must surface that as a
//! [`crate::FlatModelError::Deserialization`]. The generic positional mechanism
//! only applies to the fallback path and to the deserializer's own
//! containment attachment.

use std::collections::HashMap;
use std::rc::Rc;

use crate::chunk::SerializedClassifierInstance;
use crate::error::Result;
use crate::instance::{DynamicInstance, InstanceRef, PropertyValue};
use crate::language::Classifier;

/// Signature of a custom construction function.
///
/// Arguments: the resolved classifier, the raw serialized entry, the
/// instances built so far (keyed by non-null ID), and the parsed property
/// values in feature order.
pub type ConstructionFn = dyn Fn(
    &Rc<Classifier>,
    &SerializedClassifierInstance,
    &HashMap<String, InstanceRef>,
    &[(String, PropertyValue)],
) -> Result<InstanceRef>;

/// Pluggable mapping from classifier key to construction function.
#[derive(Default)]
pub struct Instantiator {
    custom: HashMap<String, Box<ConstructionFn>>,
}

impl std::fmt::Debug for Instantiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instantiator")
            .field("custom_keys", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Instantiator {
    /// Creates a registry with no custom functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a construction function for a classifier key.
    ///
    /// A later registration for the same key replaces the earlier one.
    pub fn register<F>(&mut self, classifier_key: impl Into<String>, build: F)
    where
        F: Fn(
                &Rc<Classifier>,
                &SerializedClassifierInstance,
                &HashMap<String, InstanceRef>,
                &[(String, PropertyValue)],
            ) -> Result<InstanceRef>
            + 'static,
    {
        self.custom.insert(classifier_key.into(), Box::new(build));
    }

    /// Constructs an instance for a serialized entry.
    ///
    /// Dispatches to the registered function for the entry's classifier key,
    /// falling back to a [`DynamicInstance`] populated with the parsed
    /// properties. Containment and annotation wiring is the deserializer's
    /// job in both cases.
    pub fn instantiate(
        &self,
        classifier: &Rc<Classifier>,
        entry: &SerializedClassifierInstance,
        built_so_far: &HashMap<String, InstanceRef>,
        properties: &[(String, PropertyValue)],
    ) -> Result<InstanceRef> {
        if let Some(build) = self.custom.get(&classifier.key) {
            return build(classifier, entry, built_so_far, properties);
        }
        let instance = DynamicInstance::build(entry.id.as_deref(), classifier);
        {
            let mut inst = instance.borrow_mut();
            for (key, value) in properties {
                inst.set_property_value(key, value.clone());
            }
        }
        Ok(instance)
    }
}
