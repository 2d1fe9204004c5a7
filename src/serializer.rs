//! The write side: live graph → [`SerializedChunk`].
//!
//! Flattening is a synchronous depth-first pre-order walk. Visiting an
//! instance emits its own record first, then recursively visits its
//! annotations in attachment order, and only then descends into containment
//! features in declaration order. The resulting document order is
//! load-bearing: the read side resolves ID-less children positionally, so
//! writers must never reorder same-parent entries.
//!
//! Every meta-pointer touched along the way — the instance's classifier,
//! every feature used, every annotation's classifier — contributes its
//! owning language to the chunk's used-language set.

use std::collections::HashSet;
use std::rc::Rc;

use crate::chunk::{
    SerializedChunk, SerializedClassifierInstance, SerializedContainmentValue,
    SerializedPropertyValue, SerializedReferenceTarget, SerializedReferenceValue,
};
use crate::codec::Codec;
use crate::error::{FlatModelError, Result};
use crate::instance::InstanceRef;
use crate::version::ProtocolVersion;

/// Flattens live graphs into chunks.
///
/// Stateless apart from the protocol version it was constructed against;
/// the version becomes the chunk's format tag.
#[derive(Debug, Clone, Copy)]
pub struct Serializer {
    version: ProtocolVersion,
}

/// Thin pointer identity of an instance handle, for visited bookkeeping.
fn ptr_key(instance: &InstanceRef) -> usize {
    Rc::as_ptr(instance).cast::<()>() as usize
}

impl Serializer {
    /// Creates a serializer bound to a protocol version.
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    /// Serializes root instances **as trees**: every descendant reachable
    /// via containment or annotation is included, whether or not it was
    /// passed explicitly. A root that is already part of an earlier root's
    /// subtree is emitted once.
    ///
    /// # Errors
    /// [`FlatModelError::Serialization`] when the live graph violates the
    /// ownership forest (containment cycle, conflicting owner back-links).
    pub fn serialize_trees_to_chunk(&self, roots: &[InstanceRef]) -> Result<SerializedChunk> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        for root in roots {
            collect_tree(root, None, &mut ordered, &mut seen, &mut path)?;
        }
        self.emit(&ordered)
    }

    /// Serializes an explicit set of instances **as nodes**: only the given
    /// instances are flattened, with no implicit expansion. Used when a
    /// caller reconstructs a chunk for a subset, e.g. partial ID-based
    /// edits. Duplicate handles are emitted once.
    pub fn serialize_nodes_to_chunk(&self, instances: &[InstanceRef]) -> Result<SerializedChunk> {
        let mut ordered = Vec::new();
        let mut seen = HashSet::new();
        for instance in instances {
            if seen.insert(ptr_key(instance)) {
                ordered.push(Rc::clone(instance));
            }
        }
        self.emit(&ordered)
    }

    /// Composes [`Self::serialize_trees_to_chunk`] with a codec.
    pub fn serialize_trees_to_bytes(
        &self,
        roots: &[InstanceRef],
        codec: &dyn Codec,
    ) -> Result<Vec<u8>> {
        codec.encode(&self.serialize_trees_to_chunk(roots)?)
    }

    /// Composes [`Self::serialize_nodes_to_chunk`] with a codec.
    pub fn serialize_nodes_to_bytes(
        &self,
        instances: &[InstanceRef],
        codec: &dyn Codec,
    ) -> Result<Vec<u8>> {
        codec.encode(&self.serialize_nodes_to_chunk(instances)?)
    }

    /// Emits one record per collected instance, in the given order.
    fn emit(&self, ordered: &[InstanceRef]) -> Result<SerializedChunk> {
        let mut chunk = SerializedChunk::new(self.version.as_str());
        for instance in ordered {
            let entry = emit_instance(instance, &mut chunk)?;
            chunk.add_instance(entry);
        }
        Ok(chunk)
    }
}

/// Pre-order collection: the instance itself, its annotations recursively,
/// then its containment subtrees in feature-declaration order.
///
/// `path` holds the thin-pointer identities of the current descent; a child
/// already on it means the live containment links loop.
fn collect_tree(
    instance: &InstanceRef,
    expected_owner: Option<&InstanceRef>,
    ordered: &mut Vec<InstanceRef>,
    seen: &mut HashSet<usize>,
    path: &mut Vec<usize>,
) -> Result<()> {
    let key = ptr_key(instance);
    if path.contains(&key) {
        return Err(FlatModelError::Serialization(
            "containment cycle in live graph".into(),
        ));
    }
    if let Some(owner) = expected_owner {
        let actual = instance.borrow().owner();
        let consistent = actual.as_ref().is_some_and(|a| Rc::ptr_eq(a, owner));
        if !consistent {
            return Err(FlatModelError::Serialization(
                "instance owner back-link disagrees with the traversal owner \
                 (double ownership?)"
                    .into(),
            ));
        }
    }
    if !seen.insert(key) {
        // Already emitted under an earlier root.
        return Ok(());
    }
    ordered.push(Rc::clone(instance));
    path.push(key);

    let annotations = instance.borrow().annotations();
    for annotation in &annotations {
        collect_tree(annotation, Some(instance), ordered, seen, path)?;
    }
    let classifier = instance.borrow().classifier();
    for containment in &classifier.containments {
        let children = instance.borrow().children(&containment.key);
        for child in &children {
            collect_tree(child, Some(instance), ordered, seen, path)?;
        }
    }

    path.pop();
    Ok(())
}

/// Flattens a single instance into its record, registering every touched
/// meta-pointer's language with the chunk.
fn emit_instance(
    instance: &InstanceRef,
    chunk: &mut SerializedChunk,
) -> Result<SerializedClassifierInstance> {
    let inst = instance.borrow();
    let classifier = inst.classifier();

    let classifier_pointer = classifier.meta_pointer();
    chunk.add_language(classifier_pointer.used_language());

    let mut entry =
        SerializedClassifierInstance::new(inst.id().map(str::to_owned), classifier_pointer);
    entry.parent_id = inst
        .owner()
        .and_then(|owner| owner.borrow().id().map(str::to_owned));

    for property in &classifier.properties {
        if let Some(value) = inst.property_value(&property.key) {
            let pointer = classifier.property_pointer(property);
            chunk.add_language(pointer.used_language());
            entry.properties.push(SerializedPropertyValue {
                meta_pointer: pointer,
                value: Some(value.render()),
            });
        }
    }

    for containment in &classifier.containments {
        let children = inst.children(&containment.key);
        if children.is_empty() {
            continue;
        }
        let pointer = classifier.containment_pointer(containment);
        chunk.add_language(pointer.used_language());
        entry.containments.push(SerializedContainmentValue {
            meta_pointer: pointer,
            children: children
                .iter()
                .map(|child| child.borrow().id().map(str::to_owned))
                .collect(),
        });
    }

    for reference in &classifier.references {
        let values = inst.reference_values(&reference.key);
        if values.is_empty() {
            continue;
        }
        let pointer = classifier.reference_pointer(reference);
        chunk.add_language(pointer.used_language());
        entry.references.push(SerializedReferenceValue {
            meta_pointer: pointer,
            targets: values
                .iter()
                .map(|value| SerializedReferenceTarget {
                    reference: value.resolved_target_id(),
                    resolve_info: value.resolve_info.clone(),
                })
                .collect(),
        });
    }

    for annotation in inst.annotations() {
        match annotation.borrow().id() {
            Some(id) => entry.annotations.push(id.to_owned()),
            None => {
                return Err(FlatModelError::Serialization(
                    "annotation instances must carry an ID to be referenced by their host".into(),
                ))
            }
        }
    }

    Ok(entry)
}
