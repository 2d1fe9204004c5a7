//! The read side: [`SerializedChunk`] → live graph.
//!
//! Three ordered phases:
//!
//! 1. **Classify and index.** Resolve every entry's classifier (fail fast on
//!    unregistered meta-pointers), index non-null IDs, reject duplicates.
//! 2. **Dependency-ordered instantiation.** Children are built before their
//!    parent, because a custom construction function may read already-built
//!    children out of the built-so-far map. Entries arrive in pre-order
//!    (parent first), so instantiation recurses along containment child
//!    lists instead: ID'd children are located through the index wherever
//!    they sit in the flat sequence; ID-less children are resolved
//!    positionally against the next unconsumed ID-less entry declaring this
//!    parent, in original flat order. Visiting/visited markers catch
//!    containment cycles incrementally.
//! 3. **Reference linking.** Once every instance exists (reference graph
//!    shape is irrelevant — cycles are legal), target IDs are resolved
//!    against the index and live targets attached in original order.
//!
//! Annotation IDs are always expected to be present (the positional
//! mechanism applies to containment only) and are attached host-side, in
//! order, after Phase 2.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::chunk::{SerializedChunk, SerializedClassifierInstance};
use crate::codec::Codec;
use crate::error::{FlatModelError, Result};
use crate::instance::{
    attach_annotation, attach_child, same_instance, InstanceRef, PropertyValue, ReferenceValue,
};
use crate::instantiator::Instantiator;
use crate::language::Classifier;
use crate::resolver::ClassifierResolver;
use crate::version::ProtocolVersion;

/// Rebuilds live graphs from chunks.
///
/// Borrows its resolver and construction registry from the owning session;
/// see [`crate::Serialization`].
#[derive(Debug)]
pub struct Deserializer<'a> {
    resolver: &'a ClassifierResolver,
    instantiator: &'a Instantiator,
    version: ProtocolVersion,
}

/// Entry visitation state for incremental cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Shared state of one deserialization call.
struct BuildContext<'c> {
    entries: &'c [SerializedClassifierInstance],
    classifiers: Vec<Rc<Classifier>>,
    /// Containment slots resolved to entry indices; `None` marks a child
    /// that is not part of this chunk.
    resolved_children: Vec<Vec<Vec<Option<usize>>>>,
    marks: Vec<Mark>,
    instances: Vec<Option<InstanceRef>>,
    by_id: HashMap<String, InstanceRef>,
}

impl<'a> Deserializer<'a> {
    /// Creates a deserializer over the given resolver and construction
    /// registry, bound to a protocol version.
    pub fn new(
        resolver: &'a ClassifierResolver,
        instantiator: &'a Instantiator,
        version: ProtocolVersion,
    ) -> Self {
        Self {
            resolver,
            instantiator,
            version,
        }
    }

    /// Rebuilds all instances of a chunk, returned in original flat order.
    ///
    /// Callers needing only forest roots filter by owner-absence.
    pub fn deserialize_chunk(&self, chunk: &SerializedChunk) -> Result<Vec<InstanceRef>> {
        if chunk.serialization_format_version != self.version.as_str() {
            return Err(FlatModelError::Deserialization(format!(
                "chunk format version {:?} does not match the configured protocol version {}",
                chunk.serialization_format_version, self.version
            )));
        }
        let entries = &chunk.classifier_instances;

        // Phase 1: classify and index.
        let mut classifiers = Vec::with_capacity(entries.len());
        for entry in entries {
            classifiers.push(self.resolver.resolve(&entry.classifier)?);
        }
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if let Some(id) = entry.id.as_deref() {
                if index.insert(id, i).is_some() {
                    return Err(FlatModelError::DuplicateId { id: id.to_owned() });
                }
            }
        }
        let resolved_children = resolve_containment_slots(entries, &index)?;

        // Phase 2: dependency-ordered instantiation, children first.
        let mut ctx = BuildContext {
            entries,
            classifiers,
            resolved_children,
            marks: vec![Mark::Unvisited; entries.len()],
            instances: vec![None; entries.len()],
            by_id: HashMap::new(),
        };
        for i in 0..entries.len() {
            self.build(i, &mut ctx)?;
        }

        // Annotation attachment, in declaration order per host.
        for (i, entry) in entries.iter().enumerate() {
            let host = expect_built(&ctx.instances, i)?;
            for annotation_id in &entry.annotations {
                let annotation = ctx.by_id.get(annotation_id).ok_or_else(|| {
                    FlatModelError::Deserialization(format!(
                        "annotation ID {annotation_id} does not resolve to any instance"
                    ))
                })?;
                let present = host
                    .borrow()
                    .annotations()
                    .iter()
                    .any(|a| same_instance(a, annotation));
                if !present {
                    attach_annotation(&host, annotation)?;
                }
            }
        }

        // Phase 3: reference linking.
        for (i, entry) in entries.iter().enumerate() {
            let instance = expect_built(&ctx.instances, i)?;
            for reference in &entry.references {
                let key = &reference.meta_pointer.key;
                for target in &reference.targets {
                    let value = match &target.reference {
                        Some(id) => {
                            let live = ctx.by_id.get(id).ok_or_else(|| {
                                FlatModelError::DanglingReference { target: id.clone() }
                            })?;
                            ReferenceValue {
                                target: Some(Rc::clone(live)),
                                target_id: Some(id.clone()),
                                resolve_info: target.resolve_info.clone(),
                            }
                        }
                        // Null target ID: a legal unset reference.
                        None => ReferenceValue::unresolved(None, target.resolve_info.clone()),
                    };
                    instance.borrow_mut().add_reference_value(key, value);
                }
            }
        }

        ctx.instances
            .into_iter()
            .enumerate()
            .map(|(i, instance)| {
                instance.ok_or_else(|| {
                    FlatModelError::Deserialization(format!("entry {i} was never instantiated"))
                })
            })
            .collect()
    }

    /// Composes codec decode with [`Self::deserialize_chunk`].
    pub fn deserialize_bytes(&self, bytes: &[u8], codec: &dyn Codec) -> Result<Vec<InstanceRef>> {
        self.deserialize_chunk(&codec.decode(bytes)?)
    }

    /// Recursively instantiates entry `i`, building its containment
    /// children first.
    fn build(&self, i: usize, ctx: &mut BuildContext<'_>) -> Result<()> {
        match ctx.marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => {
                return Err(FlatModelError::CyclicContainment {
                    at: ctx.entries[i].id.clone(),
                })
            }
            Mark::Unvisited => {}
        }
        ctx.marks[i] = Mark::Visiting;

        let child_indices: Vec<usize> = ctx.resolved_children[i]
            .iter()
            .flatten()
            .filter_map(|slot| *slot)
            .collect();
        for j in child_indices {
            self.build(j, ctx)?;
        }

        // Copy the slice reference out so `entry` does not pin a borrow of
        // `ctx` across the mutations below.
        let entries: &[SerializedClassifierInstance] = ctx.entries;
        let entry = &entries[i];
        let classifier = Rc::clone(&ctx.classifiers[i]);
        let properties = parse_properties(&classifier, entry)?;
        let instance = self
            .instantiator
            .instantiate(&classifier, entry, &ctx.by_id, &properties)?;

        // Generic containment attachment. Idempotent (pointer-compared), so
        // custom construction functions that pre-embed their children are
        // not double-attached.
        for (containment, slots) in entry.containments.iter().zip(&ctx.resolved_children[i]) {
            let key = &containment.meta_pointer.key;
            for slot in slots {
                let Some(j) = slot else { continue };
                let child = expect_built(&ctx.instances, *j)?;
                let present = instance
                    .borrow()
                    .children(key)
                    .iter()
                    .any(|c| same_instance(c, &child));
                if !present {
                    attach_child(&instance, key, &child)?;
                }
            }
        }

        if let Some(id) = &entry.id {
            ctx.by_id.insert(id.clone(), Rc::clone(&instance));
        }
        ctx.instances[i] = Some(instance);
        ctx.marks[i] = Mark::Done;
        Ok(())
    }
}

/// Pairs every containment slot of every entry with the entry index of its
/// child, consuming ID-less candidates positionally.
///
/// A child ID that resolves to nothing is kept as `None` (the chunk may be a
/// partial node-set); an ID-less slot with no remaining candidate declaring
/// the parent is an ambiguity error.
fn resolve_containment_slots(
    entries: &[SerializedClassifierInstance],
    index: &HashMap<&str, usize>,
) -> Result<Vec<Vec<Vec<Option<usize>>>>> {
    // ID-less entries queue up under their declared parent, in flat order.
    let mut candidates: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if entry.id.is_none() {
            if let Some(parent_id) = entry.parent_id.as_deref() {
                candidates.entry(parent_id).or_default().push_back(i);
            }
        }
    }

    let mut resolved = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut per_feature = Vec::with_capacity(entry.containments.len());
        for containment in &entry.containments {
            let mut slots = Vec::with_capacity(containment.children.len());
            for child in &containment.children {
                match child {
                    Some(id) => slots.push(index.get(id.as_str()).copied()),
                    None => {
                        let next = entry
                            .id
                            .as_deref()
                            .and_then(|parent_id| candidates.get_mut(parent_id))
                            .and_then(VecDeque::pop_front);
                        match next {
                            Some(j) => slots.push(Some(j)),
                            None => {
                                return Err(FlatModelError::AmbiguousNullId {
                                    parent: entry.id.clone(),
                                })
                            }
                        }
                    }
                }
            }
            per_feature.push(slots);
        }
        resolved.push(per_feature);
    }
    Ok(resolved)
}

/// Parses an entry's serialized property values against the classifier's
/// declared datatypes. Unset values are skipped.
fn parse_properties(
    classifier: &Rc<Classifier>,
    entry: &SerializedClassifierInstance,
) -> Result<Vec<(String, PropertyValue)>> {
    let mut parsed = Vec::with_capacity(entry.properties.len());
    for property in &entry.properties {
        let key = &property.meta_pointer.key;
        let declared = classifier.property_by_key(key).ok_or_else(|| {
            FlatModelError::Deserialization(format!(
                "classifier {} declares no property with key {key}",
                classifier.key
            ))
        })?;
        if let Some(raw) = &property.value {
            parsed.push((key.clone(), PropertyValue::parse(declared.datatype, raw)?));
        }
    }
    Ok(parsed)
}

/// Fetches the already-built instance for an entry index.
fn expect_built(instances: &[Option<InstanceRef>], i: usize) -> Result<InstanceRef> {
    instances
        .get(i)
        .and_then(|slot| slot.as_ref())
        .map(Rc::clone)
        .ok_or_else(|| {
            FlatModelError::Deserialization(format!(
                "internal: entry {i} used before it was instantiated"
            ))
        })
}
