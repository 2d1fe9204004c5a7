//! The live object-graph model.
//!
//! Instances are shared, interiorly-mutable graph nodes:
//! `Rc<RefCell<dyn ClassifierInstance>>`. The [`ClassifierInstance`] trait is
//! the capability set every node variant implements — the built-in
//! [`DynamicInstance`] record as well as statically-typed variants supplied
//! by callers (typically returned from custom construction functions).
//!
//! Ownership is a forest: an instance has at most one owner at any time,
//! either a containing parent or an annotated host. The owner edge is stored
//! twice — an owning forward link (parent → children, host → annotations)
//! and a non-owning `Weak` back-link — and the [`attach_child`] /
//! [`attach_annotation`] helpers detach from the old owner before attaching
//! the new one, so no transient double-ownership is observable.
//!
//! Graphs are deliberately single-threaded values (`Rc`, not `Arc`):
//! serialization and deserialization are synchronous traversals, and
//! independent sessions on independent threads each operate on their own
//! graph.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::{FlatModelError, Result};
use crate::language::{Classifier, DataType};

/// Shared handle to a live instance.
pub type InstanceRef = Rc<RefCell<dyn ClassifierInstance>>;

/// Non-owning back-link to an owner.
pub type WeakInstanceRef = Weak<RefCell<dyn ClassifierInstance>>;

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Boolean.
    Boolean(bool),
}

impl PropertyValue {
    /// Renders the value to its wire form.
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
        }
    }

    /// Parses a wire-form scalar according to the property's declared datatype.
    pub fn parse(datatype: DataType, raw: &str) -> Result<Self> {
        match datatype {
            DataType::String => Ok(Self::String(raw.to_owned())),
            DataType::Integer => raw.parse::<i64>().map(Self::Integer).map_err(|_| {
                FlatModelError::Deserialization(format!("invalid integer property value: {raw:?}"))
            }),
            DataType::Boolean => match raw {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(FlatModelError::Deserialization(format!(
                    "invalid boolean property value: {raw:?}"
                ))),
            },
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// One entry of a reference feature: a non-owning link to another instance.
///
/// The target may be live (`target`), known only by identity (`target_id`),
/// or entirely unset. `resolve_info` is an optional human-readable hint used
/// when the target cannot be located.
#[derive(Debug, Clone, Default)]
pub struct ReferenceValue {
    /// The live target, when resolved.
    pub target: Option<InstanceRef>,
    /// The target identity, when the target is not (yet) live.
    pub target_id: Option<String>,
    /// Optional resolve hint.
    pub resolve_info: Option<String>,
}

impl ReferenceValue {
    /// A reference to a live instance.
    pub fn to(target: &InstanceRef) -> Self {
        Self {
            target: Some(Rc::clone(target)),
            target_id: None,
            resolve_info: None,
        }
    }

    /// A reference known only by identity (possibly unset).
    pub fn unresolved(target_id: Option<String>, resolve_info: Option<String>) -> Self {
        Self {
            target: None,
            target_id,
            resolve_info,
        }
    }

    /// Attaches a resolve hint.
    pub fn with_resolve_info(mut self, info: impl Into<String>) -> Self {
        self.resolve_info = Some(info.into());
        self
    }

    /// The target's identity: the live target's ID when resolved, the bare
    /// target ID otherwise.
    pub fn resolved_target_id(&self) -> Option<String> {
        match &self.target {
            Some(t) => t.borrow().id().map(str::to_owned),
            None => self.target_id.clone(),
        }
    }
}

/// The capability set shared by every live node variant.
///
/// Feature values are keyed by feature key. Mutators are raw slot
/// operations; use [`attach_child`], [`attach_annotation`] and [`detach`] to
/// keep the single-owner invariant intact.
///
/// Variants must be debug-printable: instance handles show up in
/// [`ReferenceValue`] and diagnostic output.
pub trait ClassifierInstance: std::fmt::Debug {
    /// Identity of the instance; `None` means structural identity.
    fn id(&self) -> Option<&str>;

    /// The instance's type descriptor.
    fn classifier(&self) -> Rc<Classifier>;

    /// Value of the property with the given feature key, if set.
    fn property_value(&self, key: &str) -> Option<PropertyValue>;

    /// Sets (or replaces) a property value.
    fn set_property_value(&mut self, key: &str, value: PropertyValue);

    /// Ordered children of the containment feature with the given key.
    fn children(&self, containment_key: &str) -> Vec<InstanceRef>;

    /// Appends a child to a containment slot. Does not touch the child's
    /// owner back-link; see [`attach_child`].
    fn add_child(&mut self, containment_key: &str, child: InstanceRef);

    /// Removes a child (pointer identity) from whichever containment slot
    /// holds it. Returns `true` when a child was removed.
    fn remove_child(&mut self, child: &InstanceRef) -> bool;

    /// Ordered values of the reference feature with the given key.
    fn reference_values(&self, reference_key: &str) -> Vec<ReferenceValue>;

    /// Appends a reference value.
    fn add_reference_value(&mut self, reference_key: &str, value: ReferenceValue);

    /// Attached annotations, in attachment order.
    fn annotations(&self) -> Vec<InstanceRef>;

    /// Appends an annotation. Does not touch the annotation's owner
    /// back-link; see [`attach_annotation`].
    fn add_annotation(&mut self, annotation: InstanceRef);

    /// Removes an annotation (pointer identity). Returns `true` when one was
    /// removed.
    fn remove_annotation(&mut self, annotation: &InstanceRef) -> bool;

    /// The current owner: containing parent, or annotated host for
    /// annotation instances.
    fn owner(&self) -> Option<InstanceRef>;

    /// Overwrites the owner back-link. Raw slot setter.
    fn set_owner(&mut self, owner: Option<WeakInstanceRef>);

    /// Downcast support for statically-typed variants.
    fn as_any(&self) -> &dyn Any;
}

/// Pointer identity of two instance handles.
pub fn same_instance(a: &InstanceRef, b: &InstanceRef) -> bool {
    Rc::ptr_eq(a, b)
}

/// Attaches `child` to a containment slot of `parent`, detaching it from any
/// previous owner first.
///
/// Attaching an instance to itself is rejected: that would be a trivial
/// containment cycle.
pub fn attach_child(parent: &InstanceRef, containment_key: &str, child: &InstanceRef) -> Result<()> {
    if Rc::ptr_eq(parent, child) {
        return Err(FlatModelError::Serialization(
            "an instance cannot contain itself".into(),
        ));
    }
    detach(child);
    parent
        .borrow_mut()
        .add_child(containment_key, Rc::clone(child));
    child.borrow_mut().set_owner(Some(Rc::downgrade(parent)));
    Ok(())
}

/// Attaches `annotation` to `host`, detaching it from any previous owner
/// first. Annotation order is attachment order.
pub fn attach_annotation(host: &InstanceRef, annotation: &InstanceRef) -> Result<()> {
    if Rc::ptr_eq(host, annotation) {
        return Err(FlatModelError::Serialization(
            "an instance cannot annotate itself".into(),
        ));
    }
    detach(annotation);
    host.borrow_mut().add_annotation(Rc::clone(annotation));
    annotation.borrow_mut().set_owner(Some(Rc::downgrade(host)));
    Ok(())
}

/// Detaches an instance from its current owner, if any.
///
/// Removes the owning forward link (containment slot or annotation list)
/// before clearing the back-link, so no double-ownership is observable.
pub fn detach(instance: &InstanceRef) {
    let owner = instance.borrow().owner();
    if let Some(owner) = owner {
        if !Rc::ptr_eq(&owner, instance) {
            let mut o = owner.borrow_mut();
            if !o.remove_child(instance) {
                o.remove_annotation(instance);
            }
        }
    }
    instance.borrow_mut().set_owner(None);
}

/// The generic, duck-typed node record: the fallback variant used whenever
/// no statically-typed variant (and no custom construction function) exists
/// for a classifier.
///
/// Feature values are insertion-ordered key/value pairs.
#[derive(Debug)]
pub struct DynamicInstance {
    id: Option<String>,
    classifier: Rc<Classifier>,
    properties: Vec<(String, PropertyValue)>,
    containments: Vec<(String, Vec<InstanceRef>)>,
    references: Vec<(String, Vec<ReferenceValue>)>,
    annotations: Vec<InstanceRef>,
    owner: Option<WeakInstanceRef>,
}

impl DynamicInstance {
    /// Creates an empty instance of the given classifier.
    pub fn new(id: Option<String>, classifier: Rc<Classifier>) -> Self {
        Self {
            id,
            classifier,
            properties: Vec::new(),
            containments: Vec::new(),
            references: Vec::new(),
            annotations: Vec::new(),
            owner: None,
        }
    }

    /// Creates an empty instance wrapped into a shared handle.
    pub fn build(id: Option<&str>, classifier: &Rc<Classifier>) -> InstanceRef {
        Rc::new(RefCell::new(Self::new(
            id.map(str::to_owned),
            Rc::clone(classifier),
        )))
    }
}

impl ClassifierInstance for DynamicInstance {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn classifier(&self) -> Rc<Classifier> {
        Rc::clone(&self.classifier)
    }

    fn property_value(&self, key: &str) -> Option<PropertyValue> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn set_property_value(&mut self, key: &str, value: PropertyValue) {
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key.to_owned(), value)),
        }
    }

    fn children(&self, containment_key: &str) -> Vec<InstanceRef> {
        self.containments
            .iter()
            .find(|(k, _)| k == containment_key)
            .map(|(_, c)| c.clone())
            .unwrap_or_default()
    }

    fn add_child(&mut self, containment_key: &str, child: InstanceRef) {
        match self
            .containments
            .iter_mut()
            .find(|(k, _)| k == containment_key)
        {
            Some((_, children)) => children.push(child),
            None => self
                .containments
                .push((containment_key.to_owned(), vec![child])),
        }
    }

    fn remove_child(&mut self, child: &InstanceRef) -> bool {
        for (_, children) in &mut self.containments {
            if let Some(pos) = children.iter().position(|c| Rc::ptr_eq(c, child)) {
                children.remove(pos);
                return true;
            }
        }
        false
    }

    fn reference_values(&self, reference_key: &str) -> Vec<ReferenceValue> {
        self.references
            .iter()
            .find(|(k, _)| k == reference_key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    fn add_reference_value(&mut self, reference_key: &str, value: ReferenceValue) {
        match self
            .references
            .iter_mut()
            .find(|(k, _)| k == reference_key)
        {
            Some((_, values)) => values.push(value),
            None => self
                .references
                .push((reference_key.to_owned(), vec![value])),
        }
    }

    fn annotations(&self) -> Vec<InstanceRef> {
        self.annotations.clone()
    }

    fn add_annotation(&mut self, annotation: InstanceRef) {
        self.annotations.push(annotation);
    }

    fn remove_annotation(&mut self, annotation: &InstanceRef) -> bool {
        if let Some(pos) = self
            .annotations
            .iter()
            .position(|a| Rc::ptr_eq(a, annotation))
        {
            self.annotations.remove(pos);
            return true;
        }
        false
    }

    fn owner(&self) -> Option<InstanceRef> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    fn set_owner(&mut self, owner: Option<WeakInstanceRef>) {
        self.owner = owner;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Structural equality of two live instances.
///
/// Compares identity, classifier, declared feature values (properties,
/// containment subtrees, reference identities and resolve hints) and
/// annotation lists, recursing through containments and annotations.
/// Reference targets are compared by identity, never followed, so reference
/// cycles terminate.
pub fn instances_equal(a: &InstanceRef, b: &InstanceRef) -> bool {
    if Rc::ptr_eq(a, b) {
        return true;
    }
    let (a, b) = (a.borrow(), b.borrow());
    if a.id() != b.id() || a.classifier() != b.classifier() {
        return false;
    }
    let classifier = a.classifier();
    for property in &classifier.properties {
        if a.property_value(&property.key) != b.property_value(&property.key) {
            return false;
        }
    }
    for containment in &classifier.containments {
        let (ca, cb) = (a.children(&containment.key), b.children(&containment.key));
        if ca.len() != cb.len() {
            return false;
        }
        if !ca.iter().zip(&cb).all(|(x, y)| instances_equal(x, y)) {
            return false;
        }
    }
    for reference in &classifier.references {
        let (ra, rb) = (
            a.reference_values(&reference.key),
            b.reference_values(&reference.key),
        );
        if ra.len() != rb.len() {
            return false;
        }
        let same = ra.iter().zip(&rb).all(|(x, y)| {
            x.resolved_target_id() == y.resolved_target_id() && x.resolve_info == y.resolve_info
        });
        if !same {
            return false;
        }
    }
    let (aa, ab) = (a.annotations(), b.annotations());
    aa.len() == ab.len() && aa.iter().zip(&ab).all(|(x, y)| instances_equal(x, y))
}
