//! Shared fixtures: two small languages and a pair of statically-typed node
//! variants exercising the custom-construction path.
#![allow(dead_code)]

use std::any::Any;
use std::rc::Rc;

use flatmodel::{
    attach_child, Classifier, ClassifierInstance, Containment, DataType, FlatModelError,
    InstanceRef, Language, PropertyValue, Reference, ReferenceValue, Serialization,
    WeakInstanceRef,
};

// --- ARITHMETIC LANGUAGE (typed variants + custom construction) ---

pub const INT_LITERAL_KEY: &str = "Arith-IntLiteral";
pub const VALUE_KEY: &str = "Arith-IntLiteral-value";
pub const SUM_KEY: &str = "Arith-Sum";
pub const LEFT_KEY: &str = "Arith-Sum-left";
pub const RIGHT_KEY: &str = "Arith-Sum-right";

pub struct Arith {
    pub language: Language,
    pub int_literal: Rc<Classifier>,
    pub sum: Rc<Classifier>,
}

pub fn arith() -> Arith {
    let mut language = Language::new("arith", "1", "Arithmetic");
    let int_literal = language.add_classifier(
        Classifier::concept(INT_LITERAL_KEY, "IntLiteral").with_property(
            flatmodel::Property::new(VALUE_KEY, "value", DataType::Integer),
        ),
    );
    let sum = language.add_classifier(
        Classifier::concept(SUM_KEY, "Sum")
            .with_containment(Containment::new(LEFT_KEY, "left"))
            .with_containment(Containment::new(RIGHT_KEY, "right")),
    );
    Arith {
        language,
        int_literal,
        sum,
    }
}

/// A statically-typed integer literal node.
#[derive(Debug)]
pub struct IntLiteral {
    id: Option<String>,
    classifier: Rc<Classifier>,
    value: PropertyValue,
    owner: Option<WeakInstanceRef>,
}

impl IntLiteral {
    pub fn build(fixture: &Arith, value: i64, id: Option<&str>) -> InstanceRef {
        Rc::new(std::cell::RefCell::new(Self {
            id: id.map(str::to_owned),
            classifier: Rc::clone(&fixture.int_literal),
            value: PropertyValue::Integer(value),
            owner: None,
        }))
    }

    pub fn value(&self) -> i64 {
        match self.value {
            PropertyValue::Integer(v) => v,
            _ => i64::MIN,
        }
    }
}

impl ClassifierInstance for IntLiteral {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn classifier(&self) -> Rc<Classifier> {
        Rc::clone(&self.classifier)
    }

    fn property_value(&self, key: &str) -> Option<PropertyValue> {
        (key == VALUE_KEY).then(|| self.value.clone())
    }

    fn set_property_value(&mut self, key: &str, value: PropertyValue) {
        if key == VALUE_KEY {
            self.value = value;
        }
    }

    fn children(&self, _containment_key: &str) -> Vec<InstanceRef> {
        Vec::new()
    }

    fn add_child(&mut self, _containment_key: &str, _child: InstanceRef) {}

    fn remove_child(&mut self, _child: &InstanceRef) -> bool {
        false
    }

    fn reference_values(&self, _reference_key: &str) -> Vec<ReferenceValue> {
        Vec::new()
    }

    fn add_reference_value(&mut self, _reference_key: &str, _value: ReferenceValue) {}

    fn annotations(&self) -> Vec<InstanceRef> {
        Vec::new()
    }

    fn add_annotation(&mut self, _annotation: InstanceRef) {}

    fn remove_annotation(&mut self, _annotation: &InstanceRef) -> bool {
        false
    }

    fn owner(&self) -> Option<InstanceRef> {
        self.owner.as_ref().and_then(std::rc::Weak::upgrade)
    }

    fn set_owner(&mut self, owner: Option<WeakInstanceRef>) {
        self.owner = owner;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A statically-typed binary node embedding its operands at construction.
#[derive(Debug)]
pub struct Sum {
    id: Option<String>,
    classifier: Rc<Classifier>,
    left: Vec<InstanceRef>,
    right: Vec<InstanceRef>,
    owner: Option<WeakInstanceRef>,
}

impl Sum {
    pub fn build(
        fixture: &Arith,
        left: InstanceRef,
        right: InstanceRef,
        id: Option<&str>,
    ) -> InstanceRef {
        let sum: InstanceRef = Rc::new(std::cell::RefCell::new(Self {
            id: id.map(str::to_owned),
            classifier: Rc::clone(&fixture.sum),
            left: Vec::new(),
            right: Vec::new(),
            owner: None,
        }));
        attach_child(&sum, LEFT_KEY, &left).expect("left operand");
        attach_child(&sum, RIGHT_KEY, &right).expect("right operand");
        sum
    }
}

impl ClassifierInstance for Sum {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn classifier(&self) -> Rc<Classifier> {
        Rc::clone(&self.classifier)
    }

    fn property_value(&self, _key: &str) -> Option<PropertyValue> {
        None
    }

    fn set_property_value(&mut self, _key: &str, _value: PropertyValue) {}

    fn children(&self, containment_key: &str) -> Vec<InstanceRef> {
        match containment_key {
            LEFT_KEY => self.left.clone(),
            RIGHT_KEY => self.right.clone(),
            _ => Vec::new(),
        }
    }

    fn add_child(&mut self, containment_key: &str, child: InstanceRef) {
        match containment_key {
            LEFT_KEY => self.left.push(child),
            RIGHT_KEY => self.right.push(child),
            _ => {}
        }
    }

    fn remove_child(&mut self, child: &InstanceRef) -> bool {
        for slot in [&mut self.left, &mut self.right] {
            if let Some(pos) = slot.iter().position(|c| Rc::ptr_eq(c, child)) {
                slot.remove(pos);
                return true;
            }
        }
        false
    }

    fn reference_values(&self, _reference_key: &str) -> Vec<ReferenceValue> {
        Vec::new()
    }

    fn add_reference_value(&mut self, _reference_key: &str, _value: ReferenceValue) {}

    fn annotations(&self) -> Vec<InstanceRef> {
        Vec::new()
    }

    fn add_annotation(&mut self, _annotation: InstanceRef) {}

    fn remove_annotation(&mut self, _annotation: &InstanceRef) -> bool {
        false
    }

    fn owner(&self) -> Option<InstanceRef> {
        self.owner.as_ref().and_then(std::rc::Weak::upgrade)
    }

    fn set_owner(&mut self, owner: Option<WeakInstanceRef>) {
        self.owner = owner;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registers the arithmetic language and its typed construction functions.
///
/// The `Sum` function deliberately performs direct ID-based child lookup,
/// which fails for children serialized without an ID.
pub fn register_arith(session: &mut Serialization, fixture: &Arith) {
    session.register_language(fixture.language.clone());

    let int_literal = Rc::clone(&fixture.int_literal);
    session.register_custom_deserializer(INT_LITERAL_KEY, move |_, entry, _, properties| {
        let value = properties
            .iter()
            .find(|(k, _)| k == VALUE_KEY)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| {
                FlatModelError::Deserialization("IntLiteral without a value".into())
            })?;
        let node: InstanceRef = Rc::new(std::cell::RefCell::new(IntLiteral {
            id: entry.id.clone(),
            classifier: Rc::clone(&int_literal),
            value,
            owner: None,
        }));
        Ok(node)
    });

    let sum = Rc::clone(&fixture.sum);
    session.register_custom_deserializer(SUM_KEY, move |_, entry, built_so_far, _| {
        let mut operands = Vec::with_capacity(2);
        for key in [LEFT_KEY, RIGHT_KEY] {
            let child_id = entry
                .containment_by_key(key)
                .and_then(|c| c.children.first())
                .and_then(Clone::clone)
                .ok_or_else(|| {
                    FlatModelError::Deserialization(format!(
                        "Sum operand {key} has no ID to look up"
                    ))
                })?;
            let child = built_so_far.get(&child_id).cloned().ok_or_else(|| {
                FlatModelError::Deserialization(format!("Sum operand {child_id} not built yet"))
            })?;
            operands.push(child);
        }
        let right = operands
            .pop()
            .ok_or_else(|| FlatModelError::Deserialization("missing operand".into()))?;
        let left = operands
            .pop()
            .ok_or_else(|| FlatModelError::Deserialization("missing operand".into()))?;
        let node: InstanceRef = Rc::new(std::cell::RefCell::new(Sum {
            id: entry.id.clone(),
            classifier: Rc::clone(&sum),
            left: Vec::new(),
            right: Vec::new(),
            owner: None,
        }));
        attach_child(&node, LEFT_KEY, &left)?;
        attach_child(&node, RIGHT_KEY, &right)?;
        Ok(node)
    });
}

/// Reads the integer value out of any variant carrying the arithmetic
/// "value" property.
pub fn int_value(instance: &InstanceRef) -> Option<i64> {
    match instance.borrow().property_value(VALUE_KEY) {
        Some(PropertyValue::Integer(v)) => Some(v),
        _ => None,
    }
}

// --- REFERENCE-HEAVY LANGUAGE (dynamic instances) ---

pub const CONTAINER_KEY: &str = "Refs-Container";
pub const CONTAINED_KEY: &str = "Refs-Container-contained";
pub const REF_NODE_KEY: &str = "Refs-RefNode";
pub const REFERRED_KEY: &str = "Refs-RefNode-referred";
pub const DOC_KEY: &str = "Refs-Doc";
pub const DOC_TEXT_KEY: &str = "Refs-Doc-text";

pub struct Refs {
    pub language: Language,
    pub container: Rc<Classifier>,
    pub ref_node: Rc<Classifier>,
    pub doc: Rc<Classifier>,
}

pub fn refs() -> Refs {
    let mut language = Language::new("refs", "1", "Refs");
    let container = language.add_classifier(
        Classifier::concept(CONTAINER_KEY, "Container")
            .with_containment(Containment::new(CONTAINED_KEY, "contained")),
    );
    let ref_node = language.add_classifier(
        Classifier::concept(REF_NODE_KEY, "RefNode")
            .with_reference(Reference::new(REFERRED_KEY, "referred")),
    );
    let doc = language.add_classifier(
        Classifier::annotation(DOC_KEY, "Doc").with_property(flatmodel::Property::new(
            DOC_TEXT_KEY,
            "text",
            DataType::String,
        )),
    );
    Refs {
        language,
        container,
        ref_node,
        doc,
    }
}
