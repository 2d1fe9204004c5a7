#![allow(missing_docs)]

mod common;

use std::rc::Rc;

use flatmodel::{
    attach_annotation, attach_child, instances_equal, Classifier, DataType, DynamicInstance,
    Language, Property, PropertyValue, ProtocolVersion, ReferenceValue, Serialization,
    UsedLanguage,
};

use common::{
    arith, refs, CONTAINED_KEY, DOC_KEY, DOC_TEXT_KEY, LEFT_KEY, REFERRED_KEY, RIGHT_KEY,
    VALUE_KEY,
};

fn session_with(language: &Language) -> Serialization {
    let mut session = Serialization::new(ProtocolVersion::V2024_1);
    session.register_language(language.clone());
    session
}

// --- TESTS ---

/// Every property datatype survives the render/parse cycle.
/// Validate `serialize_trees_to_chunk`, `deserialize_chunk`, `instances_equal`
#[test]
fn test_property_values_round_trip() -> flatmodel::Result<()> {
    let mut language = Language::new("props", "1", "Props");
    language.add_classifier(
        Classifier::concept("Props-Record", "Record")
            .with_property(Property::new("Props-Record-name", "name", DataType::String))
            .with_property(Property::new("Props-Record-count", "count", DataType::Integer))
            .with_property(Property::new("Props-Record-live", "live", DataType::Boolean)),
    );
    let record = Rc::clone(
        language
            .classifier_by_name("Record")
            .expect("declared above"),
    );
    let session = session_with(&language);

    let node = DynamicInstance::build(Some("r1"), &record);
    {
        let mut n = node.borrow_mut();
        n.set_property_value("Props-Record-name", "hello, chunk".into());
        n.set_property_value("Props-Record-count", (-42i64).into());
        n.set_property_value("Props-Record-live", true.into());
    }

    let chunk = session.serialize_trees_to_chunk(&[Rc::clone(&node)])?;
    let entry = chunk.instance_by_id("r1").ok_or_else(|| {
        flatmodel::FlatModelError::Deserialization("record missing from chunk".into())
    })?;
    assert_eq!(
        entry
            .property_by_key("Props-Record-count")
            .and_then(|p| p.value.as_deref()),
        Some("-42")
    );

    let rebuilt = session.deserialize_chunk(&chunk)?;
    assert_eq!(rebuilt.len(), 1);
    assert!(instances_equal(&node, &rebuilt[0]));
    assert_eq!(
        rebuilt[0].borrow().property_value("Props-Record-live"),
        Some(PropertyValue::Boolean(true))
    );
    Ok(())
}

/// Trees flatten parent-first, with children following their parent and
/// `parent_id` recorded on each child.
/// Validate document order and containment child lists
#[test]
fn test_trees_flatten_in_document_order() -> flatmodel::Result<()> {
    let fixture = arith();
    let session = session_with(&fixture.language);

    let left = DynamicInstance::build(Some("l"), &fixture.int_literal);
    left.borrow_mut().set_property_value(VALUE_KEY, 1i64.into());
    let right = DynamicInstance::build(Some("r"), &fixture.int_literal);
    right.borrow_mut().set_property_value(VALUE_KEY, 2i64.into());
    let sum = DynamicInstance::build(Some("s"), &fixture.sum);
    attach_child(&sum, LEFT_KEY, &left)?;
    attach_child(&sum, RIGHT_KEY, &right)?;

    let chunk = session.serialize_trees_to_chunk(&[Rc::clone(&sum)])?;

    let ids: Vec<_> = chunk
        .classifier_instances
        .iter()
        .map(|e| e.id.as_deref())
        .collect();
    assert_eq!(ids, [Some("s"), Some("l"), Some("r")]);

    let sum_entry = &chunk.classifier_instances[0];
    assert_eq!(sum_entry.parent_id, None);
    assert_eq!(
        sum_entry
            .containment_by_key(LEFT_KEY)
            .map(|c| c.children.clone()),
        Some(vec![Some("l".to_owned())])
    );
    assert_eq!(
        chunk.classifier_instances[1].parent_id.as_deref(),
        Some("s")
    );
    assert_eq!(
        chunk.classifier_instances[2].parent_id.as_deref(),
        Some("s")
    );
    Ok(())
}

/// Unset properties and empty containments/references produce no record
/// entries at all, rather than null-valued ones.
#[test]
fn test_unset_features_are_omitted() -> flatmodel::Result<()> {
    let fixture = arith();
    let session = session_with(&fixture.language);

    let lonely = DynamicInstance::build(Some("x"), &fixture.sum);
    let chunk = session.serialize_trees_to_chunk(&[lonely])?;
    let entry = &chunk.classifier_instances[0];
    assert!(entry.properties.is_empty());
    assert!(entry.containments.is_empty());
    assert!(entry.references.is_empty());
    Ok(())
}

/// Annotations are emitted right after their host and re-attached in
/// order on the way back.
/// Validate annotation closure and host-side `annotations` lists
#[test]
fn test_annotations_round_trip_in_order() -> flatmodel::Result<()> {
    let fixture = refs();
    let session = session_with(&fixture.language);

    let host = DynamicInstance::build(Some("host"), &fixture.container);
    let first = DynamicInstance::build(Some("a1"), &fixture.doc);
    first
        .borrow_mut()
        .set_property_value(DOC_TEXT_KEY, "checked by hand".into());
    let second = DynamicInstance::build(Some("a2"), &fixture.doc);
    attach_annotation(&host, &first)?;
    attach_annotation(&host, &second)?;

    let chunk = session.serialize_trees_to_chunk(&[Rc::clone(&host)])?;
    let ids: Vec<_> = chunk
        .classifier_instances
        .iter()
        .map(|e| e.id.as_deref())
        .collect();
    assert_eq!(ids, [Some("host"), Some("a1"), Some("a2")]);
    assert_eq!(
        chunk.classifier_instances[0].annotations,
        ["a1".to_owned(), "a2".to_owned()]
    );

    let rebuilt = session.deserialize_chunk(&chunk)?;
    let new_host = &rebuilt[0];
    let annotations = new_host.borrow().annotations();
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].borrow().id(), Some("a1"));
    assert_eq!(annotations[1].borrow().classifier().key, DOC_KEY);
    assert!(annotations[0]
        .borrow()
        .owner()
        .is_some_and(|o| flatmodel::same_instance(&o, new_host)));
    assert!(instances_equal(&host, new_host));
    Ok(())
}

/// The used-language set covers the language of every touched meta-pointer,
/// including features inherited from another language, with no extras.
#[test]
fn test_used_languages_are_exact() -> flatmodel::Result<()> {
    let mut language = Language::new("app", "2", "App");
    let widget = language.add_classifier(
        Classifier::concept("App-Widget", "Widget").with_property(
            Property::new("Lib-Named-name", "name", DataType::String).declared_in("lib", "1"),
        ),
    );
    let session = session_with(&language);

    let named = DynamicInstance::build(Some("w"), &widget);
    named
        .borrow_mut()
        .set_property_value("Lib-Named-name", "gauge".into());
    let chunk = session.serialize_trees_to_chunk(&[named])?;

    assert_eq!(chunk.languages.len(), 2);
    assert!(chunk.languages.contains(&UsedLanguage::new("app", "2")));
    assert!(chunk.languages.contains(&UsedLanguage::new("lib", "1")));

    // An instance touching only its own language must not drag in "lib".
    let bare = DynamicInstance::build(Some("w2"), &widget);
    let chunk = session.serialize_trees_to_chunk(&[bare])?;
    assert_eq!(chunk.languages, [UsedLanguage::new("app", "2")]);
    Ok(())
}

/// A reference with a null target ID is a legal unset reference and keeps
/// its resolve hint through a full cycle.
#[test]
fn test_unset_reference_targets_survive() -> flatmodel::Result<()> {
    let fixture = refs();
    let session = session_with(&fixture.language);

    let node = DynamicInstance::build(Some("n"), &fixture.ref_node);
    node.borrow_mut().add_reference_value(
        REFERRED_KEY,
        ReferenceValue::unresolved(None, None).with_resolve_info("the gadget"),
    );

    let chunk = session.serialize_trees_to_chunk(&[Rc::clone(&node)])?;
    let targets = chunk.classifier_instances[0]
        .reference_by_key(REFERRED_KEY)
        .map(|r| r.targets.clone())
        .unwrap_or_default();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].reference, None);
    assert_eq!(targets[0].resolve_info.as_deref(), Some("the gadget"));

    let rebuilt = session.deserialize_chunk(&chunk)?;
    let values = rebuilt[0].borrow().reference_values(REFERRED_KEY);
    assert_eq!(values.len(), 1);
    assert!(values[0].target.is_none());
    assert_eq!(values[0].resolve_info.as_deref(), Some("the gadget"));
    assert!(instances_equal(&node, &rebuilt[0]));
    Ok(())
}

/// A full graph (containment + live references) is structurally identical
/// after a chunk round trip; forest roots are the owner-less instances.
#[test]
fn test_full_graph_round_trip() -> flatmodel::Result<()> {
    let fixture = refs();
    let session = session_with(&fixture.language);

    let container = DynamicInstance::build(Some("c"), &fixture.container);
    let a = DynamicInstance::build(Some("a"), &fixture.ref_node);
    let b = DynamicInstance::build(Some("b"), &fixture.ref_node);
    attach_child(&container, CONTAINED_KEY, &a)?;
    attach_child(&container, CONTAINED_KEY, &b)?;
    a.borrow_mut()
        .add_reference_value(REFERRED_KEY, ReferenceValue::to(&b));
    b.borrow_mut()
        .add_reference_value(REFERRED_KEY, ReferenceValue::to(&a));

    let chunk = session.serialize_trees_to_chunk(&[Rc::clone(&container)])?;
    let rebuilt = session.deserialize_chunk(&chunk)?;
    assert_eq!(rebuilt.len(), 3);

    let roots: Vec<_> = rebuilt
        .iter()
        .filter(|i| i.borrow().owner().is_none())
        .collect();
    assert_eq!(roots.len(), 1);
    assert!(instances_equal(&container, roots[0]));

    // The rebuilt references point at the rebuilt siblings, not at IDs.
    let new_a = &rebuilt[1];
    let targets = new_a.borrow().reference_values(REFERRED_KEY);
    assert!(targets[0]
        .target
        .as_ref()
        .is_some_and(|t| flatmodel::same_instance(t, &rebuilt[2])));
    Ok(())
}

/// Node-set serialization emits exactly the given instances, once each,
/// without pulling in children.
/// Validate `serialize_nodes_to_chunk`
#[test]
fn test_node_sets_do_not_expand() -> flatmodel::Result<()> {
    let fixture = refs();
    let session = session_with(&fixture.language);

    let container = DynamicInstance::build(Some("c"), &fixture.container);
    let child = DynamicInstance::build(Some("k"), &fixture.ref_node);
    attach_child(&container, CONTAINED_KEY, &child)?;

    let chunk =
        session.serialize_nodes_to_chunk(&[Rc::clone(&container), Rc::clone(&container)])?;
    assert_eq!(chunk.classifier_instances.len(), 1);
    // The child stays behind, but the containment still names it by ID.
    assert_eq!(
        chunk.classifier_instances[0]
            .containment_by_key(CONTAINED_KEY)
            .map(|c| c.children.clone()),
        Some(vec![Some("k".to_owned())])
    );
    Ok(())
}
