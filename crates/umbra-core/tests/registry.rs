use glam::{Vec3, Vec4};
use umbra_core::{
    BlendOperator, Limits, SceneDescription, SceneError, SceneNode, SceneRegistry, ShapeDescriptor,
};

fn ball(name: &str) -> SceneNode {
    SceneNode::primitive(name, ShapeDescriptor::sphere(Vec3::ZERO, 1.0, Vec4::ONE))
}

fn limits(max_shapes: u32, max_objects: u32) -> Limits {
    Limits {
        max_shapes,
        max_objects,
        ..Limits::default()
    }
}

#[test]
fn child_only_nodes_cannot_register_themselves() {
    let mut registry = SceneRegistry::new(&Limits::default());
    let err = registry.register(ball("loose").as_child()).unwrap_err();
    assert_eq!(err, SceneError::ChildSelfRegistration("loose".to_string()));
    assert!(registry.is_empty());
}

#[test]
fn names_are_unique_across_the_registry() {
    let mut registry = SceneRegistry::new(&Limits::default());
    registry.register(ball("a")).unwrap();

    assert_eq!(registry.register(ball("a")), Err(SceneError::DuplicateNode("a".to_string())));

    let nested = SceneNode::compound("group", BlendOperator::Union, vec![ball("a").as_child()]);
    assert_eq!(registry.register(nested), Err(SceneError::DuplicateNode("a".to_string())));
    assert_eq!(registry.len(), 1);
}

#[test]
fn registration_respects_capacity() {
    let mut registry = SceneRegistry::new(&limits(2, 8));
    let group = SceneNode::compound(
        "group",
        BlendOperator::Union,
        vec![ball("a").as_child(), ball("b").as_child(), ball("c").as_child()],
    );
    assert_eq!(
        registry.register(group),
        Err(SceneError::Capacity {
            what: "shape",
            requested: 3,
            max: 2
        })
    );

    let mut registry = SceneRegistry::new(&limits(8, 1));
    registry.register(ball("a")).unwrap();
    assert!(matches!(
        registry.register(ball("b")),
        Err(SceneError::Capacity { what: "object", .. })
    ));
}

#[test]
fn nested_nodes_are_editable_between_frames() {
    let mut registry = SceneRegistry::new(&Limits::default());
    registry
        .register(SceneNode::compound("group", BlendOperator::Union, vec![ball("inner").as_child()]))
        .unwrap();

    match registry.get_mut("inner") {
        Some(SceneNode::Primitive(primitive)) => primitive.shape.position = Vec3::new(0.0, 3.0, 0.0),
        other => panic!("expected the nested primitive, got {other:?}"),
    }

    let flat = registry.flatten().unwrap();
    assert_eq!(flat.gpu_shapes()[0].position(), Vec3::new(0.0, 3.0, 0.0));
}

#[test]
fn removing_a_node_frees_its_names() {
    let mut registry = SceneRegistry::new(&Limits::default());
    registry
        .register(SceneNode::compound("group", BlendOperator::Union, vec![ball("inner").as_child()]))
        .unwrap();

    assert!(registry.remove("group").is_some());
    assert!(registry.remove("group").is_none());
    registry.register(ball("inner")).unwrap();
    assert_eq!(registry.shape_count(), 1);
}

const MESSY_SCENE: &str = r#"
nodes:
  - { name: s1, type: sphere, position: [0, 0, 0], radius: 1, child: true }
  - { name: s2, type: sphere, position: [1, 0, 0], radius: 1 }
  - { name: lonely, type: sphere, position: [2, 0, 0], radius: 1, child: true }
  - name: g1
    type: compound
    blend: smooth_union
    strength: 0.2
    children: [s1, s2, ghost]
  - { name: g2, type: compound, blend: union, children: [s1] }
  - { name: s1, type: sphere, position: [5, 0, 0], radius: 1 }
"#;

#[test]
fn description_errors_become_diagnostics() {
    let description = SceneDescription::from_yaml_str(MESSY_SCENE).unwrap();
    let (registry, diagnostics) = SceneRegistry::from_description(&description, &Limits::default());

    assert_eq!(
        diagnostics,
        vec![
            SceneError::DuplicateNode("s1".to_string()),
            SceneError::UnknownNode {
                parent: "g1".to_string(),
                child: "ghost".to_string()
            },
            SceneError::SharedChild {
                parent: "g2".to_string(),
                child: "s1".to_string()
            },
            SceneError::ChildSelfRegistration("s2".to_string()),
            SceneError::OrphanChild("lonely".to_string()),
        ]
    );

    let names: Vec<&str> = registry.nodes().iter().map(|n| n.name()).collect();
    assert_eq!(names, vec!["g1", "g2"]);
    assert_eq!(registry.shape_count(), 2);

    let objects = registry.flatten().unwrap().gpu_objects(0.5);
    assert_eq!(objects[0].blend, BlendOperator::SmoothUnion { strength: None }.tag());
    assert_eq!(objects[0].blend_strength, 0.2);
    assert_eq!(objects[1].shape_count, 0);
}

#[test]
fn cycles_are_broken_and_reported() {
    let source = r#"
nodes:
  - { name: a, type: compound, blend: union, children: [b] }
  - { name: b, type: compound, blend: union, children: [a], child: true }
"#;
    let description = SceneDescription::from_yaml_str(source).unwrap();
    let (registry, diagnostics) = SceneRegistry::from_description(&description, &Limits::default());

    assert_eq!(diagnostics, vec![SceneError::Cycle("a".to_string())]);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.nodes()[0].name(), "a");
    assert!(registry.flatten().unwrap().is_partitioned());
}

#[test]
fn boxes_and_compounds_resolve_from_yaml() {
    let source = r#"
nodes:
  - { name: block, type: box, position: [0, 0, 0], extents: [2, 1, 2], child: true }
  - { name: hole, type: cylinder, position: [0, 0, 0], radius: 0.4, height: 3, child: true }
  - { name: carved, type: compound, blend: subtraction, children: [block, hole] }
  - { name: ring, type: torus, position: [0, 2, 0], major_radius: 1, minor_radius: 0.2 }
"#;
    let description = SceneDescription::from_yaml_str(source).unwrap();
    let (registry, diagnostics) = SceneRegistry::from_description(&description, &Limits::default());

    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    let flat = registry.flatten().unwrap();
    assert_eq!(flat.objects.len(), 2);
    assert_eq!(flat.shapes.len(), 3);
    assert_eq!(flat.objects[0].blend, BlendOperator::Subtraction);
    assert_eq!(flat.objects[1].blend, BlendOperator::Opaque);
}
