use super::*;
use pretty_assertions::assert_eq;

fn id(index: u32) -> ValueId {
    ValueId {
        index,
        generation: 0,
    }
}

#[test]
fn type_names() {
    assert_eq!(Value::Int(1).type_name(), "integer");
    assert_eq!(Value::Vector(vec![]).type_name(), "array");
    assert_eq!(Value::Map(MapValue::default()).type_name(), "map");
    assert_eq!(Value::Reference(id(0)).type_name(), "reference");
}

#[test]
fn children_of_containers() {
    let vector = Value::Vector(vec![id(1), id(2)]);
    assert_eq!(vector.children(), vec![id(1), id(2)]);

    let map = Value::Map(MapValue {
        keys: vec![id(3)],
        values: vec![id(4)],
    });
    assert_eq!(map.children(), vec![id(3), id(4)]);

    let mut inst = Instance::new(Name::new("P"));
    inst.fields.push((Name::new("x"), id(5)));
    assert_eq!(Value::Struct(inst).children(), vec![id(5)]);

    assert_eq!(Value::Reference(id(6)).children(), vec![id(6)]);
    assert_eq!(Value::Alias(AliasTarget::Function(2)).children(), vec![]);
    assert_eq!(Value::Int(7).children(), vec![]);
}

#[test]
fn hierarchy_rank_orders_composites_first() {
    let mut tags = vec![
        TypeTag::Int,
        TypeTag::Vector,
        TypeTag::Reference,
        TypeTag::Str,
        TypeTag::Class,
        TypeTag::Map,
        TypeTag::Struct,
    ];
    tags.sort_by_key(|t| std::cmp::Reverse(t.hierarchy_rank()));
    assert_eq!(
        tags,
        vec![
            TypeTag::Reference,
            TypeTag::Class,
            TypeTag::Struct,
            TypeTag::Map,
            TypeTag::Vector,
            TypeTag::Str,
            TypeTag::Int,
        ]
    );
}

#[test]
fn footprint_grows_with_payload() {
    let small = Value::Str("a".to_string()).footprint();
    let large = Value::Str("a".repeat(100)).footprint();
    assert_eq!(large - small, 99);
}

#[test]
fn instance_field_lookup() {
    let mut inst = Instance::new(Name::new("P"));
    inst.fields.push((Name::new("x"), id(1)));
    inst.fields.push((Name::new("y"), id(2)));
    assert_eq!(inst.field("y"), Some(id(2)));
    assert_eq!(inst.field("z"), None);
}

#[test]
fn attributes_compose() {
    let attrs = Attributes::CONSTANT | Attributes::LAGGING;
    assert!(attrs.contains(Attributes::CONSTANT));
    assert!(!attrs.contains(Attributes::GARBAGE));
}
