use super::*;
use hyb_ir::build::{attribute, class, function, int, method, ret, seq, structure};
use pretty_assertions::assert_eq;

fn define(types: &mut TypeSegment, node: &Node) -> Arc<TypeTemplate> {
    types.define(TypeTemplate::from_node(node).unwrap()).unwrap()
}

fn mro(template: &TypeTemplate) -> Vec<&str> {
    template.mro.iter().map(Name::as_str).collect()
}

#[test]
fn callable_from_function_node() {
    let node = function("add", &["a", "b"], seq(vec![]));
    let callable = Callable::from_node(&node, None).unwrap();
    assert_eq!(callable.name.as_str(), "add");
    assert_eq!(callable.arity(), 2);
    assert_eq!(callable.access, Access::Public);
    assert!(callable.owner.is_none());
}

#[test]
fn snapshot_owns_a_separate_body() {
    let node = function("f", &[], ret(Some(int(1))));
    let callable = Callable::from_node(&node, None).unwrap();
    let copy = callable.snapshot();
    assert!(!Arc::ptr_eq(&callable.body, &copy.body));
    assert_eq!(*callable.body, *copy.body);
}

#[test]
fn code_segment_rejects_duplicates_and_indexes_in_order() {
    let mut code = CodeSegment::default();
    let f = Callable::from_node(&function("f", &[], seq(vec![])), None).unwrap();
    let g = Callable::from_node(&function("g", &[], seq(vec![])), None).unwrap();
    assert_eq!(code.define(f.clone()), Some(0));
    assert_eq!(code.define(g), Some(1));
    assert_eq!(code.define(f), None);
    assert_eq!(code.index_of("g"), Some(1));
    assert_eq!(code.by_index(0).unwrap().name.as_str(), "f");
    let names: Vec<&str> = code.names().map(Name::as_str).collect();
    assert_eq!(names, vec!["f", "g"]);
}

#[test]
fn mro_is_self_then_bases_without_duplicates() {
    let mut types = TypeSegment::default();
    define(&mut types, &class("A", &[], vec![]));
    define(&mut types, &class("B", &["A"], vec![]));
    define(&mut types, &class("C", &["A"], vec![]));
    let d = define(&mut types, &class("D", &["B", "C"], vec![]));
    assert_eq!(mro(&d), vec!["D", "B", "A", "C"]);
    assert!(types.inherits("D", "C"));
    assert!(!types.inherits("B", "C"));
}

#[test]
fn unknown_base_and_redefinition_are_errors() {
    let mut types = TypeSegment::default();
    let err = types
        .define(TypeTemplate::from_node(&class("X", &["Missing"], vec![])).unwrap())
        .unwrap_err();
    assert_eq!(err.class(), hyb_value::ErrorClass::Syntax);
    define(&mut types, &structure("P", vec![]));
    let other = structure("P", vec![attribute("x", Access::Public, None)]);
    let err = types
        .define(TypeTemplate::from_node(&other).unwrap())
        .unwrap_err();
    assert_eq!(err.class(), hyb_value::ErrorClass::Syntax);
}

#[test]
fn identical_redeclaration_returns_the_registered_template() {
    let mut types = TypeSegment::default();
    let node = structure("P", vec![attribute("x", Access::Public, Some(int(1)))]);
    let first = define(&mut types, &node);
    let second = define(&mut types, &node);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn layout_puts_bases_first_and_overrides_initializers() {
    let mut types = TypeSegment::default();
    define(
        &mut types,
        &class(
            "Base",
            &[],
            vec![
                attribute("a", Access::Public, Some(int(1))),
                attribute("b", Access::Public, None),
            ],
        ),
    );
    define(
        &mut types,
        &class(
            "Derived",
            &["Base"],
            vec![
                attribute("c", Access::Public, None),
                attribute("a", Access::Private, Some(int(9))),
            ],
        ),
    );
    let layout = types.layout("Derived");
    let names: Vec<&str> = layout.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(layout[0].owner.as_str(), "Derived");
    assert_eq!(layout[0].access, Access::Private);
}

#[test]
fn methods_resolve_along_the_mro() {
    let mut types = TypeSegment::default();
    define(
        &mut types,
        &class(
            "Animal",
            &[],
            vec![
                method("speak", Access::Public, &[], ret(Some(int(0)))),
                method("legs", Access::Public, &[], ret(Some(int(4)))),
            ],
        ),
    );
    define(
        &mut types,
        &class(
            "Bird",
            &["Animal"],
            vec![method("legs", Access::Public, &[], ret(Some(int(2))))],
        ),
    );
    let legs = types.find_method("Bird", "legs").unwrap();
    assert_eq!(legs.owner.as_ref().unwrap().as_str(), "Bird");
    let speak = types.find_method("Bird", "speak").unwrap();
    assert_eq!(speak.owner.as_ref().unwrap().as_str(), "Animal");
    assert!(types.find_method("Bird", "fly").is_none());
}

#[test]
fn find_attribute_reports_access() {
    let mut types = TypeSegment::default();
    define(
        &mut types,
        &structure("S", vec![attribute("secret", Access::Private, None)]),
    );
    let member = types.find_attribute("S", "secret").unwrap();
    assert_eq!(member.access, Access::Private);
    assert!(types.find_attribute("S", "other").is_none());
}

#[test]
fn matches_declaration_compares_shape() {
    let node = function("f", &["a"], ret(Some(int(1))));
    let callable = Callable::from_node(&node, None).unwrap();
    assert!(callable.matches_declaration(&node));
    assert!(!callable.matches_declaration(&function("f", &["b"], ret(Some(int(1))))));
    assert!(!callable.matches_declaration(&function("f", &["a"], ret(Some(int(2))))));
    assert!(!callable.matches_declaration(&int(1)));
}
