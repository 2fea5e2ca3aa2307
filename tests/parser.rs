use xml_diff_core::parse;

#[test]
fn parses_attributes_and_nested_elements() {
    let tree = parse(br#"<config version="1"><settings enabled="true"/><items><item id="1"/><item id="2"/><item id="3"/></items></config>"#).unwrap();

    let root = tree.root();
    assert_eq!(tree.tag(root), "config");

    let settings = tree.children(root)[0];
    assert_eq!(tree.tag(settings), "settings");
    assert_eq!(tree.node(settings).attributes.get("enabled"), Some(&"true".to_string()));

    let items = tree.children(root)[1];
    assert_eq!(tree.children(items).len(), 3);
    let first_item = tree.children(items)[0];
    assert_eq!(tree.node(first_item).attributes.get("id"), Some(&"1".to_string()));
}

#[test]
fn routes_text_before_first_child_and_tail_after_each_child() {
    let tree = parse(b"<root>lead<a>inner</a>between<b/>trail</root>").unwrap();
    let root = tree.root();

    assert_eq!(tree.node(root).text.as_deref(), Some("lead"));

    let a = tree.children(root)[0];
    assert_eq!(tree.node(a).text.as_deref(), Some("inner"));
    assert_eq!(tree.node(a).tail.as_deref(), Some("between"));

    let b = tree.children(root)[1];
    assert_eq!(tree.node(b).tail.as_deref(), Some("trail"));
}

#[test]
fn rejects_multiple_top_level_elements() {
    assert!(parse(b"<a/><b/>").is_err());
}

#[test]
fn rejects_unclosed_elements() {
    assert!(parse(b"<root><a></root>").is_err());
}
