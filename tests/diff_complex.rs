use xml_diff_core::{diff, diff_with_options, parse, Action, DiffOptions, MatchOptions, UniqueAttr};

#[test]
fn identical_inputs_have_no_actions() {
    let xml = br#"<root><items><item><id>a</id><value>1</value></item></items></root>"#;
    let left = parse(xml).expect("parse left");
    let right = parse(xml).expect("parse right");

    assert!(diff(&left, &right).is_empty());
}

#[test]
fn unique_attr_matching_tracks_reordered_repeated_elements_by_key() {
    let left = parse(
        br#"<root><rules><rule tracker="100"><descr>A</descr></rule><rule tracker="200"><descr>B</descr></rule></rules></root>"#,
    )
    .unwrap();
    let right = parse(
        br#"<root><rules><rule tracker="200"><descr>B changed</descr></rule><rule tracker="100"><descr>A</descr></rule></rules></root>"#,
    )
    .unwrap();

    let opts = DiffOptions {
        matching: MatchOptions { unique_attrs: vec![UniqueAttr::TagAttr("rule".to_string(), "tracker".to_string())], ..MatchOptions::default() },
        ..DiffOptions::default()
    };

    let actions = diff_with_options(&left, &right, &opts);

    // the reorder is a move, not a delete+insert, and rule[200]'s description changes in place
    assert!(actions.iter().any(|a| matches!(a, Action::MoveNode { .. })));
    assert!(!actions.iter().any(|a| matches!(a, Action::DeleteNode { .. } | Action::InsertNode { .. })));
    assert!(actions.iter().any(|a| matches!(a, Action::UpdateTextIn { text: Some(t), .. } if t == "B changed")));
}

#[test]
fn boundary_disjoint_trees_delete_every_left_and_insert_every_right_child() {
    let left = parse(br#"<root><a/><b/></root>"#).unwrap();
    let right = parse(br#"<root><x/><y/></root>"#).unwrap();

    let actions = diff(&left, &right);

    let deletes = actions.iter().filter(|a| matches!(a, Action::DeleteNode { .. })).count();
    let inserts = actions.iter().filter(|a| matches!(a, Action::InsertNode { .. })).count();
    assert_eq!(deletes, 2);
    assert_eq!(inserts, 2);
}

#[test]
fn boundary_empty_trees_of_same_root_produce_no_script() {
    let left = parse(b"<root/>").unwrap();
    let right = parse(b"<root/>").unwrap();
    assert!(diff(&left, &right).is_empty());
}

#[test]
fn single_move_with_no_other_change_is_exactly_one_action() {
    let left = parse(br#"<root><a/><b/><c/></root>"#).unwrap();
    let right = parse(br#"<root><b/><a/><c/></root>"#).unwrap();

    let actions = diff(&left, &right);
    assert_eq!(actions.len(), 1);
    assert!(matches!(&actions[0], Action::MoveNode { .. }));
}
