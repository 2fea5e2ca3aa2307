use xml_diff_core::{decode, encode, parse, parse_file, write, write_file, CodecConfig, Kind, PlaceholderCodec};

fn html_config() -> CodecConfig {
    CodecConfig {
        text_tags: vec!["p".to_string()],
        single_formatting_tags: vec![],
        dual_formatting_tags: vec!["b".to_string()],
        complex_formatting_tags: vec![],
    }
}

#[test]
fn parse_write_parse_round_trip_preserves_tree_shape() {
    let xml = br#"<config version="1"><settings enabled="true"/><items><item id="1"/></items></config>"#;
    let first = parse(xml).expect("initial parse should succeed");

    let written = write(&first).expect("write should succeed");
    let second = parse(&written).expect("re-parse should succeed");

    assert!(first.structurally_equal(first.root(), second.root(), &second));
}

#[test]
fn parse_and_write_file_round_trip() {
    let xml = br#"<config version="2"><settings enabled="false"/></config>"#;
    let out_dir = tempfile::tempdir().expect("tempdir should be created");
    let in_path = out_dir.path().join("source.xml");
    std::fs::write(&in_path, xml).unwrap();
    let out_path = out_dir.path().join("roundtrip.xml");

    let tree = parse_file(&in_path).expect("parse should succeed");
    write_file(&tree, &out_path).expect("write_file should succeed");

    let reparsed = parse_file(&out_path).expect("parse_file should succeed");
    assert!(tree.structurally_equal(tree.root(), reparsed.root(), &reparsed));
}

#[test]
fn placeholder_encode_allocates_e5_e6_and_decode_restores_original() {
    let original = parse(b"<p>This is a tag with <b>formatted</b> text.</p>").unwrap();
    let mut tree = original.clone();
    let mut codec = PlaceholderCodec::new();
    let config = html_config();
    let root = tree.root();

    encode(&mut tree, root, &mut codec, &config);
    let text = tree.node(root).text.clone().unwrap();
    let chars: Vec<char> = text.chars().collect();
    let open = chars.iter().copied().find(|&c| codec.entry(c).map(|e| matches!(e.kind, Kind::Open)).unwrap_or(false)).unwrap();
    let close = codec.entry(open).unwrap().close_ref.unwrap();
    assert_eq!(close as u32, 0xE005);
    assert_eq!(open as u32, 0xE006);

    decode(&mut tree, root, &codec);
    assert_eq!(write(&tree).unwrap(), write(&original).unwrap());
}

#[test]
fn encode_is_stable_across_repeated_invocation() {
    let config = html_config();
    let mut codec = PlaceholderCodec::new();

    let mut one = parse(b"<p>A <b>bold</b> word.</p>").unwrap();
    let root1 = one.root();
    encode(&mut one, root1, &mut codec, &config);

    let mut two = parse(b"<p>A <b>bold</b> word.</p>").unwrap();
    let root2 = two.root();
    encode(&mut two, root2, &mut codec, &config);

    assert_eq!(one.node(root1).text, two.node(root2).text);
}
