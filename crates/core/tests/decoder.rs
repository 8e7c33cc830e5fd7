use symcheck_core::model::ModelError;
use symcheck_core::services::decoder::{
    parse_c_functions, parse_c_functions_from_file, parse_c_functions_from_reader, DecodeError,
};

fn castxml_doc(body: &str) -> String {
    format!("<?xml version=\"1.0\"?>\n<CastXML format=\"1.1.0\">\n{body}\n</CastXML>\n")
}

#[test]
fn returns_every_function_in_source_order() {
    let names = ["rbd_open", "rbd_close", "rbd_stat", "rbd_resize", "rbd_snap_create"];
    let body: String = names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            format!(
                "<Function id=\"_{i}\" name=\"{n}\" returns=\"_99\"/>\n<Variable id=\"_v{i}\" name=\"g{i}\"/>"
            )
        })
        .collect();
    let set = parse_c_functions(castxml_doc(&body).as_bytes()).unwrap();
    assert_eq!(set.len(), names.len());
    assert_eq!(set.names(), names.to_vec());
}

#[test]
fn zero_functions_is_an_empty_set_not_an_error() {
    let set = parse_c_functions(castxml_doc("<Namespace id=\"_1\" name=\"::\"/>").as_bytes()).unwrap();
    assert!(set.is_empty());
}

#[test]
fn one_missing_name_rejects_the_whole_payload() {
    let xml = castxml_doc(
        r#"<Function id="_1" name="ceph_mount"/>
<Function id="_2" returns="_5"/>
<Function id="_3" name="ceph_unmount"/>"#,
    );
    let err = parse_c_functions(xml.as_bytes()).unwrap_err();
    assert!(
        matches!(err, DecodeError::Invalid(ModelError::MissingName { index: 1 })),
        "unexpected: {err:?}"
    );
}

#[test]
fn one_empty_name_rejects_the_whole_payload() {
    let xml = castxml_doc(r#"<Function id="_1" name="ceph_mount"/><Function id="_2" name=""></Function>"#);
    assert!(parse_c_functions(xml.as_bytes()).is_err());
}

#[test]
fn malformed_markup_is_a_hard_error() {
    let mismatched = "<CastXML><Function name=\"a\"></Struct></CastXML>";
    assert!(parse_c_functions(mismatched.as_bytes()).is_err());

    let unclosed = "<CastXML><Function name=\"a\"/>";
    assert!(parse_c_functions(unclosed.as_bytes()).is_err());

    let bad_attr = "<CastXML><Function name=a/></CastXML>";
    assert!(parse_c_functions(bad_attr.as_bytes()).is_err());
}

#[test]
fn escaped_attribute_values_are_unescaped() {
    let xml = castxml_doc(r#"<Function name="op&lt;int&gt;" file="f1"/><File id="f1" name="a&amp;b.h"/>"#);
    let set = parse_c_functions(xml.as_bytes()).unwrap();
    let f = set.get("op<int>").unwrap();
    assert_eq!(f.file.as_deref(), Some("a&b.h"));
}

#[test]
fn file_and_reader_entry_points_agree_with_bytes() {
    let xml = castxml_doc(r#"<Function name="rados_shutdown"/><Function name="foo"/>"#);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rados.xml");
    std::fs::write(&path, &xml).unwrap();

    let from_bytes = parse_c_functions(xml.as_bytes()).unwrap();
    let from_file = parse_c_functions_from_file(&path).unwrap();
    let from_reader = parse_c_functions_from_reader(std::io::Cursor::new(xml.into_bytes())).unwrap();
    assert_eq!(from_bytes, from_file);
    assert_eq!(from_bytes, from_reader);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = parse_c_functions_from_file(&dir.path().join("absent.xml")).unwrap_err();
    assert!(matches!(err, DecodeError::Io(_)));
}
