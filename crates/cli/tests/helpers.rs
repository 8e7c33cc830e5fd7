use std::fs;

use symcheck::read_symbol_list;
use tempfile::tempdir;

#[test]
fn read_symbol_list_skips_blanks_and_comments() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("implemented.txt");
    fs::write(&path, "# rados bindings\nrados_create\n\n  rados_connect  \n#rados_shutdown\n")
        .expect("write list");
    let symbols = read_symbol_list(&path).expect("read list");
    assert_eq!(symbols, vec!["rados_create", "rados_connect"]);
}

#[test]
fn read_symbol_list_reports_missing_file() {
    let tmp = tempdir().expect("tempdir");
    let err = read_symbol_list(&tmp.path().join("absent.txt")).unwrap_err();
    assert!(err.to_string().contains("Failed to read symbol list"), "unexpected error: {err}");
}
