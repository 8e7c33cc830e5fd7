use std::fs;

use symcheck::commands::{
    check_command, list_libraries_command, parse_library, print_report, resolve_config,
    stub_command, CheckOptions, ExtractorOptions,
};
use tempfile::tempdir;

const RBD_XML: &str = r#"<?xml version="1.0"?>
<CastXML format="1.1.0">
  <Function id="_1" name="rbd_open" returns="_9"/>
  <Function id="_2" name="rbd_close" returns="_9"/>
  <Function id="_3" name="rbd_stat" returns="_9"/>
  <Function id="_4" name="foo" returns="_9"/>
  <Function id="_5" name="free" returns="_9"/>
</CastXML>
"#;

#[test]
fn list_libraries_runs_in_both_modes() {
    list_libraries_command(false).unwrap();
    list_libraries_command(true).unwrap();
}

#[test]
fn unknown_library_lists_supported_keys() {
    let err = parse_library("rgw").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("no C stub available for 'rgw'"), "unexpected error: {msg}");
    assert!(msg.contains("cephfs, rados, rbd"));
    assert!(stub_command("rgw").is_err());
}

#[test]
fn resolve_config_applies_flags_over_file() {
    let temp = tempdir().unwrap();
    let cfg_path = temp.path().join("symcheck.json");
    fs::write(&cfg_path, r#"{"extractor_bin": "/opt/castxml", "timeout_secs": 5}"#).unwrap();

    let opts = ExtractorOptions {
        config: Some(cfg_path.to_string_lossy().to_string()),
        castxml: Some("/usr/bin/castxml".into()),
        timeout_secs: None,
        scratch_dir: Some("/var/tmp".into()),
    };
    let cfg = resolve_config(&opts).unwrap();
    assert_eq!(cfg.extractor_bin, std::path::PathBuf::from("/usr/bin/castxml"));
    assert_eq!(cfg.timeout_secs, Some(5));
    assert_eq!(cfg.scratch_dir, Some(std::path::PathBuf::from("/var/tmp")));
}

#[test]
fn resolve_config_errors_on_corrupt_file() {
    let temp = tempdir().unwrap();
    let cfg_path = temp.path().join("symcheck.json");
    fs::write(&cfg_path, "not-json").unwrap();
    let opts = ExtractorOptions {
        config: Some(cfg_path.to_string_lossy().to_string()),
        ..ExtractorOptions::default()
    };
    let err = resolve_config(&opts).unwrap_err();
    assert!(err.to_string().contains("Failed to load config"));
}

#[test]
fn check_with_saved_dump_reports_missing_and_unexpected() {
    let temp = tempdir().unwrap();
    let xml = temp.path().join("rbd.xml");
    fs::write(&xml, RBD_XML).unwrap();
    let implemented = temp.path().join("implemented.txt");
    fs::write(&implemented, "rbd_open\nrbd_close\nrbd_old_api\n").unwrap();

    let report = check_command(&CheckOptions {
        library: "rbd".into(),
        implemented: implemented.to_string_lossy().to_string(),
        xml: Some(xml.to_string_lossy().to_string()),
        extractor: ExtractorOptions::default(),
    })
    .unwrap();

    assert_eq!(report.prefix, "rbd_");
    assert_eq!(report.found, vec!["rbd_open", "rbd_close"]);
    assert_eq!(report.missing, vec!["rbd_stat"]);
    assert_eq!(report.unexpected, vec!["rbd_old_api"]);
    print_report(&report, false).unwrap();
    print_report(&report, true).unwrap();
}

#[test]
fn check_rejects_dump_with_nameless_function() {
    let temp = tempdir().unwrap();
    let xml = temp.path().join("bad.xml");
    fs::write(&xml, "<CastXML><Function id=\"_1\"/></CastXML>").unwrap();
    let implemented = temp.path().join("implemented.txt");
    fs::write(&implemented, "").unwrap();

    let err = check_command(&CheckOptions {
        library: "rados".into(),
        implemented: implemented.to_string_lossy().to_string(),
        xml: Some(xml.to_string_lossy().to_string()),
        extractor: ExtractorOptions::default(),
    })
    .unwrap_err();
    assert!(err.to_string().contains("Failed to decode AST dump"), "unexpected error: {err}");
}
