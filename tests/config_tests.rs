use casetrack_core::config::CaseTrackConfig;
use casetrack_core::store::WriteMode;
use casetrack_core::CaseTrackError;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_test::assert_ok;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_load_without_file_uses_defaults() {
    let config = assert_ok!(CaseTrackConfig::load(None));
    assert_eq!(config.write.mode(), WriteMode::LastWriteWins);
    assert!(config.audit.record_batch_resets);
}

#[test]
fn test_file_enables_compare_and_swap() {
    let file = toml_file(
        r#"
[write]
compare_and_swap = true
max_conflict_retries = 5

[audit]
record_batch_resets = false

[logging]
level = "debug"
json = true
"#,
    );

    let config = CaseTrackConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.write.mode(), WriteMode::CompareAndSwap { max_retries: 5 });
    assert!(!config.audit.record_batch_resets);
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert!(config.logging.json);
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let file = toml_file("[sync]\nnotice_history = 4\n");

    let config = CaseTrackConfig::load(Some(file.path())).unwrap();

    assert_eq!(config.sync.notice_history, 4);
    assert_eq!(config.write, CaseTrackConfig::default().write);
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = toml_file("[sync]\nnotice_history = 0\n");

    let err = CaseTrackConfig::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, CaseTrackError::Configuration(_)));
}

#[test]
fn test_missing_file_is_an_error() {
    let err = CaseTrackConfig::load(Some(std::path::Path::new("/nonexistent/casetrack.toml"))).unwrap_err();
    assert!(matches!(err, CaseTrackError::Configuration(_)));
}

#[test]
fn test_environment_overrides_file() {
    // Only this test touches events.channel_capacity, so the process-wide variable is safe
    std::env::set_var("CASETRACK__EVENTS__CHANNEL_CAPACITY", "64");
    let file = toml_file("[events]\nchannel_capacity = 8\n");

    let config = CaseTrackConfig::load(Some(file.path()));
    std::env::remove_var("CASETRACK__EVENTS__CHANNEL_CAPACITY");

    assert_eq!(config.unwrap().events.channel_capacity, 64);
}
