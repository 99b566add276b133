use std::io::Write;

use packflow::config::WorkflowsConfig;
use packflow::PackflowError;

mod common;

const VALID_WORKFLOWS: &str = r#"
steps:
  - branch_package:
      source_project: devel:tools
      source_package: ctris
      target_project: home:bot:ci
  - configure_repositories:
      target_project: home:bot:ci
      repositories:
        - name: standard
          paths:
            - target_project: openSUSE:Factory
              target_repository: snapshot
          architectures: [x86_64, aarch64]
  - submit_request:
      source_project: devel:tools
      source_package: ctris
      target_project: games
"#;

#[test]
fn test_load_valid_workflow_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VALID_WORKFLOWS.as_bytes()).unwrap();

    let config = WorkflowsConfig::load(file.path()).unwrap();
    assert_eq!(config.steps.len(), 3);
    assert_eq!(config.steps[0].kind(), "branch_package");
    assert_eq!(config.steps[2].kind(), "submit_request");
}

#[test]
fn test_missing_file_is_a_config_error() {
    let err = WorkflowsConfig::load(std::path::Path::new("/nonexistent/workflows.yml"))
        .unwrap_err();
    assert!(matches!(err, PackflowError::ConfigError(_)));
}

#[test]
fn test_unparseable_yaml_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"steps: [not: [valid").unwrap();

    assert!(WorkflowsConfig::load(file.path()).is_err());
}

#[test]
fn test_semantic_validation_runs_on_load() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"
steps:
  - configure_repositories:
      target_project: home:bot:ci
      repositories:
        - name: standard
          paths:
            - target_project: openSUSE:Factory
              target_repository: snapshot
          architectures: [vax]
"#,
    )
    .unwrap();

    let err = WorkflowsConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("unknown architecture"));
}
