//! Loading test cases from YAML or JSON files

use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{errors::FlowError, types::TestCase};

/// Serialized form of a test case file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Yaml,
    Json,
}

impl CaseFormat {
    /// Pick the format from the file extension; anything but `.json` is YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CaseFormat::Json,
            _ => CaseFormat::Yaml,
        }
    }
}

/// Parse a test case from text
pub fn parse_case(text: &str, format: CaseFormat, origin: &str) -> Result<TestCase, FlowError> {
    let case: TestCase = match format {
        CaseFormat::Json => serde_json::from_str(text).map_err(|err| FlowError::Parse {
            path: origin.to_string(),
            reason: err.to_string(),
        })?,
        CaseFormat::Yaml => serde_yaml::from_str(text).map_err(|err| FlowError::Parse {
            path: origin.to_string(),
            reason: err.to_string(),
        })?,
    };
    validate_case(&case)?;
    Ok(case)
}

/// Read and parse one test case file
pub fn load_case(path: impl AsRef<Path>) -> Result<TestCase, FlowError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|err| FlowError::Io {
        path: origin.clone(),
        reason: err.to_string(),
    })?;
    let case = parse_case(&text, CaseFormat::from_path(path), &origin)?;
    debug!(path = %origin, test = %case.id, steps = case.steps.len(), "Loaded test case");
    Ok(case)
}

/// Structural checks shared by the loader and the runner
pub fn validate_case(case: &TestCase) -> Result<(), FlowError> {
    if case.id.trim().is_empty() {
        return Err(FlowError::ValidationFailed(
            "Test ID cannot be empty".to_string(),
        ));
    }
    if case.steps.is_empty() {
        return Err(FlowError::ValidationFailed(format!(
            "Test {} has no steps",
            case.id
        )));
    }
    for step in &case.steps {
        if step.id.trim().is_empty() {
            return Err(FlowError::ValidationFailed(format!(
                "Test {} has a step without an ID",
                case.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureStrategy, StepAction};

    const LOGIN_YAML: &str = r##"
id: login
name: Log in with email
suite_id: auth
base_url: https://app.test
failure_strategy: continue
steps:
  - id: open
    type: navigate
    url: /login
  - id: email
    type: fill
    element: email-input
    value: user@example.com
    strategies:
      - "#email"
      - name: by-role
        selector: role=textbox[name="Email"]
  - id: submit
    type: click
    element: login-btn
    on_failure: abort
    strategies: ["#login", "text=Log in"]
  - id: landed
    type: assert_url
    contains: /dashboard
"##;

    #[test]
    fn parses_yaml_case() {
        let case = parse_case(LOGIN_YAML, CaseFormat::Yaml, "inline").unwrap();
        assert_eq!(case.suite_id.as_deref(), Some("auth"));
        assert_eq!(case.failure_strategy, FailureStrategy::Continue);
        assert_eq!(case.steps.len(), 4);
        assert_eq!(case.steps[2].on_failure, Some(FailureStrategy::Abort));
        assert!(matches!(
            &case.steps[1].action,
            StepAction::Fill { value, strategies, .. }
                if value == "user@example.com" && strategies.len() == 2
        ));
    }

    #[test]
    fn loads_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.json");
        fs::write(
            &path,
            r##"{"id":"t","name":"t","steps":[{"id":"go","type":"navigate","url":"about:blank"}]}"##,
        )
        .unwrap();
        let case = load_case(&path).unwrap();
        assert_eq!(case.failure_strategy, FailureStrategy::Abort);
        assert_eq!(CaseFormat::from_path(&path), CaseFormat::Json);
    }

    #[test]
    fn rejects_cases_without_steps() {
        let err = parse_case("id: t\nname: t\nsteps: []\n", CaseFormat::Yaml, "inline").unwrap_err();
        assert!(matches!(err, FlowError::ValidationFailed(_)));
    }

    #[test]
    fn reports_parse_errors_with_origin() {
        let err = parse_case("{not json", CaseFormat::Json, "broken.json").unwrap_err();
        assert!(matches!(err, FlowError::Parse { path, .. } if path == "broken.json"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_case("/nonexistent/case.yaml").unwrap_err();
        assert!(err.is_retryable());
    }
}
