use arbiter::validate::{MAX_SOURCE_LENGTH, MAX_TEST_CASE_SIZE};
use arbiter::{ExecutionLimits, Judge, JudgeRequest, Language, TestCase, Verdict};

use super::shell_config;

async fn judge(request: JudgeRequest) -> arbiter::JudgeResult {
    Judge::new(shell_config()).unwrap().judge(request).await
}

fn one_case() -> Vec<TestCase> {
    vec![TestCase::new("", "")]
}

#[tokio::test]
async fn test_empty_source_is_system_error() {
    let result = judge(JudgeRequest::new("", Language::Python, one_case())).await;
    assert_eq!(result.status, Verdict::SystemError);
    assert!(result.message.to_lowercase().contains("source code"));
}

#[tokio::test]
async fn test_oversized_source_is_rejected() {
    let source = "#".repeat(MAX_SOURCE_LENGTH + 1);
    let result = judge(JudgeRequest::new(source, Language::Python, one_case())).await;
    assert_eq!(result.status, Verdict::SystemError);
    assert!(result.message.contains("maximum length"));
}

#[tokio::test]
async fn test_too_many_cases_is_rejected() {
    let cases = vec![TestCase::new("", ""); 1001];
    let result = judge(JudgeRequest::new("echo", Language::Python, cases)).await;
    assert_eq!(result.status, Verdict::SystemError);
    assert!(result.message.to_lowercase().contains("too many"));
}

#[tokio::test]
async fn test_oversized_input_names_the_case() {
    let cases = vec![
        TestCase::new("", ""),
        TestCase::new("x".repeat(MAX_TEST_CASE_SIZE + 1), ""),
    ];
    let result = judge(JudgeRequest::new("echo", Language::Python, cases)).await;
    assert_eq!(result.status, Verdict::SystemError);
    assert!(result.message.contains("index 1"), "{}", result.message);
}

#[tokio::test]
async fn test_time_limit_above_maximum_is_rejected() {
    let request = JudgeRequest::new("echo", Language::Python, one_case())
        .with_limits(ExecutionLimits::new(60_001, 65_536));
    let result = judge(request).await;
    assert_eq!(result.status, Verdict::SystemError);
    assert!(result.message.starts_with("Time limit"));
}

#[tokio::test]
async fn test_dangerous_construct_is_runtime_error() {
    let request = JudgeRequest::new("cat ../../etc/passwd\n", Language::Python, one_case());
    let result = judge(request).await;
    assert_eq!(result.status, Verdict::RuntimeError);
    assert_eq!(result.message, "Code contains potentially dangerous operations");
    assert!(result.case_results.is_empty());
}
