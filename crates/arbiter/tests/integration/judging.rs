use arbiter::{
    ExecutionLimits, ExecutionPolicy, Judge, JudgeRequest, Language, TestCase, TestOutcome,
    Verdict,
};

use super::{fixture_source, shell_config};

fn sum_request(cases: Vec<TestCase>) -> JudgeRequest {
    JudgeRequest::new(fixture_source("sum.sh"), Language::Python, cases)
}

#[tokio::test]
async fn test_sum_two_integers_accepted() {
    let judge = Judge::new(shell_config()).unwrap();
    let result = judge
        .judge(sum_request(vec![
            TestCase::new("1 2\n", "3\n"),
            TestCase::new("-5 5\n", "0"),
            TestCase::new("40 2", "42\r\n"),
        ]))
        .await;

    assert_eq!(result.status, Verdict::Accepted, "{result:?}");
    assert!(result.failed_case.is_none());
    assert_eq!(result.case_results.len(), 3);
    assert_eq!(
        result.total_execution_time_ms,
        result.case_results.iter().map(|r| r.execution_time_ms).sum::<u64>()
    );
}

#[tokio::test]
async fn test_wrong_expected_output() {
    let judge = Judge::new(shell_config()).unwrap();
    let result = judge
        .judge(sum_request(vec![TestCase::new("1 2\n", "4\n")]))
        .await;

    assert_eq!(result.status, Verdict::WrongAnswer);
    let failed = result.failed_case.expect("failed case");
    assert_eq!(failed.actual_output.as_deref(), Some("3"));
    assert_eq!(failed.expected_output, "4\n");
}

#[tokio::test]
async fn test_nonzero_exit_is_runtime_error() {
    let judge = Judge::new(shell_config()).unwrap();
    let request = JudgeRequest::new(
        "echo 'index out of range' >&2\nexit 3\n",
        Language::Python,
        vec![TestCase::new("", "")],
    );
    let result = judge.judge(request).await;

    assert_eq!(result.status, Verdict::RuntimeError);
    assert!(result.message.contains("index out of range"), "{}", result.message);
}

#[tokio::test]
async fn test_sleeping_program_exceeds_time_limit() {
    let judge = Judge::new(shell_config()).unwrap();
    let request = JudgeRequest::new("sleep 10\n", Language::Python, vec![TestCase::new("", "")])
        .with_limits(ExecutionLimits::new(300, 65_536));

    let started = std::time::Instant::now();
    let result = judge.judge(request).await;

    assert_eq!(result.status, Verdict::TimeLimitExceeded);
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_timed_out_process_is_gone() {
    let marker = tempfile::tempdir().unwrap();
    let pid_file = marker.path().join("pid");
    let source = format!("echo $$ > {}\nsleep 10\n", pid_file.display());

    let judge = Judge::new(shell_config()).unwrap();
    let request = JudgeRequest::new(source, Language::Python, vec![TestCase::new("", "")])
        .with_limits(ExecutionLimits::new(500, 65_536));
    let result = judge.judge(request).await;
    assert_eq!(result.status, Verdict::TimeLimitExceeded);

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let proc_dir = std::path::Path::new("/proc").join(pid.trim());
    assert!(!proc_dir.exists(), "process {} still exists", pid.trim());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_memory_over_limit_with_matching_output() {
    let judge = Judge::new(shell_config()).unwrap();
    // Holds ~20 MB in a shell variable while sleeping, then prints the expected answer
    let source = "x=$(head -c 20000000 /dev/zero | tr '\\0' a)\nsleep 0.5\necho ok\n";
    let request = JudgeRequest::new(source, Language::Python, vec![TestCase::new("", "ok")])
        .with_limits(ExecutionLimits::new(10_000, 4096));
    let result = judge.judge(request).await;

    assert_eq!(result.status, Verdict::MemoryLimitExceeded, "{result:?}");
    assert!(result.max_memory_used_kb > 4096);
}

#[tokio::test]
async fn test_aggregate_preserves_submission_order() {
    let mut config = shell_config();
    config.execution_policy = ExecutionPolicy::Aggregate;
    let judge = Judge::new(config).unwrap();

    // The first case is the slowest, so it finishes last
    let request = JudgeRequest::new(
        "read a\nsleep \"$a\"\necho \"$a\"\n",
        Language::Python,
        vec![
            TestCase::new("0.4\n", "0.4"),
            TestCase::new("0.2\n", "0.2"),
            TestCase::new("0\n", "1"),
        ],
    );
    let result = judge.judge(request).await;

    let inputs: Vec<_> = result.case_results.iter().map(|r| r.input.as_str()).collect();
    assert_eq!(inputs, ["0.4\n", "0.2\n", "0\n"]);
    assert_eq!(result.status, Verdict::WrongAnswer);
    assert_eq!(result.failed_case.unwrap().input, "0\n");
}

#[tokio::test]
async fn test_aggregate_reports_most_severe_verdict() {
    let mut config = shell_config();
    config.execution_policy = ExecutionPolicy::Aggregate;
    let judge = Judge::new(config).unwrap();

    let request = JudgeRequest::new(
        "read a\n[ \"$a\" = crash ] && exit 1\necho \"$a\"\n",
        Language::Python,
        vec![
            TestCase::new("x\n", "y"),
            TestCase::new("crash\n", "crash"),
            TestCase::new("z\n", "z"),
        ],
    );
    let result = judge.judge(request).await;

    assert_eq!(result.status, Verdict::RuntimeError);
    assert_eq!(result.case_results.len(), 3);
    assert_eq!(result.failed_case.unwrap().input, "crash\n");
}

#[tokio::test]
async fn test_identical_inputs_give_identical_status() {
    let judge = Judge::new(shell_config()).unwrap();
    let request = sum_request(vec![TestCase::new("2 2\n", "4"), TestCase::new("1 1\n", "3")]);

    let first = judge.judge(request.clone()).await;
    let second = judge.judge(request).await;
    assert_eq!(first.status, second.status);
    assert_eq!(first.message, second.message);
}

#[tokio::test]
async fn test_compile_error_runs_nothing() {
    let judge = Judge::new(shell_config()).unwrap();
    let request = JudgeRequest::new(
        "while do done (\n",
        Language::Python,
        vec![TestCase::new("", "")],
    );
    let result = judge.judge(request).await;

    assert_eq!(result.status, Verdict::CompilationError);
    assert!(!result.message.trim().is_empty());
    assert!(result.case_results.is_empty());
    assert_eq!(judge.metrics().cases_run, 0);
}

#[tokio::test]
async fn test_run_tests_covers_every_case() {
    let judge = Judge::new(shell_config()).unwrap();
    let report = judge
        .run_tests(sum_request(vec![
            TestCase::new("1 1\n", "3"),
            TestCase::new("1 2\n", "3"),
            TestCase::new("2 2\n", "5"),
        ]))
        .await;

    assert_eq!(report.outcome, TestOutcome::PartiallyPassed);
    assert_eq!(report.passed, 1);
    assert_eq!(report.total, 3);
    let statuses: Vec<_> = report.case_results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [Verdict::WrongAnswer, Verdict::Accepted, Verdict::WrongAnswer]
    );
}

#[tokio::test]
async fn test_concurrent_calls_share_one_judge() {
    let judge = Judge::new(shell_config()).unwrap();
    let calls = (0..4).map(|i| {
        let judge = judge.clone();
        tokio::spawn(async move {
            judge
                .judge(sum_request(vec![TestCase::new(
                    format!("{i} {i}\n"),
                    (2 * i).to_string(),
                )]))
                .await
        })
    });

    for call in calls.collect::<Vec<_>>() {
        assert_eq!(call.await.unwrap().status, Verdict::Accepted);
    }
    assert_eq!(judge.metrics().judge_calls, 4);
}
