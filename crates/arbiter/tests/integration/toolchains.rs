//! End-to-end runs against real toolchains and the sandbox wrapper

use arbiter::{Config, Judge, JudgeRequest, Language, SandboxPolicy, TestCase, Verdict};

use super::fixture_source;

fn unsandboxed_judge() -> Judge {
    let mut config = Config::default();
    config.sandbox = SandboxPolicy::disabled();
    // JVM and Kotlin compiles are slow
    config.compile_timeout_ms = 120_000;
    Judge::new(config).unwrap()
}

async fn assert_hello_world(language: Language, fixture: &str) {
    let request = JudgeRequest::new(
        fixture_source(fixture),
        language,
        vec![TestCase::new("", "Hello, World!\n")],
    )
    .with_limits(arbiter::ExecutionLimits::new(10_000, 1024 * 1024));

    let result = unsandboxed_judge().judge(request).await;
    assert_eq!(result.status, Verdict::Accepted, "{language}: {}", result.message);
}

#[tokio::test]
#[ignore = "requires gcc"]
async fn test_hello_c() {
    assert_hello_world(Language::C, "hello.c").await;
}

#[tokio::test]
#[ignore = "requires g++"]
async fn test_hello_cpp() {
    assert_hello_world(Language::Cpp, "hello.cpp").await;
}

#[tokio::test]
#[ignore = "requires a JDK"]
async fn test_hello_java() {
    assert_hello_world(Language::Java, "Hello.java").await;
}

#[tokio::test]
#[ignore = "requires kotlinc and a JDK"]
async fn test_hello_kotlin() {
    assert_hello_world(Language::Kotlin, "hello.kt").await;
}

#[tokio::test]
#[ignore = "requires python3"]
async fn test_hello_python() {
    assert_hello_world(Language::Python, "hello.py").await;
}

#[tokio::test]
#[ignore = "requires rustc"]
async fn test_hello_rust() {
    assert_hello_world(Language::Rust, "hello.rs").await;
}

#[tokio::test]
#[ignore = "requires go"]
async fn test_hello_go() {
    assert_hello_world(Language::Go, "hello.go").await;
}

#[tokio::test]
#[ignore = "requires php"]
async fn test_hello_php() {
    assert_hello_world(Language::Php, "hello.php").await;
}

#[tokio::test]
#[ignore = "requires g++"]
async fn test_cpp_sum_and_wrong_answer() {
    let judge = unsandboxed_judge();
    let source = fixture_source("sum.cpp");

    let accepted = judge
        .judge(JudgeRequest::new(
            source.clone(),
            Language::Cpp,
            vec![TestCase::new("1 2\n", "3\n"), TestCase::new("100 -1\n", "99\n")],
        ))
        .await;
    assert_eq!(accepted.status, Verdict::Accepted, "{}", accepted.message);

    let wrong = judge
        .judge(JudgeRequest::new(source, Language::Cpp, vec![TestCase::new("1 2\n", "4\n")]))
        .await;
    assert_eq!(wrong.status, Verdict::WrongAnswer);
    assert_eq!(
        wrong.failed_case.unwrap().actual_output.as_deref(),
        Some("3")
    );
}

#[tokio::test]
#[ignore = "requires g++"]
async fn test_cpp_compile_error_has_diagnostics() {
    let result = unsandboxed_judge()
        .judge(JudgeRequest::new(
            fixture_source("compile_error.cpp"),
            Language::Cpp,
            vec![TestCase::new("", "")],
        ))
        .await;
    assert_eq!(result.status, Verdict::CompilationError);
    assert!(result.message.contains("error"), "{}", result.message);
}

#[tokio::test]
#[ignore = "requires python3 and firejail"]
async fn test_sandboxed_python() {
    let judge = Judge::new(Config::default()).unwrap();
    let request = JudgeRequest::new(
        "a, b = map(int, input().split())\nprint(a + b)\n",
        Language::Python,
        vec![TestCase::new("20 22\n", "42\n")],
    )
    .with_limits(arbiter::ExecutionLimits::new(10_000, 262_144));

    let result = judge.judge(request).await;
    assert_eq!(result.status, Verdict::Accepted, "{}", result.message);
}
