use arbiter::{Judge, JudgeRequest, Language, TestCase, Verdict};

use super::{fixture_source, shell_config};

fn leftover_dirs(root: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_working_directory_removed_after_accepted_run() {
    let root = tempfile::tempdir().unwrap();
    let mut config = shell_config();
    config.temp_root = Some(root.path().to_path_buf());
    let judge = Judge::new(config).unwrap();

    let request = JudgeRequest::new(
        fixture_source("sum.sh"),
        Language::Python,
        vec![TestCase::new("1 2\n", "3")],
    );
    assert_eq!(judge.judge(request).await.status, Verdict::Accepted);
    assert!(leftover_dirs(root.path()).is_empty());
}

#[tokio::test]
async fn test_working_directory_removed_after_compile_error() {
    let root = tempfile::tempdir().unwrap();
    let mut config = shell_config();
    config.temp_root = Some(root.path().to_path_buf());
    let judge = Judge::new(config).unwrap();

    let request = JudgeRequest::new("fi (\n", Language::Python, vec![TestCase::new("", "")]);
    assert_eq!(judge.judge(request).await.status, Verdict::CompilationError);
    assert!(leftover_dirs(root.path()).is_empty());
}

#[tokio::test]
async fn test_working_directory_removed_after_program_writes_files() {
    let root = tempfile::tempdir().unwrap();
    let mut config = shell_config();
    config.temp_root = Some(root.path().to_path_buf());
    config.temp_prefix = "case_".to_string();
    let judge = Judge::new(config).unwrap();

    // The program runs in its working directory and litters it
    let source = "mkdir -p out/nested\necho data > out/nested/file\necho done\n";
    let request = JudgeRequest::new(source, Language::Python, vec![TestCase::new("", "done")]);
    assert_eq!(judge.judge(request).await.status, Verdict::Accepted);
    assert!(leftover_dirs(root.path()).is_empty());
}

#[tokio::test]
async fn test_missing_temp_root_is_system_error() {
    let mut config = shell_config();
    config.temp_root = Some("/nonexistent/arbiter-root".into());
    let judge = Judge::new(config).unwrap();

    let request = JudgeRequest::new("echo", Language::Python, vec![TestCase::new("", "")]);
    let result = judge.judge(request).await;
    assert_eq!(result.status, Verdict::SystemError);
    assert!(result.message.starts_with("System error"), "{}", result.message);
}
