// tests/file_sink.rs

use std::error::Error;
use std::fs;

use tasktree::config::ConsoleSettings;
use tasktree::errors::{FailureKind, TaskTreeError};
use tasktree::message::Message;
use tasktree::render::{self, BulletedConsole};
use tasktree::{Address, Code, print_failure, run_to_file, run_with_consumer};
use tasktree_test_utils::builders::NodeSpec;
use tasktree_test_utils::recording::{RecordingConsumer, SharedBuffer};
use tasktree_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

fn plain() -> ConsoleSettings {
    ConsoleSettings {
        color: false,
        show_fraction: true,
    }
}

#[tokio::test]
async fn run_to_file_writes_one_json_line_per_message() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("logs").join("setup.log");
    let spec = NodeSpec::described("root").child(NodeSpec::described("child"));

    with_timeout(run_to_file(&path, spec.into_setup())).await?;

    let contents = fs::read_to_string(&path)?;
    let messages = contents
        .lines()
        .map(Message::from_json_line)
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0].code(), Code::Valid);
    let last = messages.last().ok_or("empty log")?;
    assert_eq!(last.code(), Code::Done);
    assert!(last.is_for_root());
    let first_line = contents.lines().next().unwrap_or("");
    assert!(first_line.contains(r#"{"d":"root","c":[{"d":"child","c":[]}]}"#));
    Ok(())
}

#[tokio::test]
async fn recorded_log_replays_to_completion() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("setup.log");
    let spec = NodeSpec::new().child(NodeSpec::new()).child(NodeSpec::new());
    with_timeout(run_to_file(&path, spec.into_setup())).await?;

    let consumer = RecordingConsumer::new();
    let count = with_timeout(render::replay(&path, consumer.clone())).await?;

    assert_eq!(count, 7);
    let seen = consumer.seen();
    assert_eq!(seen.len(), 6);
    let last = seen.last().ok_or("nothing replayed")?;
    assert_eq!((last.completed, last.total), (3, 3));
    assert_eq!(last.address, Some(Address::root()));
    Ok(())
}

#[tokio::test]
async fn build_failure_is_recorded_as_fatal_and_replays_as_failure() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("setup.log");
    let spec = NodeSpec::described("root").child(NodeSpec::described("x").fail_setup("X"));

    let err = with_timeout(run_to_file(&path, spec.into_setup()))
        .await
        .expect_err("build should fail");
    assert!(matches!(err, TaskTreeError::Build(_)));

    let contents = fs::read_to_string(&path)?;
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains(r#""fatal",{"description":"root""#));

    let err = with_timeout(render::replay(&path, RecordingConsumer::new()))
        .await
        .expect_err("replay should fail");
    assert_eq!(err.kind(), FailureKind::ChildBuild);
    let tree = err.error_tree().ok_or("fatal should carry its tree")?;
    assert_eq!(tree.children[0].messages, vec!["X".to_string()]);
    Ok(())
}

#[tokio::test]
async fn truncated_log_replays_as_closed_stream() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("setup.log");
    fs::write(
        &path,
        "[1,\"valid\",{\"c\":[{}]}]\n[2,\"begin\",\"\"]\n\n[3,\"done\",0,\"\"]\n",
    )?;

    let err = with_timeout(render::replay(&path, RecordingConsumer::new()))
        .await
        .expect_err("replay should fail");
    assert!(matches!(err, TaskTreeError::StreamClosed));
    Ok(())
}

#[tokio::test]
async fn malformed_line_is_reported_with_its_number() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("setup.log");
    fs::write(&path, "[1,\"valid\",{}]\n[2,\"exploded\",\"\"]\n")?;

    let err = with_timeout(render::replay(&path, RecordingConsumer::new()))
        .await
        .expect_err("replay should fail");
    match err {
        TaskTreeError::InvalidMessage(text) => assert!(text.contains("line 2")),
        other => panic!("expected InvalidMessage, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn console_prints_bulleted_progress() -> TestResult {
    init_tracing();

    let buffer = SharedBuffer::new();
    let console = BulletedConsole::with_writer(plain(), Box::new(buffer.clone()))?;
    let spec = NodeSpec::described("root").child(NodeSpec::described("child"));

    with_timeout(run_with_consumer(console, spec.into_setup())).await?;

    assert_eq!(
        buffer.contents(),
        " * Beginning setup and validation ...\n\
         \x20* Finished setup and validation (0/2) ...\n\
         \x20* child (1/2) ...\n\
         \x20* root (2/2) ...\n\
         \x20* Done.\n"
    );
    Ok(())
}

#[tokio::test]
async fn failures_print_json_then_the_walked_tree() -> TestResult {
    init_tracing();

    let spec = NodeSpec::described("root").child(NodeSpec::described("x").fail_setup("X"));
    let err = with_timeout(run_with_consumer(RecordingConsumer::new(), spec.into_setup()))
        .await
        .expect_err("build should fail");

    let mut out = Vec::new();
    print_failure(&err, false, &mut out)?;

    let printed = String::from_utf8(out)?;
    let lines: Vec<&str> = printed.lines().collect();
    assert!(lines[0].starts_with(" * Full JSON: {"));
    assert_eq!(&lines[1..], &[" * root:", " *   x:", " *     X"]);
    Ok(())
}
