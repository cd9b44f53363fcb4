// tests/run_tree.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tasktree::exec::{self, NodeLog};
use tasktree::tree::{self, ErrorTree, Payload, TaskNode};
use tasktree::{Address, Code};
use tasktree_test_utils::builders::{ExecutionLog, NodeSpec};
use tasktree_test_utils::recording::RecordingSink;
use tasktree_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

async fn built(spec: NodeSpec) -> TaskNode {
    tree::build(spec.into_setup())
        .await
        .expect("tree should build")
}

fn explode(message: &str) -> anyhow::Result<()> {
    panic!("{message}")
}

fn trace_of(log: &ExecutionLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn successful_run_emits_begin_and_done_for_every_node() -> TestResult {
    init_tracing();

    let root = built(NodeSpec::new().child(NodeSpec::new())).await;
    let sink = RecordingSink::new();

    with_timeout(exec::run(root, Arc::new(sink.clone())))
        .await
        .map_err(|tree| format!("unexpected run failure:\n{tree}"))?;

    assert_eq!(
        sink.codes(),
        vec![
            (Code::Begin, Some(Address::root())),
            (Code::Begin, Some(Address::from(vec![0]))),
            (Code::Done, Some(Address::from(vec![0]))),
            (Code::Done, Some(Address::root())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn hooks_run_before_children_and_after_them() -> TestResult {
    init_tracing();

    let log = ExecutionLog::default();
    let root = built(NodeSpec::new().child(NodeSpec::new()).traced(&log)).await;

    with_timeout(exec::run(root, Arc::new(RecordingSink::new())))
        .await
        .map_err(|tree| format!("unexpected run failure:\n{tree}"))?;

    assert_eq!(
        trace_of(&log),
        vec![
            "root before",
            "root run",
            "[0] before",
            "[0] run",
            "[0] after",
            "root after",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failing_run_before_of_one_child_is_aggregated_at_the_parent() {
    init_tracing();

    let log = ExecutionLog::default();
    let root = built(
        NodeSpec::new()
            .child(NodeSpec::new())
            .child(NodeSpec::new().fail_before("bad"))
            .traced(&log),
    )
    .await;

    let err = with_timeout(exec::run(root, Arc::new(RecordingSink::new())))
        .await
        .expect_err("run should fail");

    assert_eq!(
        err,
        ErrorTree {
            description: None,
            messages: vec![],
            children: vec![ErrorTree {
                description: None,
                messages: vec!["bad".to_string()],
                children: vec![],
            }],
        }
    );

    let trace = trace_of(&log);
    assert!(trace.contains(&"[0] after".to_string()));
    assert!(!trace.contains(&"[1] run".to_string()));
    assert!(!trace.contains(&"root after".to_string()));
}

#[tokio::test]
async fn failing_run_skips_children_and_done() {
    init_tracing();

    let log = ExecutionLog::default();
    let root = built(
        NodeSpec::described("parent")
            .fail_run("no network")
            .child(NodeSpec::new())
            .traced(&log),
    )
    .await;
    let sink = RecordingSink::new();

    let err = with_timeout(exec::run(root, Arc::new(sink.clone())))
        .await
        .expect_err("run should fail");

    assert_eq!(err, ErrorTree::leaf(Some("parent".to_string()), "no network"));
    assert_eq!(trace_of(&log), vec!["root before", "root run"]);
    assert_eq!(sink.codes(), vec![(Code::Begin, Some(Address::root()))]);
}

#[tokio::test]
async fn failing_run_after_uses_single_message_form() {
    init_tracing();

    let root = built(NodeSpec::described("cleanup").fail_after("disk full")).await;

    let err = with_timeout(exec::run(root, Arc::new(RecordingSink::new())))
        .await
        .expect_err("run should fail");

    assert_eq!(err, ErrorTree::leaf(Some("cleanup".to_string()), "disk full"));
}

#[tokio::test]
async fn slow_sibling_finishes_despite_fast_failure() -> TestResult {
    init_tracing();

    let finished = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&finished);

    let root = tree::build(move |payload: Payload| async move {
        payload.add(move |slow: Payload| async move {
            slow.run(move |_log: NodeLog| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                *flag.lock().unwrap() = true;
                Ok(())
            });
            Ok(())
        })?;
        payload.add(|fast: Payload| async move {
            fast.run(|_log: NodeLog| async move { anyhow::bail!("fast failure") });
            Ok(())
        })?;
        Ok(())
    })
    .await
    .map_err(|tree| format!("unexpected build failure:\n{tree}"))?;

    let err = with_timeout(exec::run(root, Arc::new(RecordingSink::new())))
        .await
        .expect_err("run should fail");

    assert!(*finished.lock().unwrap(), "parent settled before the slow sibling");
    assert_eq!(err.children, vec![ErrorTree::leaf(None, "fast failure")]);
    Ok(())
}

#[tokio::test]
async fn panicking_hook_fails_its_node() {
    init_tracing();

    let root = tree::build(|payload: Payload| async move {
        payload.describe("panics")?;
        payload.run(|_log: NodeLog| async move { explode("hook exploded") });
        Ok(())
    })
    .await
    .expect("tree should build");

    let err = with_timeout(exec::run(root, Arc::new(RecordingSink::new())))
        .await
        .expect_err("run should fail");

    assert_eq!(err, ErrorTree::leaf(Some("panics".to_string()), "hook exploded"));
}

#[tokio::test]
async fn hooks_log_through_their_bound_address() -> TestResult {
    init_tracing();

    let root = tree::build(|payload: Payload| async move {
        payload.add(|child: Payload| async move {
            child.run(|log: NodeLog| async move {
                log.info("fetching");
                log.warn("slow mirror");
                Ok(())
            });
            Ok(())
        })?;
        Ok(())
    })
    .await
    .map_err(|tree| format!("unexpected build failure:\n{tree}"))?;
    let sink = RecordingSink::new();

    with_timeout(exec::run(root, Arc::new(sink.clone())))
        .await
        .map_err(|tree| format!("unexpected run failure:\n{tree}"))?;

    let child = Some(Address::from(vec![0]));
    let codes = sink.codes();
    assert!(codes.contains(&(Code::Info, child.clone())));
    assert!(codes.contains(&(Code::Warn, child)));

    let lines = sink.lines();
    assert!(lines.iter().any(|l| l.ends_with(r#""info",0,"fetching"]"#)));
    Ok(())
}
