// tests/build_tree.rs

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tasktree::Address;
use tasktree::errors::TaskTreeError;
use tasktree::tree::{self, ErrorTree, Payload};
use tasktree_test_utils::builders::NodeSpec;
use tasktree_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn explode(message: &str) -> anyhow::Result<()> {
    panic!("{message}")
}

#[tokio::test]
async fn successful_build_keeps_descriptions_and_add_order() -> TestResult {
    init_tracing();

    let spec = NodeSpec::described("root")
        .child(NodeSpec::described("a"))
        .child(NodeSpec::described("b").child(NodeSpec::described("b0")));

    let root = with_timeout(tree::build(spec.into_setup()))
        .await
        .map_err(|tree| format!("unexpected build failure:\n{tree}"))?;

    assert_eq!(root.description(), Some("root"));
    assert!(root.address().is_root());
    let children: Vec<_> = root.children().iter().map(|c| c.description()).collect();
    assert_eq!(children, vec![Some("a"), Some("b")]);

    let grandchild = &root.children()[1].children()[0];
    assert_eq!(grandchild.address(), &Address::from(vec![1, 0]));
    assert_eq!(root.shape().node_count(), 4);
    Ok(())
}

#[tokio::test]
async fn failed_child_setup_is_reported_under_its_parent() {
    init_tracing();

    let spec = NodeSpec::new()
        .child(NodeSpec::new())
        .child(NodeSpec::new().fail_setup("X"));

    let err = with_timeout(tree::build(spec.into_setup()))
        .await
        .expect_err("build should fail");

    assert_eq!(
        err,
        ErrorTree {
            description: None,
            messages: vec![],
            children: vec![ErrorTree {
                description: None,
                messages: vec!["X".to_string()],
                children: vec![],
            }],
        }
    );
}

#[tokio::test]
async fn own_setup_failure_discards_child_failures() {
    init_tracing();

    let spec = NodeSpec::described("parent")
        .fail_setup("parent broke")
        .child(NodeSpec::described("child").fail_setup("child broke"));

    let err = with_timeout(tree::build(spec.into_setup()))
        .await
        .expect_err("build should fail");

    assert_eq!(err, ErrorTree::leaf(Some("parent".to_string()), "parent broke"));
}

#[tokio::test]
async fn nested_failures_keep_their_path() {
    init_tracing();

    let spec = NodeSpec::described("root")
        .child(NodeSpec::described("ok"))
        .child(
            NodeSpec::described("mid")
                .child(NodeSpec::described("fine"))
                .child(NodeSpec::described("deep").fail_setup("missing tool")),
        );

    let err = with_timeout(tree::build(spec.into_setup()))
        .await
        .expect_err("build should fail");

    assert_eq!(err.description.as_deref(), Some("root"));
    assert_eq!(err.children.len(), 1);
    let mid = &err.children[0];
    assert_eq!(mid.description.as_deref(), Some("mid"));
    assert!(mid.messages.is_empty());
    assert_eq!(
        mid.children,
        vec![ErrorTree::leaf(Some("deep".to_string()), "missing tool")]
    );
}

#[tokio::test]
async fn panicking_setup_fails_like_an_error() {
    init_tracing();

    let err = with_timeout(tree::build(|payload: Payload| async move {
        payload.add(|child: Payload| async move {
            child.describe("explodes")?;
            explode("boom")
        })?;
        Ok(())
    }))
    .await
    .expect_err("build should fail");

    assert_eq!(
        err.children,
        vec![ErrorTree::leaf(Some("explodes".to_string()), "boom")]
    );
}

#[tokio::test]
async fn children_can_be_added_after_suspension_and_keep_call_order() -> TestResult {
    init_tracing();

    let root = with_timeout(tree::build(|payload: Payload| async move {
        payload.add(|slow: Payload| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            slow.describe("slow")?;
            Ok(())
        })?;
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        payload.add(|fast: Payload| async move {
            fast.describe("fast")?;
            Ok(())
        })?;
        Ok(())
    }))
    .await
    .map_err(|tree| format!("unexpected build failure:\n{tree}"))?;

    let order: Vec<_> = root.children().iter().map(|c| c.description()).collect();
    assert_eq!(order, vec![Some("slow"), Some("fast")]);
    Ok(())
}

#[tokio::test]
async fn parent_waits_for_children_still_building() -> TestResult {
    init_tracing();

    let root = with_timeout(tree::build(|payload: Payload| async move {
        payload.add(|child: Payload| async move {
            child.add(|grandchild: Payload| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                grandchild.describe("late")?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    }))
    .await
    .map_err(|tree| format!("unexpected build failure:\n{tree}"))?;

    assert_eq!(root.children()[0].children()[0].description(), Some("late"));
    Ok(())
}

#[tokio::test]
async fn add_after_setup_settled_is_rejected() {
    init_tracing();

    let stash: Arc<Mutex<Option<Payload>>> = Arc::default();
    let kept = Arc::clone(&stash);

    with_timeout(tree::build(move |payload: Payload| async move {
        *kept.lock().unwrap() = Some(payload);
        Ok(())
    }))
    .await
    .expect("build should succeed");

    let payload = stash.lock().unwrap().take().unwrap();
    let result = payload.add(|_p: Payload| async { Ok(()) });
    assert!(matches!(result, Err(TaskTreeError::PayloadSealed(address)) if address.is_root()));
}

#[tokio::test]
async fn description_is_write_once() {
    init_tracing();

    let err = with_timeout(tree::build(|payload: Payload| async move {
        payload.describe("first")?;
        payload.describe("second")?;
        Ok(())
    }))
    .await
    .expect_err("second description should fail the setup");

    assert_eq!(err.description.as_deref(), Some("first"));
    assert!(err.messages[0].contains("already set"));
}

#[tokio::test]
async fn add_returns_child_addresses() {
    init_tracing();

    let addresses: Arc<Mutex<Vec<Address>>> = Arc::default();
    let seen = Arc::clone(&addresses);

    with_timeout(tree::build(move |payload: Payload| async move {
        let first = payload.add(move |child: Payload| async move {
            let nested = child.add(|_p: Payload| async { Ok(()) })?;
            seen.lock().unwrap().push(nested);
            Ok(())
        })?;
        let second = payload.add(|_p: Payload| async { Ok(()) })?;
        assert_eq!(first, Address::from(vec![0]));
        assert_eq!(second, Address::from(vec![1]));
        Ok(())
    }))
    .await
    .expect("build should succeed");

    assert_eq!(*addresses.lock().unwrap(), vec![Address::from(vec![0, 0])]);
}
