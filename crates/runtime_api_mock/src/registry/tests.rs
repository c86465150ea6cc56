use pretty_assertions::assert_eq;

use super::*;

fn registry() -> Arc<PendingRegistry> {
    Arc::new(PendingRegistry::new())
}

#[tokio::test(flavor = "current_thread")]
async fn success_resolves_exactly_once() {
    let registry = registry();
    let pending = registry.register("r1").expect("register");

    registry
        .resolve_success("r1", Bytes::from_static(b"OK"))
        .expect("first resolution");
    let second = registry.resolve_success("r1", Bytes::from_static(b"corrupt"));
    assert_eq!(
        second,
        Err(RegistryError::AlreadyResolved("r1".to_owned()))
    );

    let value = pending.wait().await.expect("success");
    assert_eq!(value, Bytes::from_static(b"OK"));
}

#[tokio::test(flavor = "current_thread")]
async fn failure_surfaces_error_info_verbatim() {
    let registry = registry();
    let pending = registry.register("r2").expect("register");
    registry
        .resolve_failure("r2", ErrorInfo::new("Function.Crash", "bad input"))
        .expect("resolve");

    let err = pending.wait().await.expect_err("failure");
    assert_eq!(
        err,
        InvocationError::FunctionError(ErrorInfo::new("Function.Crash", "bad input"))
    );
    assert_eq!(
        err.error_info().map(|info| info.error_message.as_str()),
        Some("bad input")
    );
}

#[test]
fn duplicate_pending_registration_is_rejected() {
    let registry = registry();
    let _first = registry.register("dup").expect("register");
    let err = registry.register("dup").expect_err("duplicate");
    assert_eq!(err, RegistryError::DuplicateRequest("dup".to_owned()));
}

#[test]
fn unknown_ids_are_reported_not_panicked() {
    let registry = registry();
    assert_eq!(
        registry.resolve_success("ghost", Bytes::new()),
        Err(RegistryError::UnknownRequest("ghost".to_owned()))
    );
    assert_eq!(
        registry.resolve_failure("ghost", ErrorInfo::new("t", "m")),
        Err(RegistryError::UnknownRequest("ghost".to_owned()))
    );
}

#[test]
fn dropping_handle_removes_slot() {
    let registry = registry();
    let pending = registry.register("gone").expect("register");
    assert_eq!(registry.pending_count(), 1);
    drop(pending);
    assert_eq!(registry.pending_count(), 0);
    assert!(matches!(
        registry.resolve_success("gone", Bytes::new()),
        Err(RegistryError::UnknownRequest(_))
    ));
    registry.register("gone").expect("id is free again");
}

#[test]
fn stale_handle_does_not_remove_replacement_slot() {
    let registry = registry();
    let first = registry.register("reuse").expect("register");
    registry
        .resolve_success("reuse", Bytes::from_static(b"one"))
        .expect("resolve");
    let second = registry.register("reuse").expect("resolved id can be reused");

    drop(first);
    assert_eq!(registry.pending_count(), 1);
    assert_eq!(second.request_id(), "reuse");
}

#[tokio::test(flavor = "current_thread")]
async fn broadcast_fails_every_pending_slot() {
    let registry = registry();
    let a = registry.register("a").expect("register a");
    let b = registry.register("b").expect("register b");
    let done = registry.register("done").expect("register done");
    registry
        .resolve_success("done", Bytes::from_static(b"fine"))
        .expect("resolve");

    let info = ErrorInfo::new("Init.Failure", "boom");
    assert_eq!(registry.broadcast_failure(info.clone()), 2);

    for pending in [a, b] {
        let err = pending.wait().await.expect_err("startup failure");
        assert_eq!(err, InvocationError::StartupFailure(info.clone()));
    }
    assert_eq!(
        done.wait().await.expect("untouched"),
        Bytes::from_static(b"fine")
    );
}

#[tokio::test(flavor = "current_thread")]
async fn registration_after_startup_failure_fails_fast() {
    let registry = registry();
    registry.broadcast_failure(ErrorInfo::new("Init.Failure", "first"));
    registry.broadcast_failure(ErrorInfo::new("Init.Failure", "second"));

    let pending = registry.register("late").expect("register");
    assert!(pending.failed_at_registration());
    let err = pending.wait().await.expect_err("fails fast");
    assert_eq!(
        err,
        InvocationError::StartupFailure(ErrorInfo::new("Init.Failure", "second"))
    );
    assert_eq!(
        registry.startup_failure(),
        Some(ErrorInfo::new("Init.Failure", "second"))
    );
}

#[tokio::test(flavor = "current_thread")]
async fn fail_all_pending_releases_waiters() {
    let registry = registry();
    let pending = registry.register("x").expect("register");
    assert_eq!(registry.fail_all_pending(InvocationError::RuntimeStopped), 1);
    assert_eq!(
        pending.wait().await,
        Err(InvocationError::RuntimeStopped)
    );
}

#[tokio::test(flavor = "current_thread")]
async fn wait_timeout_reports_timeout_and_frees_slot() {
    let registry = registry();
    let pending = registry.register("slow").expect("register");
    let outcome = pending.wait_timeout(Duration::from_millis(20)).await;
    assert_eq!(outcome, Err(InvocationError::Timeout));
    assert_eq!(registry.pending_count(), 0);
}
