//! Integration tests for replace and delete across shared content units

mod support;

use common::access::ContainerPolicy;
use common::error::SwordError;
use common::ingest::{AcceptPolicy, PolicyViolation};
use common::manager::{ReceiptKind, UnitReplaceMode};
use common::trace::Trace;
use support::{alice, binary, setup_test_env, setup_with, writer_policy, EnvOptions, Retention};

#[tokio::test]
async fn test_replace_shared_unit_updates_every_container() {
    let env = setup_test_env();
    let first = env.container("1/a", writer_policy("alice"));
    let second = env.container("1/b", writer_policy("alice"));
    let old = env.seed_file(&[first.id, second.id], "v1.txt", b"one").await;

    let mut trace = Trace::new();
    let outcome = env
        .manager
        .replace_media_resource(
            &env.unit_uri(&old),
            binary(b"two", "v2.txt"),
            Some(&alice()),
            &mut trace,
        )
        .await
        .unwrap();

    assert!(outcome.recreated);
    assert_eq!(outcome.receipt, ReceiptKind::File);
    let new = outcome.result.original_deposit().unwrap().clone();
    assert_eq!(outcome.location, env.urls.unit(new.id));

    let in_first = env.original_units(first.id).await;
    let in_second = env.original_units(second.id).await;
    assert_eq!(in_first.len(), 1);
    assert_eq!(in_second.len(), 1);
    assert_eq!(in_first[0].checksum, in_second[0].checksum);
    // one unit, referenced twice
    assert_eq!(in_first[0].id, in_second[0].id);
    assert_eq!(in_first[0].id, new.id);

    assert!(!env.store.contains_unit(old.id));
    assert!(trace.contains("Replace completed successfully"));
    assert!(trace.contains("Total time for deposit processing"));
    assert_eq!(env.workflow.triggers(), 1);
}

#[tokio::test]
async fn test_shared_unit_write_denied_on_any_container() {
    let env = setup_test_env();
    let first = env.container("1/a", writer_policy("alice"));
    let second = env.container("1/b", writer_policy("bob"));
    let unit = env.seed_file(&[first.id, second.id], "v1.txt", b"one").await;

    let err = env
        .manager
        .replace_media_resource(
            &env.unit_uri(&unit),
            binary(b"two", "v2.txt"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();
    match err {
        SwordError::Authorization { container, .. } => assert_eq!(container, Some(second.id)),
        other => panic!("expected authorization error, got {other:?}"),
    }

    // nothing changed
    assert_eq!(env.original_units(first.id).await[0].id, unit.id);
    assert_eq!(env.original_units(second.id).await[0].id, unit.id);
    assert!(env.store.contains_unit(unit.id));

    let err = env
        .manager
        .delete_media_resource(&env.unit_uri(&unit), Some(&alice()), &mut Trace::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SwordError::Authorization { .. }));
    assert!(env.store.contains_unit(unit.id));
    assert_eq!(env.workflow.triggers(), 0);
}

#[tokio::test]
async fn test_delete_shared_unit_removes_it_everywhere() {
    let env = setup_test_env();
    let first = env.container("1/a", writer_policy("alice"));
    let second = env.container("1/b", writer_policy("alice"));
    let shared = env.seed_file(&[first.id, second.id], "shared.txt", b"s").await;
    let own = env.seed_file(&[first.id], "own.txt", b"o").await;
    let before = env.last_modified(second.id).await;

    let status = env
        .manager
        .delete_media_resource(&env.unit_uri(&shared), Some(&alice()), &mut Trace::new())
        .await
        .unwrap();

    assert!(status.is_some());
    assert!(!env.store.contains_unit(shared.id));
    let remaining: Vec<_> = env
        .original_units(first.id)
        .await
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(remaining, vec![own.id]);
    assert!(env.original_units(second.id).await.is_empty());
    assert!(env.last_modified(second.id).await >= before);
}

#[tokio::test]
async fn test_replace_container_content() {
    let env = setup_test_env();
    let container = env.container("1/item", writer_policy("alice"));
    let old = env.seed_file(&[container.id], "old.txt", b"old").await;
    let kept_elsewhere = env.container("1/other", ContainerPolicy::default());
    let shared = env
        .seed_file(&[container.id, kept_elsewhere.id], "shared.txt", b"shared")
        .await;

    let outcome = env
        .manager
        .replace_media_resource(
            &env.edit_media(container.id),
            binary(b"new", "new.txt"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.receipt, ReceiptKind::MediaResource);
    assert_eq!(outcome.location, env.urls.edit_media(container.id));
    assert!(!outcome.recreated);

    let units = env.original_units(container.id).await;
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].name, "new.txt");
    assert!(!env.store.contains_unit(old.id));
    // still referenced by the other container
    assert!(env.store.contains_unit(shared.id));
    assert_eq!(env.original_units(kept_elsewhere.id).await[0].id, shared.id);
}

#[tokio::test]
async fn test_delete_container_content() {
    let env = setup_test_env();
    let container = env.container("1/item", writer_policy("alice"));
    let unit = env.seed_file(&[container.id], "a.txt", b"a").await;

    let mut trace = Trace::new();
    env.manager
        .delete_media_resource(&env.edit_media(container.id), Some(&alice()), &mut trace)
        .await
        .unwrap();

    assert!(env.original_units(container.id).await.is_empty());
    assert!(!env.store.contains_unit(unit.id));
    assert!(trace.contains("Removed file"));
}

#[tokio::test]
async fn test_rejecting_unit_replace_changes_nothing() {
    let env = setup_with(EnvOptions {
        unit_replace: UnitReplaceMode::Reject,
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));
    let unit = env.seed_file(&[container.id], "a.txt", b"a").await;

    let err = env
        .manager
        .replace_media_resource(
            &env.unit_uri(&unit),
            binary(b"b", "b.txt"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SwordError::OperationNotSupported(_)));
    assert_eq!(env.original_units(container.id).await[0].id, unit.id);
    assert_eq!(env.workflow.triggers(), 0);
}

#[tokio::test]
async fn test_feed_uri_is_read_only() {
    let env = setup_test_env();
    let container = env.container("1/a", writer_policy("alice"));

    let err = env
        .manager
        .replace_media_resource(
            env.urls.feed(container.id).as_str(),
            binary(b"b", "b.txt"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SwordError::OperationNotSupported(_)));
}

#[tokio::test]
async fn test_write_requires_credentials() {
    let env = setup_test_env();
    let container = env.container("1/a", ContainerPolicy::public());

    let err = env
        .manager
        .delete_media_resource(&env.edit_media(container.id), None, &mut Trace::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SwordError::Authentication(_)));
}

#[tokio::test]
async fn test_refused_shared_replace_leaves_every_container_intact() {
    let env = setup_with(EnvOptions {
        retention: Retention::Working,
        policy: AcceptPolicy {
            accepted_mime_types: vec!["text/plain".into()],
            ..AcceptPolicy::default()
        },
        ..EnvOptions::default()
    });
    let first = env.container("1/a", writer_policy("alice"));
    let second = env.container("1/b", writer_policy("alice"));
    let old = env.seed_file(&[first.id, second.id], "v1.txt", b"one").await;

    let err = env
        .manager
        .replace_media_resource(
            &env.unit_uri(&old),
            binary(b"%PDF", "v2.pdf"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::UnsupportedMediaType(_))
    ));
    for container in [first.id, second.id] {
        let units = env.original_units(container).await;
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].id, old.id);
    }

    // refused once, retained once
    let keys = env.diagnostics.as_ref().unwrap().keys().await.unwrap();
    assert_eq!(keys.iter().filter(|k| k.ends_with("/package")).count(), 1);
    assert_eq!(env.workflow.triggers(), 0);
}
