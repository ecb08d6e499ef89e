//! Integration tests for deposit ingest and retention of failed packages

mod support;

use std::sync::Arc;

use bytes::Bytes;
use common::error::SwordError;
use common::ingest::{AcceptPolicy, IngesterRegistry, PolicyViolation, RetainedPackage};
use common::manager::ReceiptKind;
use common::model::{packaging, DepositPackage, DEPOSIT_GROUP};
use common::trace::Trace;
use support::{
    alice, binary, setup_test_env, setup_with, writer_policy, zip_package, EnvOptions,
    FailingIngester, Retention, BROKEN_PACKAGING,
};

#[tokio::test]
async fn test_binary_post_returns_file_receipt() {
    let env = setup_test_env();
    let container = env.container("1/a", writer_policy("alice"));

    let mut trace = Trace::new();
    let outcome = env
        .manager
        .add_resource(
            &env.edit_media(container.id),
            binary(b"%PDF", "paper.pdf"),
            Some(&alice()),
            &mut trace,
        )
        .await
        .unwrap();

    let unit = outcome.result.original_deposit().unwrap();
    assert_eq!(outcome.receipt, ReceiptKind::File);
    assert_eq!(outcome.location, env.urls.unit(unit.id));
    assert_eq!(unit.mime_type, "application/pdf");
    assert_eq!(outcome.result.ingester, "Binary");
    assert!(trace.contains("Loaded ingester: Binary"));
    assert!(trace.contains("Add completed successfully"));
    assert_eq!(env.original_units(container.id).await.len(), 1);
}

#[tokio::test]
async fn test_zip_post_returns_full_receipt() {
    let env = setup_test_env();
    let container = env.container("1/a", writer_policy("alice"));
    env.seed_file(&[container.id], "existing.txt", b"keep").await;

    let outcome = env
        .manager
        .add_resource(
            &env.edit_media(container.id),
            zip_package(&[("a.txt", b"alpha"), ("b.png", b"png")]),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.receipt, ReceiptKind::Full);
    assert_eq!(outcome.location, env.urls.edit_media(container.id));
    assert_eq!(outcome.result.units.len(), 2);
    assert_eq!(outcome.result.units[1].mime_type, "image/png");

    let names: Vec<String> = env
        .original_units(container.id)
        .await
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["existing.txt", "a.txt", "b.png"]);
}

#[tokio::test]
async fn test_keep_original_package() {
    let env = setup_with(EnvOptions {
        keep_original_package: true,
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));
    let package = zip_package(&[("a.txt", b"alpha")]);
    let payload = package.payload().clone();

    let outcome = env
        .manager
        .add_resource(
            &env.edit_media(container.id),
            package,
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap();

    let stored = outcome.result.stored_package.unwrap();
    let kept = env.group_units(container.id, DEPOSIT_GROUP).await;
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].id, stored.id);
    assert_eq!(kept[0].checksum, common::model::Checksum::md5(&payload));
}

#[tokio::test]
async fn test_failed_ingest_is_recoverable_from_side_store() {
    let env = setup_with(EnvOptions {
        retention: Retention::Working,
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));
    let payload = Bytes::from_static(b"this is not a zip archive");
    let package = DepositPackage::with_packaging(
        payload.clone(),
        "application/zip".parse().unwrap(),
        packaging::SIMPLE_ZIP,
    )
    .entry(Bytes::from_static(b"<entry xmlns=\"http://www.w3.org/2005/Atom\"/>"));

    let mut trace = Trace::new();
    let err = env
        .manager
        .add_resource(&env.edit_media(container.id), package, Some(&alice()), &mut trace)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::MalformedPackage(_))
    ));

    let diagnostics = env.diagnostics.as_ref().unwrap();
    let keys = diagnostics.keys().await.unwrap();
    let package_key = keys.iter().find(|k| k.ends_with("/package")).unwrap();
    let prefix = package_key.trim_end_matches("/package").to_string();
    let retained = common::ingest::RetainedPackage {
        prefix,
        keys: keys.clone(),
    };
    assert_eq!(diagnostics.payload(&retained).await.unwrap().unwrap(), payload);
    assert!(diagnostics.entry(&retained).await.unwrap().is_some());
    assert!(keys.iter().any(|k| k.ends_with("/deposit.json")));
    assert!(trace.contains("Failed deposit package stored at"));

    // nothing was stored and nothing was triggered
    assert!(env.original_units(container.id).await.is_empty());
    assert_eq!(env.workflow.triggers(), 0);
}

#[tokio::test]
async fn test_failed_side_store_keeps_original_error() {
    let env = setup_with(EnvOptions {
        retention: Retention::Broken,
        policy: AcceptPolicy {
            max_upload_size: Some(4),
            ..AcceptPolicy::default()
        },
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));

    let mut trace = Trace::new();
    let err = env
        .manager
        .add_resource(
            &env.edit_media(container.id),
            binary(b"far too large", "big.bin"),
            Some(&alice()),
            &mut trace,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::TooLarge { size: 13, limit: 4 })
    ));
    assert_eq!(env.broken_diagnostics.as_ref().unwrap().attempts(), 1);
    assert!(trace.contains("Unable to store failed deposit package"));
}

#[tokio::test]
async fn test_refused_replace_is_retained_before_removal() {
    let env = setup_with(EnvOptions {
        retention: Retention::Working,
        policy: AcceptPolicy {
            accepted_mime_types: vec!["application/pdf".into()],
            ..AcceptPolicy::default()
        },
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));
    let existing = env.seed_file(&[container.id], "keep.pdf", b"%PDF").await;

    let err = env
        .manager
        .replace_media_resource(
            &env.edit_media(container.id),
            binary(b"text", "notes.txt"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::UnsupportedMediaType(_))
    ));
    assert_eq!(env.original_units(container.id).await[0].id, existing.id);
    assert!(!env.diagnostics.as_ref().unwrap().keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checksum_mismatch() {
    let env = setup_test_env();
    let container = env.container("1/a", writer_policy("alice"));

    let err = env
        .manager
        .add_resource(
            &env.edit_media(container.id),
            binary(b"hello world", "hello.txt").content_md5("d41d8cd98f00b204e9800998ecf8427e"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::ChecksumMismatch { .. })
    ));
}

#[tokio::test]
async fn test_unknown_packaging_is_rejected() {
    let env = setup_test_env();
    let container = env.container("1/a", writer_policy("alice"));
    let package = DepositPackage::with_packaging(
        Bytes::from_static(b"<mets/>"),
        "application/xml".parse().unwrap(),
        "http://purl.org/net/sword/package/METSDSpaceSIP",
    );

    let err = env
        .manager
        .add_resource(&env.edit_media(container.id), package, Some(&alice()), &mut Trace::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::UnsupportedPackaging(_))
    ));
}

#[tokio::test]
async fn test_post_to_unit_is_not_supported() {
    let env = setup_test_env();
    let container = env.container("1/a", writer_policy("alice"));
    let unit = env.seed_file(&[container.id], "a.txt", b"a").await;

    let err = env
        .manager
        .add_resource(
            &env.unit_uri(&unit),
            binary(b"b", "b.txt"),
            Some(&alice()),
            &mut Trace::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SwordError::OperationNotSupported(_)));
}

#[tokio::test]
async fn test_zip_expansion_is_held_to_upload_limit() {
    let env = setup_with(EnvOptions {
        retention: Retention::Working,
        policy: AcceptPolicy {
            max_upload_size: Some(64 * 1024),
            ..AcceptPolicy::default()
        },
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));
    let zeros = vec![0u8; 4 << 20];
    let package = zip_package(&[("zeros.bin", &zeros)]);
    assert!(package.size() < 64 * 1024);

    let mut trace = Trace::new();
    let err = env
        .manager
        .add_resource(&env.edit_media(container.id), package, Some(&alice()), &mut trace)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SwordError::AcceptPolicy(PolicyViolation::TooLarge { limit: 65_536, .. })
    ));
    assert!(env.original_units(container.id).await.is_empty());
    assert!(trace.contains("Failed deposit package stored at"));
    assert_eq!(env.workflow.triggers(), 0);
}

#[tokio::test]
async fn test_ingester_fault_is_retained_and_returned_unchanged() {
    let env = setup_with(EnvOptions {
        retention: Retention::Working,
        ingesters: Some(IngesterRegistry::with_defaults().register(Arc::new(FailingIngester))),
        ..EnvOptions::default()
    });
    let container = env.container("1/a", writer_policy("alice"));
    let payload = Bytes::from_static(b"<video/>");
    let package = DepositPackage::with_packaging(
        payload.clone(),
        "application/xml".parse().unwrap(),
        BROKEN_PACKAGING,
    );

    let mut trace = Trace::new();
    let err = env
        .manager
        .add_resource(&env.edit_media(container.id), package, Some(&alice()), &mut trace)
        .await
        .unwrap_err();

    assert!(matches!(&err, SwordError::Ingest(message) if message == "transcoder crashed"));
    assert!(trace.contains("Loaded ingester: Failing"));
    assert!(trace.contains("Failed deposit package stored at"));

    let diagnostics = env.diagnostics.as_ref().unwrap();
    let keys = diagnostics.keys().await.unwrap();
    let package_key = keys.iter().find(|k| k.ends_with("/package")).unwrap();
    let retained = RetainedPackage {
        prefix: package_key.trim_end_matches("/package").to_string(),
        keys: keys.clone(),
    };
    assert_eq!(diagnostics.payload(&retained).await.unwrap().unwrap(), payload);
    assert!(env.original_units(container.id).await.is_empty());
    assert_eq!(env.workflow.triggers(), 0);
}
