//! Integration tests for uploads against an in-memory ledger and gateway

mod common;

use std::time::Duration;

use ::common::bulletin::{BulletinClient, UploadError};
use ::common::crypto::DEV_PHRASE;
use ::common::gateway::GatewayReader;
use ::common::ledger::memory::FailureMode;
use ::common::ledger::{
    AuthorizationMode, LedgerSession, MemoryLedger, SessionPool, TransportError,
};
use ::common::linked_data::compute_cid;
use crate::common::{account, setup_test_env, MEMORY_ENDPOINT};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Note {
    title: String,
    n: u32,
}

#[tokio::test]
async fn test_upload_and_read_back() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());

    let data = b"hello world";
    let result = client.upload(data, &opts).await.unwrap();

    assert_eq!(result.cid, compute_cid(data));
    assert_eq!(
        result.cid.to_string(),
        "bafk2bzaceaswza5ss4iu2ia3galz6pyo6dfm5f4dmiw2lf2de22dmf4k533ba"
    );
    assert_eq!(
        result.gateway_url,
        format!("{}{}", opts.gateway_base_url, result.cid)
    );
    assert!(ledger.block(&result.block_hash).is_some());

    let reader = GatewayReader::new().unwrap();
    let bytes = reader.read_bytes(&result.gateway_url).await.unwrap();
    assert_eq!(&bytes[..], data);
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_upload_json_round_trip() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());

    let note = Note {
        title: "Test".to_string(),
        n: 5,
    };
    let result = client.upload_json(&note, &opts).await.unwrap();
    assert_eq!(
        result.cid.to_string(),
        "bafk2bzaceczrse36hb3usrxhknxo72r7vqzx6z2sdadg7xhizjs5wq6gakhos"
    );

    let reader = GatewayReader::new().unwrap();
    let back: Note = reader.read_json(&result.gateway_url).await.unwrap();
    assert_eq!(back, note);

    let verified = reader
        .read_verified(&opts.gateway_base_url, &result.cid)
        .await
        .unwrap();
    assert_eq!(compute_cid(&verified), result.cid);
}

#[tokio::test]
async fn test_same_bytes_same_cid() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());

    let first = client.upload(b"twice", &opts).await.unwrap();
    let second = client.upload(b"twice", &opts).await.unwrap();
    assert_eq!(first.cid, second.cid);
    assert_ne!(first.block_hash, second.block_hash);
}

#[tokio::test]
async fn test_sudo_upload_from_sudo_key() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    let opts = opts.with_authorization(AuthorizationMode::Sudo);

    let result = client.upload(b"as root", &opts).await.unwrap();
    assert_eq!(ledger.content(&result.cid).unwrap().as_ref(), b"as root");
    // sudo stores do not spend the signer's quota
    assert_eq!(ledger.authorization(&account("//Alice")).transactions, 100);
}

#[tokio::test]
async fn test_sudo_from_non_sudo_key_fails_dispatch() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    let opts = opts
        .with_account(DEV_PHRASE, "//Bob")
        .with_authorization(AuthorizationMode::Sudo);

    let err = client.upload(b"not root", &opts).await.unwrap_err();
    match err {
        UploadError::Submission { detail, block_hash } => {
            assert_eq!(detail, "Sudo.RequireSudo");
            assert!(block_hash.is_some());
        }
        other => panic!("expected submission error, got {other:?}"),
    }
    assert!(ledger.content(&compute_cid(b"not root")).is_none());
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_direct_upload_without_quota_is_rejected() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    let opts = opts.with_account(DEV_PHRASE, "//Bob");

    let err = client.upload(b"no quota", &opts).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::Submission {
            block_hash: None,
            ..
        }
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_empty_upload_fails_dispatch() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());

    let err = client.upload(b"", &opts).await.unwrap_err();
    match err {
        UploadError::Submission { detail, .. } => {
            assert_eq!(detail, "TransactionStorage.EmptyTransaction")
        }
        other => panic!("expected submission error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_endpoint_never_connects() {
    let (ledger, mut opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    opts.transport_endpoint = String::new();

    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(matches!(err, UploadError::Configuration(_)));
    assert_eq!(ledger.stats().connect_attempts, 0);
}

#[tokio::test]
async fn test_gateway_base_without_slash_never_connects() {
    let (ledger, mut opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    opts.gateway_base_url = opts.gateway_base_url.trim_end_matches('/').to_string();

    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(matches!(err, UploadError::Configuration(_)));
    assert_eq!(ledger.stats().connect_attempts, 0);
}

#[tokio::test]
async fn test_invalid_seed_never_connects() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());

    for seed in ["", "not a real phrase", "wolk bottom drive obey lake curtain smoke basket hold race lonely fit"] {
        let opts = opts.clone().with_account(seed, "//Alice");
        let err = client.upload(b"data", &opts).await.unwrap_err();
        assert!(
            matches!(err, UploadError::InvalidSeed(_)),
            "seed {seed:?} gave {err:?}"
        );
    }
    assert_eq!(ledger.stats().connect_attempts, 0);
}

#[tokio::test]
async fn test_refused_connection_is_retryable() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    ledger.set_failure(FailureMode::RefuseConnections);

    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::Transport(TransportError::Connect { .. })
    ));
    assert!(err.is_retryable());
    assert_eq!(ledger.stats().connects, 0);

    ledger.set_failure(FailureMode::None);
    client.upload(b"data", &opts).await.unwrap();
}

#[tokio::test]
async fn test_connection_lost_before_submit_closes_session() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    ledger.set_failure(FailureMode::DropBeforeSubmit);

    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(ledger.stats().submissions, 0);
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_stream_closed_after_submit_is_not_retryable() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    ledger.set_failure(FailureMode::CloseStream);

    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::Transport(TransportError::StreamClosed)
    ));
    assert!(!err.is_retryable());
    assert_eq!(ledger.stats().submissions, 1);
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_pool_rejection_is_submission_error() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    ledger.set_failure(FailureMode::Reject("priority too low".to_string()));

    let err = client.upload(b"data", &opts).await.unwrap_err();
    match err {
        UploadError::Submission { detail, block_hash } => {
            assert_eq!(detail, "priority too low");
            assert_eq!(block_hash, None);
        }
        other => panic!("expected submission error, got {other:?}"),
    }
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_finality_timeout_closes_session() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    ledger.set_failure(FailureMode::NeverFinalize);
    let opts = opts.with_finality_timeout(Duration::from_millis(100));

    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(matches!(err, UploadError::FinalityTimeout(d) if d == Duration::from_millis(100)));
    assert!(!err.is_retryable());
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_renew_stored_entry() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());

    let stored = client.upload(b"keep me", &opts).await.unwrap();
    let block = stored.block_number.unwrap();
    let index = stored.index.unwrap();

    let renewed = client.renew(block, index, &opts).await.unwrap();
    let entry = ledger
        .entry(renewed.block_number.unwrap(), renewed.index.unwrap())
        .unwrap();
    assert_eq!(entry.cid, stored.cid);

    let err = client.renew(block + 100, 0, &opts).await.unwrap_err();
    assert!(
        matches!(err, UploadError::Submission { ref detail, .. } if detail == "TransactionStorage.RenewedNotFound")
    );
}

#[tokio::test]
async fn test_authorize_account_then_store_directly() {
    let (ledger, opts) = setup_test_env().await;
    let client = BulletinClient::new(ledger.clone());
    let bob = account("//Bob");

    let sudo = opts.clone().with_authorization(AuthorizationMode::Sudo);
    client.authorize_account(bob, 2, 1024, &sudo).await.unwrap();
    assert_eq!(ledger.authorization(&bob).transactions, 2);

    let as_bob = opts.with_account(DEV_PHRASE, "//Bob");
    client.upload(b"from bob", &as_bob).await.unwrap();
    assert_eq!(ledger.authorization(&bob).transactions, 1);
    assert_eq!(ledger.authorization(&bob).bytes, 1024 - 8);
}

#[tokio::test]
async fn test_pool_backpressure() {
    let (ledger, opts) = setup_test_env().await;
    let pool = SessionPool::new(ledger.clone(), 1);
    let client = BulletinClient::new(pool.clone());

    let held = pool.checkout(MEMORY_ENDPOINT).await.unwrap();
    let err = client.upload(b"data", &opts).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::Transport(TransportError::PoolExhausted { capacity: 1 })
    ));
    assert!(err.is_retryable());

    held.close().await.unwrap();
    client.upload(b"data", &opts).await.unwrap();
    client.upload(b"more", &opts).await.unwrap();
    // one underlying connection served all of it
    assert_eq!(ledger.stats().connects, 1);

    pool.drain().await;
    assert_eq!(ledger.stats().open_sessions(), 0);
}

#[tokio::test]
async fn test_ledgers_are_independent() {
    let (ledger, opts) = setup_test_env().await;
    let other = MemoryLedger::new();
    let client = BulletinClient::new(ledger.clone());

    let result = client.upload(b"only here", &opts).await.unwrap();
    assert!(ledger.content(&result.cid).is_some());
    assert!(other.content(&result.cid).is_none());
}
