//! End-to-end scenarios over the full engine with in-memory adapters.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;

use overlay_engine::adapters::MemoryStorage;
use overlay_engine::{
    AdmittanceInstructions, EngineConfig, FormulaEntry, HistorySelector, LookupAnswer,
    LookupQuestion, LookupResolution, OverlayApi, OverlayEngine,
};
use overlay_primitives::{Beef, Transaction};

use crate::fixtures::*;

fn engine_for(
    storage: Arc<MemoryStorage>,
    topic: &str,
    steps: Vec<AdmittanceInstructions>,
    log: Arc<EventLog>,
) -> OverlayEngine {
    OverlayEngine::builder(storage, Arc::new(AcceptAllTracker))
        .with_topic_manager(topic, QueueManager::new(steps))
        .with_lookup_service("ls_log", log)
        .with_config(EngineConfig::default())
        .build()
}

fn decode_subject(beef: &[u8]) -> Transaction {
    Beef::from_binary(beef)
        .expect("stored envelopes decode")
        .subject()
        .expect("stored envelopes have a subject")
}

// =========================================================================
// S1 — SINGLE-TOPIC ADMIT
// =========================================================================

#[tokio::test]
async fn test_single_topic_admission() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![admit(&[0], &[])],
        log.clone(),
    );

    let tx_a = proven_tx(1, &[0x51]);
    let steak = engine
        .submit(tagged(&tx_a, &["tm_widgets"]), None)
        .await
        .unwrap();
    assert_eq!(steak["tm_widgets"], admit(&[0], &[]));

    let output = stored_output(&storage, tx_a.txid(), 0, "tm_widgets")
        .await
        .unwrap();
    assert!(!output.spent);
    assert!(output.consumed_by.is_empty());
    assert!(output.outputs_consumed.is_empty());

    assert_eq!(
        log.drain(),
        vec![GraphEvent::Added(
            outpoint_of(&tx_a, 0),
            "tm_widgets".to_string()
        )]
    );
}

// =========================================================================
// S2 — SPEND + STALE PRUNE
// =========================================================================

#[tokio::test]
async fn test_spend_and_stale_prune_event_order() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![admit(&[0], &[]), admit(&[0], &[])],
        log.clone(),
    );

    let tx_a = proven_tx(1, &[0x51]);
    let tx_b = spend_embedding(&[(&tx_a, 0)], &[0x52]);

    engine
        .submit(tagged(&tx_a, &["tm_widgets"]), None)
        .await
        .unwrap();
    log.drain();
    engine
        .submit(tagged(&tx_b, &["tm_widgets"]), None)
        .await
        .unwrap();

    assert!(stored_output(&storage, tx_a.txid(), 0, "tm_widgets")
        .await
        .is_none());

    let a0 = outpoint_of(&tx_a, 0);
    let b0 = outpoint_of(&tx_b, 0);
    assert_eq!(
        log.drain(),
        vec![
            GraphEvent::Spent(a0, "tm_widgets".to_string()),
            GraphEvent::Added(b0, "tm_widgets".to_string()),
            GraphEvent::Deleted(a0, "tm_widgets".to_string()),
        ]
    );
}

// =========================================================================
// S3 — SPEND + RETAIN
// =========================================================================

#[tokio::test]
async fn test_spend_and_retain() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![admit(&[0], &[]), admit(&[0], &[0])],
        log.clone(),
    );

    let tx_a = proven_tx(1, &[0x51]);
    let tx_b = spend_embedding(&[(&tx_a, 0)], &[0x52]);

    engine
        .submit(tagged(&tx_a, &["tm_widgets"]), None)
        .await
        .unwrap();
    engine
        .submit(tagged(&tx_b, &["tm_widgets"]), None)
        .await
        .unwrap();

    let ancestor = stored_output(&storage, tx_a.txid(), 0, "tm_widgets")
        .await
        .unwrap();
    assert!(ancestor.spent);
    assert_eq!(
        ancestor.consumed_by,
        BTreeSet::from([outpoint_of(&tx_b, 0)])
    );

    let descendant = stored_output(&storage, tx_b.txid(), 0, "tm_widgets")
        .await
        .unwrap();
    assert_eq!(descendant.outputs_consumed, vec![outpoint_of(&tx_a, 0)]);
}

// =========================================================================
// S4 — DUPLICATE SUBMISSION
// =========================================================================

#[tokio::test]
async fn test_duplicate_submission() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![admit(&[0], &[]), admit(&[0], &[])],
        log.clone(),
    );

    let tx_a = proven_tx(1, &[0x51]);
    let submission = tagged(&tx_a, &["tm_widgets"]);

    engine.submit(submission.clone(), None).await.unwrap();
    let before = stored_output(&storage, tx_a.txid(), 0, "tm_widgets").await;
    log.drain();

    let steak = engine.submit(submission, None).await.unwrap();
    assert_eq!(steak["tm_widgets"], AdmittanceInstructions::default());
    assert!(log.drain().is_empty());
    assert_eq!(
        stored_output(&storage, tx_a.txid(), 0, "tm_widgets").await,
        before
    );
}

// =========================================================================
// S5 — HISTORY DEPTH
// =========================================================================

/// Chain: tx_a (proven) <- tx_b (proven, references but does not embed
/// tx_a) <- tx_c (embeds tx_b only). The stored envelopes therefore carry
/// exactly one level of ancestry, so the selector bound is observable.
async fn three_link_chain() -> (Arc<MemoryStorage>, Arc<EventLog>, OverlayEngine, [Transaction; 3])
{
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![
            admit(&[0], &[]),
            admit(&[0], &[0]),
            admit(&[0], &[0]),
        ],
        log.clone(),
    );

    let tx_a = proven_tx(1, &[0x51]);
    let tx_b = with_proof(spend_referencing(&[(&tx_a, 0)], &[0x52]), 850_000);
    let tx_c = spend_embedding(&[(&tx_b, 0)], &[0x53]);

    engine
        .submit(tagged(&tx_a, &["tm_widgets"]), None)
        .await
        .unwrap();
    engine
        .submit(tagged(&tx_b, &["tm_widgets"]), None)
        .await
        .unwrap();
    engine
        .submit(tagged(&tx_c, &["tm_widgets"]), None)
        .await
        .unwrap();

    (storage, log, engine, [tx_a, tx_b, tx_c])
}

#[tokio::test]
async fn test_history_depth_zero_embeds_one_level() {
    let (_storage, log, engine, [_tx_a, tx_b, tx_c]) = three_link_chain().await;

    log.set_resolution(LookupResolution::Formula(vec![FormulaEntry {
        outpoint: outpoint_of(&tx_c, 0),
        history: HistorySelector::Depth(0),
    }]));
    let answer = engine
        .lookup(&LookupQuestion {
            service: "ls_log".to_string(),
            query: json!({}),
        })
        .await
        .unwrap();

    let LookupAnswer::OutputList { outputs } = answer else {
        panic!("expected an output list");
    };
    let subject = decode_subject(&outputs[0].beef);
    assert_eq!(subject.txid(), tx_c.txid());

    let embedded_b = subject.inputs[0].source_transaction.as_ref().unwrap();
    assert_eq!(embedded_b.txid(), tx_b.txid());
    // Depth 0 stops before the chain root.
    assert!(embedded_b.inputs[0].source_transaction.is_none());
}

#[tokio::test]
async fn test_history_depth_one_embeds_two_levels() {
    let (_storage, log, engine, [tx_a, tx_b, tx_c]) = three_link_chain().await;

    log.set_resolution(LookupResolution::Formula(vec![FormulaEntry {
        outpoint: outpoint_of(&tx_c, 0),
        history: HistorySelector::Depth(1),
    }]));
    let answer = engine
        .lookup(&LookupQuestion {
            service: "ls_log".to_string(),
            query: json!({}),
        })
        .await
        .unwrap();

    let LookupAnswer::OutputList { outputs } = answer else {
        panic!("expected an output list");
    };
    // The whole chain is now in one envelope.
    let beef = Beef::from_binary(&outputs[0].beef).unwrap();
    assert_eq!(beef.txs.len(), 3);

    let subject = decode_subject(&outputs[0].beef);
    let embedded_b = subject.inputs[0].source_transaction.as_ref().unwrap();
    assert_eq!(embedded_b.txid(), tx_b.txid());
    let embedded_a = embedded_b.inputs[0].source_transaction.as_ref().unwrap();
    assert_eq!(embedded_a.txid(), tx_a.txid());
}

#[tokio::test]
async fn test_history_selector_none_returns_stored_envelope() {
    let (storage, log, engine, [_tx_a, _tx_b, tx_c]) = three_link_chain().await;

    log.set_resolution(LookupResolution::Formula(vec![FormulaEntry {
        outpoint: outpoint_of(&tx_c, 0),
        history: HistorySelector::None,
    }]));
    let answer = engine
        .lookup(&LookupQuestion {
            service: "ls_log".to_string(),
            query: json!({}),
        })
        .await
        .unwrap();

    let LookupAnswer::OutputList { outputs } = answer else {
        panic!("expected an output list");
    };
    let stored = stored_output(&storage, tx_c.txid(), 0, "tm_widgets")
        .await
        .unwrap();
    assert_eq!(outputs[0].beef, stored.beef);
}

// =========================================================================
// S6 — PROOF BACK-FILL
// =========================================================================

#[tokio::test]
async fn test_proof_backfill_updates_descendant_envelope() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![admit(&[0], &[]), admit(&[0], &[0])],
        log,
    );

    let tx_a = proven_tx(1, &[0x51]);
    let tx_b = spend_embedding(&[(&tx_a, 0)], &[0x52]);
    engine
        .submit(tagged(&tx_a, &["tm_widgets"]), None)
        .await
        .unwrap();
    engine
        .submit(tagged(&tx_b, &["tm_widgets"]), None)
        .await
        .unwrap();

    let fresh = proof_at(900_123, &tx_a);
    engine
        .handle_new_merkle_proof(&tx_a.txid(), &fresh)
        .await
        .unwrap();

    let descendant = stored_output(&storage, tx_b.txid(), 0, "tm_widgets")
        .await
        .unwrap();
    let subject = decode_subject(&descendant.beef);
    let embedded = subject.inputs[0].source_transaction.as_ref().unwrap();
    assert_eq!(embedded.merkle_path, Some(fresh));
}

#[tokio::test]
async fn test_proof_backfill_spans_topics() {
    let storage = Arc::new(MemoryStorage::new());
    let engine = OverlayEngine::builder(storage.clone(), Arc::new(AcceptAllTracker))
        .with_topic_manager("tm_alpha", QueueManager::new(vec![admit(&[0], &[])]))
        .with_topic_manager("tm_beta", QueueManager::new(vec![admit(&[0], &[])]))
        .build();

    let tx_a = proven_tx(1, &[0x51]);
    engine
        .submit(tagged(&tx_a, &["tm_alpha", "tm_beta"]), None)
        .await
        .unwrap();

    let fresh = proof_at(900_321, &tx_a);
    engine
        .handle_new_merkle_proof(&tx_a.txid(), &fresh)
        .await
        .unwrap();

    for topic in ["tm_alpha", "tm_beta"] {
        let output = stored_output(&storage, tx_a.txid(), 0, topic).await.unwrap();
        let subject = decode_subject(&output.beef);
        assert_eq!(subject.merkle_path, Some(fresh.clone()));
    }
}

// =========================================================================
// DEEP PRUNE CASCADE
// =========================================================================

#[tokio::test]
async fn test_stale_prune_cascades_through_unreferenced_ancestors() {
    let storage = Arc::new(MemoryStorage::new());
    let log = EventLog::new();
    let engine = engine_for(
        storage.clone(),
        "tm_widgets",
        vec![
            admit(&[0], &[]),
            admit(&[0], &[0]),
            // tx_c keeps nothing: tx_b goes stale, and with it tx_a.
            admit(&[0], &[]),
        ],
        log,
    );

    let tx_a = proven_tx(1, &[0x51]);
    let tx_b = spend_embedding(&[(&tx_a, 0)], &[0x52]);
    let tx_c = spend_embedding(&[(&tx_b, 0)], &[0x53]);

    for tx in [&tx_a, &tx_b, &tx_c] {
        engine
            .submit(tagged(tx, &["tm_widgets"]), None)
            .await
            .unwrap();
    }

    assert!(stored_output(&storage, tx_a.txid(), 0, "tm_widgets")
        .await
        .is_none());
    assert!(stored_output(&storage, tx_b.txid(), 0, "tm_widgets")
        .await
        .is_none());
    let survivor = stored_output(&storage, tx_c.txid(), 0, "tm_widgets")
        .await
        .unwrap();
    assert!(survivor.outputs_consumed.is_empty());
    assert_eq!(storage.output_count(), 1);
}
