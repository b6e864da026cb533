use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;

use super::*;

type Seen = Arc<Mutex<Vec<(&'static str, Record)>>>;

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn insert_event(new: serde_json::Value) -> ChangeEvent {
    ChangeEvent::from_records("INSERT", None, Some(record(new))).unwrap()
}

/// Handler that appends `(label, record)` to `seen`.
fn recording(label: &'static str, seen: &Seen) -> impl RecordHandler + 'static {
    let seen = Arc::clone(seen);
    move |record: Record| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().await.push((label, record));
            Ok::<(), BoxError>(())
        }
    }
}

async fn dispatcher_with_all(seen: &Seen) -> ChangeEventDispatcher {
    let dispatcher = ChangeEventDispatcher::new();
    dispatcher.on_insert(recording("insert", seen)).await;
    dispatcher.on_modify(recording("modify", seen)).await;
    dispatcher.on_remove(recording("remove", seen)).await;
    dispatcher
}

#[tokio::test]
async fn test_insert_routes_only_to_insert_handler() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    dispatcher.dispatch(insert_event(json!({"x": 1}))).await.unwrap();

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "insert");
    assert_eq!(seen[0].1, record(json!({"x": 1})));
}

#[tokio::test]
async fn test_modify_routes_merged_record_to_modify_handler() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let event = ChangeEvent::from_records(
        "MODIFY",
        Some(record(json!({"a": 1, "b": 2}))),
        Some(record(json!({"b": 3, "c": 4}))),
    )
    .unwrap();
    dispatcher.dispatch(event).await.unwrap();

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "modify");
    assert_eq!(seen[0].1, record(json!({"a": 1, "b": 3, "c": 4})));
}

#[tokio::test]
async fn test_remove_routes_old_image_to_remove_handler() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let event =
        ChangeEvent::from_records("REMOVE", Some(record(json!({"id": "gone"}))), None).unwrap();
    dispatcher.dispatch(event).await.unwrap();

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "remove");
    assert_eq!(seen[0].1, record(json!({"id": "gone"})));
}

#[tokio::test]
async fn test_unknown_kind_fails_without_invoking_handlers() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let event = ChangeEvent::from_records("UPSERT", None, Some(record(json!({"x": 1})))).unwrap();
    let err = dispatcher.dispatch(event).await.unwrap_err();

    assert!(matches!(err, DispatchError::UnexpectedEventKind(ref k) if k == "UPSERT"));
    assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn test_unregistered_kind_is_noop_success() {
    let dispatcher = ChangeEventDispatcher::new();

    assert!(!dispatcher.is_registered(EventKind::Insert).await);
    dispatcher.dispatch(insert_event(json!({"x": 1}))).await.unwrap();
}

#[tokio::test]
async fn test_later_registration_replaces_earlier() {
    let seen: Seen = Arc::default();
    let dispatcher = ChangeEventDispatcher::new();

    dispatcher.on_insert(recording("first", &seen)).await;
    dispatcher.on_insert(recording("second", &seen)).await;

    dispatcher.dispatch(insert_event(json!({"n": 1}))).await.unwrap();
    dispatcher.dispatch(insert_event(json!({"n": 2}))).await.unwrap();

    let seen = seen.lock().await;
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|(label, _)| *label == "second"));
}

#[tokio::test]
async fn test_unregister_restores_noop() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    dispatcher.unregister(EventKind::Insert).await;
    dispatcher.dispatch(insert_event(json!({"x": 1}))).await.unwrap();

    assert!(!dispatcher.is_registered(EventKind::Insert).await);
    assert!(dispatcher.is_registered(EventKind::Modify).await);
    assert!(seen.lock().await.is_empty());
}

#[derive(Debug, thiserror::Error)]
#[error("handler exploded")]
struct Exploded;

#[tokio::test]
async fn test_handler_error_propagates_unchanged() {
    let dispatcher = ChangeEventDispatcher::new();
    dispatcher
        .on_insert(|_record: Record| async { Err::<(), BoxError>(Box::new(Exploded)) })
        .await;

    let err = dispatcher
        .dispatch(insert_event(json!({"x": 1})))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "handler exploded");
    match err {
        DispatchError::Handler(inner) => assert!(inner.downcast_ref::<Exploded>().is_some()),
        other => panic!("expected handler error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_images_fails_before_handler() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let event = ChangeEvent::from_records("INSERT", None, None).unwrap();
    let err = dispatcher.dispatch(event).await.unwrap_err();

    assert!(matches!(err, DispatchError::MissingImages));
    assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn test_process_batch_dispatches_in_order() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let batch = StreamEvent {
        records: vec![
            insert_event(json!({"n": 1})),
            ChangeEvent::from_records("REMOVE", Some(record(json!({"n": 0}))), None).unwrap(),
        ],
    };

    assert_eq!(dispatcher.process_batch(batch).await.unwrap(), 2);

    let labels: Vec<_> = seen.lock().await.iter().map(|(l, _)| *l).collect();
    assert_eq!(labels, vec!["insert", "remove"]);
}

#[tokio::test]
async fn test_process_batch_stops_at_first_failure() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let batch = StreamEvent {
        records: vec![
            insert_event(json!({"n": 1})),
            ChangeEvent::from_records("TTL", None, Some(record(json!({"n": 2})))).unwrap(),
            insert_event(json!({"n": 3})),
        ],
    };

    let err = dispatcher.process_batch(batch).await.unwrap_err();
    assert!(matches!(err, DispatchError::UnexpectedEventKind(_)));
    assert_eq!(seen.lock().await.len(), 1);
}

/// Event as it arrives on the stream, with a `yr` number that does not parse.
fn malformed_event(event_name: &str) -> ChangeEvent {
    serde_json::from_value(json!({
        "eventName": event_name,
        "dynamodb": {"NewImage": {"id": {"S": "a"}, "yr": {"N": "abc"}}}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_unknown_kind_checked_before_image_decode() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let err = dispatcher.dispatch(malformed_event("TTL")).await.unwrap_err();

    assert!(matches!(err, DispatchError::UnexpectedEventKind(ref k) if k == "TTL"));
    assert!(seen.lock().await.is_empty());
}

#[tokio::test]
async fn test_malformed_image_fails_with_decode_error() {
    let seen: Seen = Arc::default();
    let dispatcher = dispatcher_with_all(&seen).await;

    let err = dispatcher.dispatch(malformed_event("INSERT")).await.unwrap_err();

    assert!(matches!(err, DispatchError::Decode(_)));
    assert!(seen.lock().await.is_empty());
}
