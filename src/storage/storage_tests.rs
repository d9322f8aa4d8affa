use super::*;
use crate::identity::Principal;

fn entry(text: &str, who: &str) -> ListItem {
    ListItem { item: text.into(), by: Principal::new(who), at: chrono::Utc::now() }
}

#[tokio::test]
async fn absent_key_reads_as_empty_not_error() {
    let store = InMemoryDocumentStore::new();
    let (doc, exists) = store.read("grocery-list.json").await.unwrap();
    assert!(!exists);
    assert!(doc.items.is_empty());
    assert!(doc.version.is_none());
}

#[tokio::test]
async fn write_and_read_roundtrip() {
    let store = InMemoryDocumentStore::new();
    let items = vec![entry("milk", "alice"), entry("eggs", "bob")];
    let v = store.write_if_version_matches("k", &items, None).await.unwrap();
    let (doc, exists) = store.read("k").await.unwrap();
    assert!(exists);
    assert_eq!(doc.items, items);
    assert_eq!(doc.version.as_ref(), Some(&v));
}

#[tokio::test]
async fn version_changes_on_every_successful_write() {
    let store = InMemoryDocumentStore::new();
    let v1 = store.write_if_version_matches("k", &[entry("milk", "alice")], None).await.unwrap();
    let v2 = store
        .write_if_version_matches("k", &[entry("milk", "alice"), entry("eggs", "bob")], Some(&v1))
        .await
        .unwrap();
    assert_ne!(v1, v2);
}

#[tokio::test]
async fn create_requires_the_key_to_be_absent() {
    let store = InMemoryDocumentStore::new();
    store.write_if_version_matches("k", &[entry("milk", "alice")], None).await.unwrap();
    let err = store
        .write_if_version_matches("k", &[entry("eggs", "bob")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));
}

#[tokio::test]
async fn stale_version_never_wins_and_never_corrupts() {
    let store = InMemoryDocumentStore::new();
    let stale = store.write_if_version_matches("k", &[entry("milk", "alice")], None).await.unwrap();
    // A competing writer moves the document forward.
    let current = store
        .write_if_version_matches("k", &[entry("milk", "alice"), entry("eggs", "bob")], Some(&stale))
        .await
        .unwrap();
    let before = store.raw("k").unwrap();

    let err = store
        .write_if_version_matches("k", &[entry("overwrite", "mallory")], Some(&stale))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));

    // Byte-for-byte unchanged, version unchanged.
    assert_eq!(store.raw("k").unwrap(), before);
    let (doc, _) = store.read("k").await.unwrap();
    assert_eq!(doc.version.as_ref(), Some(&current));
    assert_eq!(doc.items.len(), 2);
}

#[tokio::test]
async fn expecting_a_version_on_an_absent_key_conflicts() {
    let store = InMemoryDocumentStore::new();
    let err = store
        .write_if_version_matches("k", &[entry("milk", "alice")], Some(&DocVersion::new("7")))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));
    assert!(store.raw("k").is_none());
}

#[test]
fn stored_format_is_a_bare_json_array() {
    let bytes = encode_items(&[entry("milk", "alice")]).unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let arr = v.as_array().expect("array");
    assert_eq!(arr[0]["item"], "milk");
    assert_eq!(arr[0]["by"], "alice");
    assert!(arr[0]["at"].is_string());
}

#[test]
fn malformed_stored_bytes_surface_as_malformed() {
    let err = decode_items(b"{not json").unwrap_err();
    assert!(matches!(err, StoreError::Malformed(_)));
}
