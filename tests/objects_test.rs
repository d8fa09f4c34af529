//! End-to-end tests for buckets, maps and key operations over a local store.

use futures::StreamExt;
use redis_objects::channel::{FaultConfig, FaultyChannel, LocalChannel};
use redis_objects::{Client, ClientConfig, DistributedObject, Error, ObjectKind};
use std::sync::Arc;
use std::time::Duration;

fn client() -> Client {
    Client::local(ClientConfig::default())
}

// =============================================================================
// Key discovery
// =============================================================================

#[tokio::test]
async fn test_find_keys() {
    let client = client();
    client
        .get_bucket::<String>("test1")
        .set(&"someValue".to_string())
        .await
        .unwrap();
    client.get_map::<i32, i32>("test2").fast_put(&1, &2).await.unwrap();

    let keys = client.find_keys("test?").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["test1", "test2"]);

    let keys = client.find_keys("test").unwrap().collect_all().await.unwrap();
    assert!(keys.is_empty());
}

#[tokio::test]
async fn test_find_keys_is_lazy_and_restartable() {
    let client = client();
    for name in ["a1", "a2", "a3"] {
        client.get_bucket::<u8>(name).set(&1).await.unwrap();
    }

    let mut stream = client.find_keys("a?").unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), "a1");
    drop(stream);

    // A fresh call scans from the start again
    let keys = client.find_keys("a?").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["a1", "a2", "a3"]);
}

#[tokio::test]
async fn test_get_pattern() {
    let client = client();
    for (name, value) in [
        ("test:testGetPattern:one", "1"),
        ("test:testGetPattern:two", "2"),
        ("test:other:three", "3"),
    ] {
        client
            .get_bucket::<String>(name)
            .set(&value.to_string())
            .await
            .unwrap();
    }

    let buckets = client
        .get_buckets::<String>("test:testGetPattern:*")
        .await
        .unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].name(), "test:testGetPattern:one");
    assert_eq!(buckets[0].get().await.unwrap().as_deref(), Some("1"));
    assert_eq!(buckets[1].name(), "test:testGetPattern:two");
    assert_eq!(buckets[1].get().await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_get_buckets_does_not_filter_by_type() {
    let client = client();
    client.get_bucket::<u32>("mixed:a").set(&1).await.unwrap();
    client.get_map::<u32, u32>("mixed:b").fast_put(&1, &1).await.unwrap();

    let buckets = client.get_buckets::<u32>("mixed:*").await.unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(client.key_type("mixed:b").await.unwrap(), Some(ObjectKind::Map));
    assert!(matches!(buckets[1].get().await, Err(Error::WrongType(_))));
}

#[tokio::test]
async fn test_invalid_pattern() {
    let client = client();
    assert!(matches!(
        client.find_keys(""),
        Err(Error::InvalidPattern { .. })
    ));
    assert!(matches!(
        client.get_buckets::<u8>("").await,
        Err(Error::InvalidPattern { .. })
    ));
    // A trailing backslash is an ordinary literal character
    assert!(client.find_keys("trailing\\").is_ok());
}

#[tokio::test]
async fn test_pattern_special_characters_are_literal() {
    let client = client();
    client.get_bucket::<u8>("tag[1]").set(&1).await.unwrap();
    client.get_bucket::<u8>("tag1").set(&1).await.unwrap();
    client.get_bucket::<u8>("what?").set(&1).await.unwrap();
    client.get_bucket::<u8>("whats").set(&1).await.unwrap();

    let keys = client.find_keys("tag[1]").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["tag[1]"]);
    let keys = client.find_keys("what?").unwrap().collect_all().await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"what?".to_string()) && keys.contains(&"whats".to_string()));
}

#[tokio::test]
async fn test_backslash_keys_are_found_by_name() {
    let client = client();
    client.get_bucket::<u8>("dir\\file").set(&1).await.unwrap();
    client.get_bucket::<u8>("dirfile").set(&1).await.unwrap();
    client.get_bucket::<u8>("dir\\").set(&1).await.unwrap();
    client.get_bucket::<u8>("dir").set(&1).await.unwrap();

    let keys = client.find_keys("dir\\file").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["dir\\file"]);
    let keys = client.find_keys("dir\\").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["dir\\"]);
    let keys = client.find_keys("dir\\*").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["dir\\file", "dir\\"]);
}

#[tokio::test]
async fn test_question_mark_matches_multibyte_character() {
    let client = client();
    client.get_bucket::<u8>("café").set(&1).await.unwrap();
    client.get_bucket::<u8>("cafe").set(&1).await.unwrap();
    client.get_bucket::<u8>("cafés").set(&1).await.unwrap();

    let keys = client.find_keys("caf?").unwrap().collect_all().await.unwrap();
    assert_eq!(keys, vec!["café", "cafe"]);
}

// =============================================================================
// Key operations
// =============================================================================

#[tokio::test]
async fn test_mass_delete() {
    let client = client();
    client
        .get_bucket::<String>("test")
        .set(&"someValue".to_string())
        .await
        .unwrap();
    client.get_map::<i32, i32>("map2").fast_put(&1, &2).await.unwrap();

    assert_eq!(client.delete(&["test", "map2"]).await.unwrap(), 2);
    assert_eq!(client.delete(&["test", "map2"]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_counts_partial_success() {
    let client = client();
    client.get_bucket::<u8>("present").set(&1).await.unwrap();
    assert_eq!(
        client.delete(&["present", "absent", "also-absent"]).await.unwrap(),
        1
    );
    assert_eq!(client.delete::<&str>(&[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_renamenx() {
    let client = client();
    let bucket = client.get_bucket::<String>("test");
    bucket.set(&"someValue".to_string()).await.unwrap();
    let bucket2 = client.get_bucket::<String>("test2");
    bucket2.set(&"someValue2".to_string()).await.unwrap();

    assert!(bucket.renamenx("test1").await.unwrap());
    let old = client.get_bucket::<String>("test");
    assert_eq!(old.get().await.unwrap(), None);
    let new = client.get_bucket::<String>("test1");
    assert_eq!(new.get().await.unwrap().as_deref(), Some("someValue"));

    assert!(!new.renamenx("test2").await.unwrap());
    assert_eq!(new.get().await.unwrap().as_deref(), Some("someValue"));
    assert_eq!(bucket2.get().await.unwrap().as_deref(), Some("someValue2"));
}

#[tokio::test]
async fn test_rename() {
    let client = client();
    let bucket = client.get_bucket::<String>("test");
    bucket.set(&"someValue".to_string()).await.unwrap();
    bucket.rename("test1").await.unwrap();

    let old = client.get_bucket::<String>("test");
    assert_eq!(old.get().await.unwrap(), None);
    assert!(!old.exists().await.unwrap());
    let new = client.get_bucket::<String>("test1");
    assert_eq!(new.get().await.unwrap().as_deref(), Some("someValue"));
}

#[tokio::test]
async fn test_rename_overwrites_other_kind() {
    let client = client();
    client.get_map::<u8, u8>("dst").fast_put(&1, &1).await.unwrap();
    client.get_bucket::<u8>("src").set(&7).await.unwrap();

    client.rename("src", "dst").await.unwrap();
    assert_eq!(client.key_type("dst").await.unwrap(), Some(ObjectKind::Bucket));
    assert_eq!(client.get_bucket::<u8>("dst").get().await.unwrap(), Some(7));
    assert!(!client.exists("src").await.unwrap());
}

#[tokio::test]
async fn test_rename_absent_source_is_not_found() {
    let client = client();
    client.get_bucket::<u8>("dst").set(&1).await.unwrap();

    let err = client.rename("ghost", "dst").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(ref name) if name == "ghost"));
    let err = client.renamenx("ghost", "fresh").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    assert_eq!(client.get_bucket::<u8>("dst").get().await.unwrap(), Some(1));
    assert!(!client.exists("fresh").await.unwrap());
}

// =============================================================================
// Buckets and maps
// =============================================================================

#[tokio::test]
async fn test_set_get() {
    let client = client();
    let bucket = client.get_bucket::<String>("test");
    assert_eq!(bucket.get().await.unwrap(), None);
    bucket.set(&"somevalue".to_string()).await.unwrap();
    assert_eq!(bucket.get().await.unwrap().as_deref(), Some("somevalue"));
}

#[tokio::test]
async fn test_set_delete() {
    let client = client();
    let bucket = client.get_bucket::<String>("test");
    bucket.set(&"somevalue".to_string()).await.unwrap();
    assert_eq!(bucket.get().await.unwrap().as_deref(), Some("somevalue"));
    assert!(bucket.delete().await.unwrap());
    assert_eq!(bucket.get().await.unwrap(), None);
    assert!(!bucket.delete().await.unwrap());
}

#[tokio::test]
async fn test_exists() {
    let client = client();
    let bucket = client.get_bucket::<String>("test");
    bucket.set(&"somevalue".to_string()).await.unwrap();
    assert!(bucket.exists().await.unwrap());
    bucket.delete().await.unwrap();
    assert!(!bucket.exists().await.unwrap());
}

#[tokio::test]
async fn test_handles_are_values() {
    let client = client();
    let a = client.get_bucket::<String>("same");
    let b = client.get_bucket::<String>("same");
    assert_eq!(a, b);
    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), client.get_map::<String, String>("same").id());

    a.set(&"from a".to_string()).await.unwrap();
    assert_eq!(b.get().await.unwrap().as_deref(), Some("from a"));
}

#[tokio::test]
async fn test_map_lifecycle() {
    let client = client();
    let map = client.get_map::<String, Vec<u32>>("lists");
    assert!(!map.exists().await.unwrap());
    assert_eq!(map.size().await.unwrap(), 0);

    assert!(map.fast_put(&"a".to_string(), &vec![1, 2]).await.unwrap());
    assert!(map.fast_put(&"b".to_string(), &vec![]).await.unwrap());
    assert_eq!(map.size().await.unwrap(), 2);
    assert_eq!(map.get(&"a".to_string()).await.unwrap(), Some(vec![1, 2]));

    let all = map.read_all_map().await.unwrap();
    assert_eq!(all.len(), 2);

    assert!(map.delete().await.unwrap());
    assert!(map.read_all_map().await.unwrap().is_empty());
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn test_transport_failures_are_surfaced_not_retried() {
    let store = Arc::new(LocalChannel::spawn(Duration::from_secs(1)));
    let lossy = FaultyChannel::new(
        store.clone(),
        FaultConfig {
            drop_request: 0.0,
            lose_response: 1.0,
        },
        3,
    );
    let client = Client::new(lossy, ClientConfig::default());
    let observer = Client::with_channel(store, ClientConfig::default());

    let err = client
        .get_bucket::<u8>("k")
        .set(&1)
        .await
        .unwrap_err();
    match err {
        Error::Transport(e) => assert!(e.may_have_applied()),
        other => panic!("expected transport error, got {:?}", other),
    }
    // The write happened exactly once even though the caller saw a failure
    assert_eq!(observer.get_bucket::<u8>("k").get().await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_timeout_from_config() {
    let config = ClientConfig::from_toml_str("command_timeout_ms = 250").unwrap();
    assert_eq!(config.command_timeout(), Duration::from_millis(250));
    let client = Client::local(config);
    client.get_bucket::<u8>("k").set(&1).await.unwrap();
    assert_eq!(client.config().command_timeout_ms, 250);
}
