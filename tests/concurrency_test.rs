//! Concurrent clients racing on the same keys.
//!
//! All tasks share one store through cloned clients; the store applies each
//! command as a single step, so conditional operations resolve cleanly.

use redis_objects::{Client, ClientConfig, Error};
use std::collections::HashSet;

fn client() -> Client {
    Client::local(ClientConfig::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_renamenx_race_has_one_winner() {
    for round in 0..20 {
        let client = client();
        let dst = format!("winner:{}", round);
        let contenders = 16;

        for i in 0..contenders {
            client
                .get_bucket::<String>(format!("src:{}:{}", round, i))
                .set(&format!("value-{}", i))
                .await
                .unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..contenders {
            let client = client.clone();
            let dst = dst.clone();
            handles.push(tokio::spawn(async move {
                let src = format!("src:{}:{}", round, i);
                (i, client.renamenx(&src, &dst).await.unwrap())
            }));
        }

        let mut winners = Vec::new();
        for handle in handles {
            let (i, won) = handle.await.unwrap();
            if won {
                winners.push(i);
            }
        }
        assert_eq!(winners.len(), 1, "round {}: winners {:?}", round, winners);
        let winner = winners[0];

        let value = client.get_bucket::<String>(dst.as_str()).get().await.unwrap();
        assert_eq!(value, Some(format!("value-{}", winner)));

        for i in 0..contenders {
            let src = client.get_bucket::<String>(format!("src:{}:{}", round, i));
            if i == winner {
                assert!(!src.exists().await.unwrap());
            } else {
                assert_eq!(src.get().await.unwrap(), Some(format!("value-{}", i)));
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_try_set_race_has_one_winner() {
    let client = client();
    let mut handles = Vec::new();
    for i in 0..32u32 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let bucket = client.get_bucket::<u32>("lock");
            (i, bucket.try_set(&i).await.unwrap())
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (i, won) = handle.await.unwrap();
        if won {
            winners.push(i);
        }
    }
    assert_eq!(winners.len(), 1);
    let held = client.get_bucket::<u32>("lock").get().await.unwrap();
    assert_eq!(held, Some(winners[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rename_chain_never_loses_value() {
    let client = client();
    client.get_bucket::<String>("hot").set(&"payload".to_string()).await.unwrap();

    // Every task tries to move the value from "hot" to its own name and back
    let mut handles = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let mine = format!("parked:{}", i);
            for _ in 0..25 {
                match client.rename("hot", &mine).await {
                    Ok(()) => {
                        client.rename(&mine, "hot").await.unwrap();
                    }
                    Err(Error::NotFound(_)) => tokio::task::yield_now().await,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let keys: HashSet<String> = client
        .find_keys("*")
        .unwrap()
        .collect_all()
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(keys, HashSet::from(["hot".to_string()]));
    let value = client.get_bucket::<String>("hot").get().await.unwrap();
    assert_eq!(value.as_deref(), Some("payload"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scan_during_churn_returns_stable_keys_once() {
    let client = client();
    for i in 0..50 {
        client
            .get_bucket::<u32>(format!("stable:{:02}", i))
            .set(&i)
            .await
            .unwrap();
    }

    let churn = {
        let client = client.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                let name = format!("stable:churn:{}", i);
                client.get_bucket::<u32>(name.as_str()).set(&i).await.unwrap();
                client.delete(&[name]).await.unwrap();
            }
        })
    };

    let config = ClientConfig {
        scan_count: 3,
        ..ClientConfig::default()
    };
    let scanner = client.with_config(config);
    let keys = scanner.find_keys("stable:??").unwrap().collect_all().await.unwrap();
    churn.await.unwrap();

    let expected: Vec<String> = (0..50).map(|i| format!("stable:{:02}", i)).collect();
    assert_eq!(keys, expected);
}
