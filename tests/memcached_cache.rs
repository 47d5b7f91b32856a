//! End-to-end Memcached fixture tests. These need a running Docker daemon
//! and are gated behind the `container-tests` feature.

#![cfg(feature = "container-tests")]

use anyhow::Result;
use dbfixture::{init_test_logging, prep_memcached, MemcachedCache};
use std::collections::HashMap;

#[tokio::test]
async fn seeds_and_reads_back_values() -> Result<()> {
    init_test_logging();
    let mut cache = MemcachedCache::start().await?;

    let initial_data = HashMap::from([
        ("user:1".to_string(), "Alice".to_string()),
        ("user:2".to_string(), "Bob".to_string()),
    ]);
    prep_memcached(&mut cache, &initial_data).await?;

    assert_eq!(cache.get("user:1").await?.as_deref(), Some("Alice"));
    assert_eq!(cache.get("user:2").await?.as_deref(), Some("Bob"));
    assert_eq!(cache.get("missing-key").await?, None);

    cache.release().await;
    Ok(())
}

#[tokio::test]
async fn values_can_be_overwritten() -> Result<()> {
    init_test_logging();
    let mut cache = MemcachedCache::start().await?;

    cache.set("greeting", "hello").await?;
    cache.set("greeting", "goodbye").await?;
    assert_eq!(cache.get("greeting").await?.as_deref(), Some("goodbye"));

    cache.release().await;
    Ok(())
}
