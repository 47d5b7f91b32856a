use anyhow::{anyhow, Context, Result};
use async_memcached::{AsciiProtocol, Client};
use std::collections::HashMap;
use std::time::Duration;
use testcontainers::{ContainerAsync, GenericImage};
use tokio::time::sleep;

use crate::readiness::wait_ready;
use crate::runtime::{launch, purge};
use crate::spec::{HostOverride, ResourceKind, RunSpec, SpecOverride};

const MEMCACHED_PORT: u16 = 11211;
const READY_BUDGET: Duration = Duration::from_secs(60);

// The readiness probe round-trips this key and leaves it behind; the
// container only ever serves a single test.
const PROBE_KEY: &str = "test_connection";
const PROBE_VALUE: &str = "test_value";

/// An ephemeral Memcached server with a connected client.
pub struct MemcachedCache {
    client: Client,
    address: String,
    container: ContainerAsync<GenericImage>,
}

impl MemcachedCache {
    /// Start a Memcached container with the default spec (image `memcached`,
    /// tag `1.6`).
    pub async fn start() -> Result<Self> {
        Self::start_with_options(Vec::new(), Vec::new()).await
    }

    /// Start a Memcached container, applying spec overrides in order before
    /// launch and host overrides at launch time.
    pub async fn start_with_options(
        spec_overrides: Vec<SpecOverride>,
        host_overrides: Vec<HostOverride>,
    ) -> Result<Self> {
        let mut spec = RunSpec::for_kind(ResourceKind::Memcached);
        spec.apply(spec_overrides);

        let running = launch(&spec, MEMCACHED_PORT, host_overrides).await?;
        let address = format!("tcp://{}:{}", running.host, running.port);

        let dial_address = address.clone();
        let ready = wait_ready(
            READY_BUDGET,
            move || {
                let address = dial_address.clone();
                async move {
                    Client::new(address.as_str())
                        .await
                        .map_err(|err| anyhow!("failed to dial memcached: {err}"))
                }
            },
            |mut client| async move {
                client
                    .set(PROBE_KEY, PROBE_VALUE, None, None)
                    .await
                    .map_err(|err| anyhow!("memcached set probe failed: {err}"))?;
                // Give the daemon a moment to store the value before reading
                // it back.
                sleep(Duration::from_millis(100)).await;
                client
                    .get(PROBE_KEY)
                    .await
                    .map_err(|err| anyhow!("memcached get probe failed: {err}"))?;
                Ok(client)
            },
        )
        .await;

        let client = match ready {
            Ok(client) => client,
            Err(err) => {
                purge(running.container).await;
                return Err(err).context("failed to connect to memcached");
            }
        };

        Ok(Self {
            client,
            address,
            container: running.container,
        })
    }

    /// The `tcp://` address the fixture is connected to.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }

    /// Fetch a key as a UTF-8 string. A miss is `Ok(None)`.
    pub async fn get(&mut self, key: &str) -> Result<Option<String>> {
        let value = self
            .client
            .get(key)
            .await
            .map_err(|err| anyhow!("failed to get key '{key}': {err}"))?;
        match value {
            Some(value) => {
                let data = String::from_utf8(value.data.unwrap_or_default())
                    .with_context(|| format!("value for key '{key}' is not valid utf-8"))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Store a key with no expiry.
    pub async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.client
            .set(key, value, None, None)
            .await
            .map_err(|err| anyhow!("failed to set key '{key}': {err}"))
    }

    /// Drop the client and remove the container.
    pub async fn release(self) {
        drop(self.client);
        purge(self.container).await;
    }
}

impl std::fmt::Debug for MemcachedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedCache")
            .field("address", &self.address)
            .finish()
    }
}

/// Store each key/value pair from `initial_data` in the cache, aborting on
/// the first failure.
pub async fn prep_memcached(
    cache: &mut MemcachedCache,
    initial_data: &HashMap<String, String>,
) -> Result<()> {
    for (key, value) in initial_data {
        cache.set(key, value).await?;
    }
    Ok(())
}
