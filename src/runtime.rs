use anyhow::{Context, Result};
use std::time::Duration;
use testcontainers::{
    core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, GenericImage, ImageExt,
};

use crate::spec::{HostOverride, HostSettings, RunSpec};

// Matches the container runtime's own default.
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// A started container with its externally-reachable endpoint resolved.
#[derive(Debug)]
pub struct RunningContainer {
    pub container: ContainerAsync<GenericImage>,
    pub host: String,
    pub port: u16,
}

/// Launch a container from the finalized spec and resolve the host port
/// mapped to `internal_port`.
///
/// A start failure is fatal. If the runtime assigns no host port, the
/// just-created container is purged before the error is returned.
pub async fn launch(
    spec: &RunSpec,
    internal_port: u16,
    host_overrides: Vec<HostOverride>,
) -> Result<RunningContainer> {
    let settings = HostSettings::from_overrides(host_overrides);

    let image = GenericImage::new(spec.image.clone(), spec.tag.clone())
        .with_exposed_port(internal_port.tcp());

    let mut request = image.with_startup_timeout(
        settings
            .startup_timeout
            .unwrap_or(DEFAULT_STARTUP_TIMEOUT),
    );
    for (key, value) in &spec.env {
        request = request.with_env_var(key.as_str(), value.as_str());
    }
    if let Some(name) = &settings.container_name {
        request = request.with_container_name(name.as_str());
    }
    if let Some(network) = &settings.network {
        request = request.with_network(network.as_str());
    }
    if settings.privileged {
        request = request.with_privileged(true);
    }

    let container = request
        .start()
        .await
        .with_context(|| format!("failed to start {} container", spec.image))?;

    let port = match container.get_host_port_ipv4(internal_port).await {
        Ok(port) => port,
        Err(err) => {
            purge(container).await;
            return Err(err).with_context(|| {
                format!("no host port was assigned for the {} container", spec.image)
            });
        }
    };
    log::info!("{} container is running on host port {port}", spec.image);

    Ok(RunningContainer {
        container,
        host: "127.0.0.1".to_string(),
        port,
    })
}

/// Best-effort container removal; failures are logged, not escalated.
pub async fn purge(container: ContainerAsync<GenericImage>) {
    if let Err(err) = container.rm().await {
        log::warn!("failed to remove container: {err}");
    }
}
