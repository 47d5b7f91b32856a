use std::collections::BTreeMap;
use std::time::Duration;

/// A function that mutates the in-progress [`RunSpec`] before launch.
///
/// Overrides are applied in the order supplied; a later override may undo an
/// earlier one. No validation is performed on the result, so a spec broken by
/// an override surfaces as a readiness failure after launch.
pub type SpecOverride = Box<dyn FnOnce(&mut RunSpec) + Send>;

/// A function that mutates runtime-level [`HostSettings`], independent of the
/// container spec.
pub type HostOverride = Box<dyn FnOnce(&mut HostSettings) + Send>;

/// The closed set of services this crate can launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Mysql,
    Postgres,
    Memcached,
}

/// Declarative description of the container to launch: image repository,
/// version tag, and environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub tag: String,
    pub env: BTreeMap<String, String>,
}

impl RunSpec {
    /// The hardcoded default spec for a resource kind.
    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Mysql => Self {
                image: "mysql".to_string(),
                tag: "8.0".to_string(),
                env: BTreeMap::from([
                    ("MYSQL_ROOT_PASSWORD".to_string(), "secret".to_string()),
                    ("MYSQL_DATABASE".to_string(), "test".to_string()),
                ]),
            },
            ResourceKind::Postgres => Self {
                image: "postgres".to_string(),
                tag: "13".to_string(),
                env: BTreeMap::from([
                    ("POSTGRES_PASSWORD".to_string(), "secret".to_string()),
                    ("POSTGRES_DB".to_string(), "test".to_string()),
                ]),
            },
            ResourceKind::Memcached => Self {
                image: "memcached".to_string(),
                tag: "1.6".to_string(),
                env: BTreeMap::new(),
            },
        }
    }

    /// Apply each override in list order, mutating the spec in place.
    pub fn apply(&mut self, overrides: Vec<SpecOverride>) {
        for opt in overrides {
            opt(self);
        }
    }

    /// Look up an environment variable on the spec, after overrides.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

/// Replace the image repository name.
pub fn with_image(image: impl Into<String>) -> SpecOverride {
    let image = image.into();
    Box::new(move |spec: &mut RunSpec| spec.image = image)
}

/// Replace the image version tag.
pub fn with_tag(tag: impl Into<String>) -> SpecOverride {
    let tag = tag.into();
    Box::new(move |spec: &mut RunSpec| spec.tag = tag)
}

/// Set (or replace) one environment variable.
pub fn with_env(key: impl Into<String>, value: impl Into<String>) -> SpecOverride {
    let key = key.into();
    let value = value.into();
    Box::new(move |spec: &mut RunSpec| {
        spec.env.insert(key, value);
    })
}

/// Runtime-level container settings applied at launch time, orthogonal to the
/// [`RunSpec`]. Everything here maps onto an option the container runtime
/// exposes for the run request.
#[derive(Debug, Clone, Default)]
pub struct HostSettings {
    pub container_name: Option<String>,
    pub network: Option<String>,
    pub privileged: bool,
    pub startup_timeout: Option<Duration>,
}

impl HostSettings {
    pub(crate) fn from_overrides(overrides: Vec<HostOverride>) -> Self {
        let mut settings = Self::default();
        for opt in overrides {
            opt(&mut settings);
        }
        settings
    }
}

/// Give the container an explicit name instead of a generated one.
pub fn with_container_name(name: impl Into<String>) -> HostOverride {
    let name = name.into();
    Box::new(move |settings: &mut HostSettings| settings.container_name = Some(name))
}

/// Attach the container to a named Docker network.
pub fn with_network(network: impl Into<String>) -> HostOverride {
    let network = network.into();
    Box::new(move |settings: &mut HostSettings| settings.network = Some(network))
}

/// Run the container in privileged mode.
pub fn with_privileged() -> HostOverride {
    Box::new(|settings: &mut HostSettings| settings.privileged = true)
}

/// Override how long the runtime waits for the container to start.
pub fn with_startup_timeout(timeout: Duration) -> HostOverride {
    Box::new(move |settings: &mut HostSettings| settings.startup_timeout = Some(timeout))
}
