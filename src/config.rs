use crate::transport::{ServiceIds, TransportMode};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProducerConfig {
    pub service: ServiceConfig,
    pub transport: TransportConfig,
    pub lifecycle: LifecycleConfig,
    pub notifier: NotifierConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Service identifier advertised to the registry
    #[serde(default = "default_service_id")]
    pub service_id: u16,

    /// Instance identifier of the single offered instance
    #[serde(default = "default_instance_id")]
    pub instance_id: u16,

    /// Event carrying the vehicle data field
    #[serde(default = "default_event_id")]
    pub event_id: u16,

    /// Eventgroup subscribers join to receive the event
    #[serde(default = "default_eventgroup_id")]
    pub eventgroup_id: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TransportConfig {
    /// Application name reported to the transport
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Reliable (tcp) or unreliable (udp) delivery
    #[serde(default)]
    pub mode: TransportMode,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Number of sleep slices per offered/withdrawn phase
    #[serde(default = "default_phase_ticks")]
    pub phase_ticks: u32,

    /// Length of one sleep slice in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotifierConfig {
    /// Delay between two notifications while offered, in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ShutdownConfig {
    /// Upper bound on waiting for each loop to exit, in milliseconds
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl ServiceConfig {
    pub fn ids(&self) -> ServiceIds {
        ServiceIds {
            service: self.service_id,
            instance: self.instance_id,
            event: self.event_id,
            eventgroup: self.eventgroup_id,
        }
    }
}

impl LifecycleConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Total length of one offered or withdrawn phase
    pub fn phase(&self) -> Duration {
        self.tick() * self.phase_ticks
    }
}

impl NotifierConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ShutdownConfig {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl ProducerConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("producer.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("service.service_id", default_service_id())?
            .set_default("service.instance_id", default_instance_id())?
            .set_default("service.event_id", default_event_id())?
            .set_default("service.eventgroup_id", default_eventgroup_id())?
            .set_default("transport.application_name", default_application_name())?
            .set_default("transport.mode", "udp")?
            .set_default("lifecycle.phase_ticks", default_phase_ticks())?
            .set_default("lifecycle.tick_ms", default_tick_ms() as i64)?
            .set_default("notifier.interval_ms", default_interval_ms() as i64)?
            .set_default("shutdown.join_timeout_ms", default_join_timeout_ms() as i64)?
            // Configuration file is optional
            .add_source(File::with_name(&path_str).required(false))
            // PRODUCER_NOTIFIER__INTERVAL_MS=20 style overrides
            .add_source(
                Environment::with_prefix("PRODUCER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ProducerConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.application_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Transport application_name must not be empty".to_string(),
            ));
        }

        if self.lifecycle.phase_ticks == 0 {
            return Err(ConfigError::Message(
                "Lifecycle phase_ticks must be greater than 0".to_string(),
            ));
        }

        if self.lifecycle.tick_ms == 0 {
            return Err(ConfigError::Message(
                "Lifecycle tick_ms must be greater than 0".to_string(),
            ));
        }

        if self.notifier.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Notifier interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.shutdown.join_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Shutdown join_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                service_id: default_service_id(),
                instance_id: default_instance_id(),
                event_id: default_event_id(),
                eventgroup_id: default_eventgroup_id(),
            },
            transport: TransportConfig {
                application_name: default_application_name(),
                mode: TransportMode::default(),
            },
            lifecycle: LifecycleConfig {
                phase_ticks: default_phase_ticks(),
                tick_ms: default_tick_ms(),
            },
            notifier: NotifierConfig {
                interval_ms: default_interval_ms(),
            },
            shutdown: ShutdownConfig {
                join_timeout_ms: default_join_timeout_ms(),
            },
        }
    }
}

// Default value functions
fn default_service_id() -> u16 {
    0x1234
}
fn default_instance_id() -> u16 {
    0x5678
}
fn default_event_id() -> u16 {
    0x8778
}
fn default_eventgroup_id() -> u16 {
    0x4465
}

fn default_application_name() -> String {
    "vehicle-data-producer".to_string()
}

fn default_phase_ticks() -> u32 {
    10
}
fn default_tick_ms() -> u64 {
    1000
}

fn default_interval_ms() -> u64 {
    10
}

fn default_join_timeout_ms() -> u64 {
    5000
}
