//! Daemon configuration: built-in defaults, then an optional TOML file,
//! then command-line flags and environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context;
use batchgrid_engine::PipelineConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Redb,
}

/// Bus transport, chosen by the scheme of `bus_uri`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusTransport {
    Nats,
    Redis,
}

impl BusTransport {
    pub fn from_uri(uri: &str) -> anyhow::Result<Self> {
        let scheme = uri.split_once("://").map(|(scheme, _)| scheme);
        match scheme {
            Some("nats") | Some("tls") => Ok(BusTransport::Nats),
            Some("redis") | Some("rediss") => Ok(BusTransport::Redis),
            _ => anyhow::bail!("unsupported bus uri {uri}: expected nats:// or redis://"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Message bus URI; `nats://` or `redis://`.
    pub bus_uri: String,
    pub store: StoreBackend,
    /// Redis address for the record store; the scheme is optional.
    pub redis_addr: String,
    /// Directory holding the redb file when `store = "redb"`.
    pub data_dir: PathBuf,
    pub lanes: usize,
    pub lane_capacity: usize,
    pub log_format: LogFormat,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            bus_uri: "nats://localhost:4222".to_string(),
            store: StoreBackend::Redis,
            redis_addr: "localhost:6379".to_string(),
            data_dir: PathBuf::from("/var/lib/batchgrid"),
            lanes: pipeline.lanes,
            lane_capacity: pipeline.lane_capacity,
            log_format: LogFormat::Text,
        }
    }
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bus_uri: Option<String>,
    pub store: Option<StoreBackend>,
    pub redis_addr: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub lanes: Option<usize>,
    pub lane_capacity: Option<usize>,
    pub log_format: Option<LogFormat>,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DaemonConfig =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the effective configuration.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.apply(overrides))
    }

    pub fn apply(mut self, o: Overrides) -> Self {
        if let Some(v) = o.bus_uri {
            self.bus_uri = v;
        }
        if let Some(v) = o.store {
            self.store = v;
        }
        if let Some(v) = o.redis_addr {
            self.redis_addr = v;
        }
        if let Some(v) = o.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = o.lanes {
            self.lanes = v;
        }
        if let Some(v) = o.lane_capacity {
            self.lane_capacity = v;
        }
        if let Some(v) = o.log_format {
            self.log_format = v;
        }
        self
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            lanes: self.lanes,
            lane_capacity: self.lane_capacity,
        }
    }

    pub fn bus_transport(&self) -> anyhow::Result<BusTransport> {
        BusTransport::from_uri(&self.bus_uri)
    }

    pub fn redb_path(&self) -> PathBuf {
        self.data_dir.join("batchgrid.redb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.bus_uri, "nats://localhost:4222");
        assert_eq!(config.bus_transport().unwrap(), BusTransport::Nats);
        assert_eq!(config.store, StoreBackend::Redis);
        assert_eq!(config.lanes, 8);
        assert_eq!(config.lane_capacity, 256);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: DaemonConfig = toml::from_str(
            r#"
store = "redb"
data_dir = "/tmp/bg"
lanes = 2
"#,
        )
        .unwrap();
        assert_eq!(config.store, StoreBackend::Redb);
        assert_eq!(config.redb_path(), PathBuf::from("/tmp/bg/batchgrid.redb"));
        assert_eq!(config.lanes, 2);
        assert_eq!(config.lane_capacity, 256);
        assert_eq!(config.redis_addr, "localhost:6379");
    }

    #[test]
    fn overrides_beat_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bus_uri = \"redis://bus:6379\"\nlanes = 3\nlog_format = \"json\"").unwrap();

        let config = DaemonConfig::load(
            Some(file.path()),
            Overrides {
                lanes: Some(12),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.bus_uri, "redis://bus:6379");
        assert_eq!(config.lanes, 12);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.pipeline().lanes, 12);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DaemonConfig::load(Some(&dir.path().join("absent.toml")), Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn unknown_store_is_rejected() {
        assert!(toml::from_str::<DaemonConfig>("store = \"sqlite\"").is_err());
    }

    #[test]
    fn bus_transport_follows_scheme() {
        assert_eq!(
            BusTransport::from_uri("nats://nats.internal:4222").unwrap(),
            BusTransport::Nats
        );
        assert_eq!(
            BusTransport::from_uri("redis://localhost:6379").unwrap(),
            BusTransport::Redis
        );
        assert!(BusTransport::from_uri("localhost:4222").is_err());
        assert!(BusTransport::from_uri("amqp://broker").is_err());
    }
}
