use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address the remote-write endpoint listens on
    pub listen: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: String::from("0.0.0.0:9201"),
        }
    }
}

/// Storage backend variant, selected once at startup
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Cloudwatch,
    Cassandra,
}

/// Configuration for the CloudWatch metering backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudWatchConfig {
    /// AWS region; unset falls back to the ambient SDK environment
    pub region: Option<String>,
    /// Namespace attached to every PutMetricData call
    pub namespace: String,
    /// Hard cap on datapoints per PutMetricData call
    pub max_batch_size: usize,
    /// Fixed pause after each full batch, to stay under the API rate ceiling
    #[serde(with = "humantime_serde")]
    pub flush_pause: Duration,
}

impl Default for CloudWatchConfig {
    fn default() -> Self {
        Self {
            region: Some(String::from("us-east-1")),
            namespace: String::from("Prometheus"),
            max_batch_size: 20,
            flush_pause: Duration::from_millis(1000),
        }
    }
}

/// Configuration for the Cassandra columnar backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CassandraConfig {
    /// Contact points for the cluster
    pub nodes: Vec<String>,
    pub keyspace: String,
    pub table: String,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            nodes: vec![String::from("127.0.0.1:9042")],
            keyspace: String::from("metrics"),
            table: String::from("samples"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    pub http: HttpConfig,
    /// Which storage backend receives the ingested samples
    pub backend: BackendKind,
    pub cloudwatch: CloudWatchConfig,
    pub cassandra: CassandraConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            backend: BackendKind::Cloudwatch,
            cloudwatch: CloudWatchConfig::default(),
            cassandra: CassandraConfig::default(),
        }
    }
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file("metricsink.toml"))
            .merge(Env::prefixed("METRICSINK__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("METRICSINK__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upstream_adapter() {
        let config = Configuration::default();

        assert_eq!(config.http.listen, "0.0.0.0:9201");
        assert_eq!(config.backend, BackendKind::Cloudwatch);

        assert_eq!(config.cloudwatch.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.cloudwatch.namespace, "Prometheus");
        assert_eq!(config.cloudwatch.max_batch_size, 20);
        assert_eq!(config.cloudwatch.flush_pause, Duration::from_millis(1000));

        assert_eq!(config.cassandra.nodes, vec!["127.0.0.1:9042"]);
        assert_eq!(config.cassandra.keyspace, "metrics");
        assert_eq!(config.cassandra.table, "samples");
    }

    #[test]
    fn test_configless_operation() {
        figment::Jail::expect_with(|_jail| {
            let config = Configuration::load().expect("defaults should load without any config");
            assert_eq!(config.backend, BackendKind::Cloudwatch);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("METRICSINK__BACKEND", "cassandra");
            jail.set_env("METRICSINK__CASSANDRA__KEYSPACE", "prod_metrics");
            jail.set_env("METRICSINK__CLOUDWATCH__FLUSH_PAUSE", "250ms");

            let config = Configuration::load().expect("env overrides should parse");
            assert_eq!(config.backend, BackendKind::Cassandra);
            assert_eq!(config.cassandra.keyspace, "prod_metrics");
            assert_eq!(config.cloudwatch.flush_pause, Duration::from_millis(250));
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_merge() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "metricsink.toml",
                r#"
                    backend = "cassandra"

                    [http]
                    listen = "127.0.0.1:9999"

                    [cassandra]
                    nodes = ["cass-1:9042", "cass-2:9042"]
                "#,
            )?;

            let config = Configuration::load().expect("config file should merge over defaults");
            assert_eq!(config.backend, BackendKind::Cassandra);
            assert_eq!(config.http.listen, "127.0.0.1:9999");
            assert_eq!(config.cassandra.nodes, vec!["cass-1:9042", "cass-2:9042"]);
            // Sections absent from the file keep their defaults
            assert_eq!(config.cloudwatch.namespace, "Prometheus");
            Ok(())
        });
    }
}
