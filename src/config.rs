use hugye_resolver::Upstream;
use hugye_rules::tree::DomainTree;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};

const DNS_PORT: u16 = 53;

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    /// Rule files of domains that never get forwarded
    #[serde(default)]
    pub blacklist: Vec<PathBuf>,
    /// Rule files of domains exempt from blocking, parsed but not applied
    #[serde(default)]
    pub whitelist: Vec<PathBuf>,
    /// Rule files of domains whose queries get logged
    #[serde(default)]
    pub monitoring: Vec<PathBuf>,
    #[serde(default)]
    pub binding: crate::dns::config::Config,
    #[serde(default = "Config::default_external_dns")]
    pub external_dns: Vec<UpstreamConfig>,
    #[serde(default)]
    pub cache: crate::repository::cache::Config,
}

impl Config {
    fn default_external_dns() -> Vec<UpstreamConfig> {
        vec![UpstreamConfig {
            address: "1.1.1.1".to_string(),
            name: "default".to_string(),
            targets: Vec::new(),
        }]
    }

    pub fn load(path: &Path) -> Self {
        let conf = ::config::Config::builder()
            .add_source(::config::File::from(path).required(true))
            .add_source(::config::Environment::default().separator("_"))
            .build()
            .expect("unable to locate configuration file");
        conf.try_deserialize()
            .expect("configuration format invalid")
    }

    pub fn blocked(&self) -> DomainTree {
        Self::load_rules(&self.blacklist)
    }

    pub fn monitored(&self) -> DomainTree {
        Self::load_rules(&self.monitoring)
    }

    fn load_rules(paths: &[PathBuf]) -> DomainTree {
        let mut tree = DomainTree::default();
        for path in paths {
            match hugye_rules::loader::load_file(path, &mut tree) {
                Ok(count) => tracing::info!("loaded {count} patterns from {path:?}"),
                Err(error) => tracing::error!("unable to load rules from {path:?}: {error}"),
            }
        }
        tree
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct UpstreamConfig {
    /// `ip` or `ip:port`, port 53 assumed when missing
    pub address: String,
    pub name: String,
    /// Domains routed to this upstream; empty marks the default upstream
    #[serde(default)]
    pub targets: Vec<String>,
}

impl UpstreamConfig {
    fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        if self.address.contains(':') {
            self.address.parse()
        } else {
            Ok(SocketAddr::from((
                self.address.parse::<std::net::IpAddr>()?,
                DNS_PORT,
            )))
        }
    }

    pub fn build(&self) -> Result<Upstream, AddrParseError> {
        let upstream = Upstream::new(self.socket_addr()?, self.name.clone());
        if self.targets.is_empty() {
            return Ok(upstream);
        }
        let mut targets = DomainTree::default();
        for pattern in self.targets.iter() {
            if let Err(error) = targets.add(pattern) {
                tracing::warn!("skipping target {pattern:?} of {}: {error}", self.name);
            }
        }
        Ok(upstream.with_targets(targets))
    }
}

#[cfg(test)]
mod tests {
    use super::UpstreamConfig;

    fn upstream(address: &str, targets: &[&str]) -> UpstreamConfig {
        UpstreamConfig {
            address: address.to_string(),
            name: "test".to_string(),
            targets: targets.iter().map(|item| item.to_string()).collect(),
        }
    }

    #[test]
    fn should_assume_dns_port() {
        let config = upstream("8.8.8.8", &[]);
        assert_eq!(
            config.socket_addr().unwrap(),
            "8.8.8.8:53".parse().unwrap()
        );
    }

    #[test]
    fn should_keep_explicit_port() {
        let config = upstream("127.0.0.1:5353", &[]);
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:5353".parse().unwrap()
        );
    }

    #[test]
    fn should_reject_invalid_address() {
        assert!(upstream("not-an-ip", &[]).socket_addr().is_err());
    }

    #[test]
    fn should_deserialize_full_document() {
        let raw = r#"{
            "blacklist": ["/etc/hugye/ads.txt"],
            "binding": { "address": "127.0.0.1", "port": 5300 },
            "external_dns": [
                { "address": "10.0.0.1", "name": "corp", "targets": ["corp.local"] },
                { "address": "1.1.1.1", "name": "default" }
            ],
            "cache": { "ttl": 30000, "size": 100 }
        }"#;
        let conf = ::config::Config::builder()
            .add_source(::config::File::from_str(raw, ::config::FileFormat::Json))
            .build()
            .unwrap();
        let config: super::Config = conf.try_deserialize().unwrap();
        assert_eq!(config.blacklist.len(), 1);
        assert_eq!(config.binding.port, 5300);
        assert_eq!(config.external_dns.len(), 2);
        similar_asserts::assert_eq!(
            config.external_dns[0].targets,
            vec!["corp.local".to_string()]
        );
        assert!(config.external_dns[1].targets.is_empty());
    }
}
