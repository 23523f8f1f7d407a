use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, serde::Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_address")]
    pub address: IpAddr,
    #[serde(default = "Config::default_port")]
    pub port: u16,
    /// Bound of the listener-to-worker queue, queries past it are dropped
    #[serde(default = "Config::default_queue_size")]
    pub queue_size: usize,
    /// How long a query may wait for its upstream answer, in milliseconds
    #[serde(default = "Config::default_job_deadline")]
    pub job_deadline: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
            port: Self::default_port(),
            queue_size: Self::default_queue_size(),
            job_deadline: Self::default_job_deadline(),
        }
    }
}

impl Config {
    fn default_address() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
    }

    fn default_port() -> u16 {
        53
    }

    fn default_queue_size() -> usize {
        20
    }

    fn default_job_deadline() -> u64 {
        5_000
    }
}

impl Config {
    pub fn binding(&self) -> SocketAddr {
        SocketAddr::from((self.address, self.port))
    }

    pub fn job_deadline(&self) -> Duration {
        Duration::from_millis(self.job_deadline)
    }
}
