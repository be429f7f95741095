//! Connection pool management for the Orca Security API

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const USER_AGENT: &str = concat!("terraform-provider-orcasecurity/", env!("CARGO_PKG_VERSION"));

pub struct ConnectionPoolConfig {
    pub max_idle_connections: usize,
    pub idle_timeout: Duration,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 10,
            idle_timeout: Duration::from_secs(90),
            connection_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Default)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub last_request: Option<Instant>,
}

pub struct ConnectionPoolManager {
    stats: Arc<RwLock<ConnectionStats>>,
    config: ConnectionPoolConfig,
}

impl ConnectionPoolManager {
    pub fn new(config: ConnectionPoolConfig) -> Self {
        Self {
            stats: Arc::new(RwLock::new(ConnectionStats::default())),
            config,
        }
    }

    pub async fn record_request(&self, success: bool) {
        let mut stats = self.stats.write().await;
        stats.total_requests += 1;
        if !success {
            stats.failed_requests += 1;
        }
        stats.last_request = Some(Instant::now());
    }

    pub async fn get_stats(&self) -> ConnectionStats {
        let stats = self.stats.read().await;
        ConnectionStats {
            total_requests: stats.total_requests,
            failed_requests: stats.failed_requests,
            last_request: stats.last_request,
        }
    }

    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.config.request_timeout)
            .connect_timeout(self.config.connection_timeout)
            .pool_idle_timeout(self.config.idle_timeout)
            .pool_max_idle_per_host(self.config.max_idle_connections);

        if let Some(keepalive) = self.config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stats_track_successes_and_failures() {
        let manager = ConnectionPoolManager::new(ConnectionPoolConfig::default());

        manager.record_request(true).await;
        manager.record_request(true).await;
        manager.record_request(false).await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.failed_requests, 1);
        assert!(stats.last_request.is_some());
    }

    #[test]
    fn builds_client_with_default_config() {
        let manager = ConnectionPoolManager::new(ConnectionPoolConfig::default());
        assert!(manager.build_client().is_ok());
    }
}
