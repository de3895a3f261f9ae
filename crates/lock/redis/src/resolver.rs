//! Turns a [`RedisConfig`] into a pool bound to the authoritative Redis
//! endpoint.
//!
//! In discovery mode the Sentinel nodes are asked once for the current
//! master; the pool then talks to that address only. Following a later
//! failover is left to whoever owns the backend.

use deadpool_redis::{Config, Pool, Runtime};
use redis::sentinel::{Sentinel, SentinelNodeConnectionInfo};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use singleton_lock::LockError;

use crate::address::{SentinelEndpoint, StoreAddress, TopologyDescriptor};
use crate::config::{RedisConfig, SentinelCredentials};

/// Resolve the configured address to a connection pool.
pub(crate) async fn resolve(config: &RedisConfig) -> Result<Pool, LockError> {
    let pool_config = match StoreAddress::parse(&config.url)? {
        StoreAddress::Direct(url) => {
            tracing::info!("using direct redis connection");
            Config::from_url(url)
        }
        StoreAddress::Discovery(topology) => {
            let master_name = config.options.master_name().ok_or_else(|| {
                LockError::Configuration(
                    "master_name is required when connecting through sentinel".to_owned(),
                )
            })?;
            let master = discover_master(
                &topology,
                master_name,
                config.options.sentinel_credentials.as_ref(),
            )
            .await?;
            Config::from_connection_info(master)
        }
    };

    build_pool(&pool_config, config)
}

/// Ask the Sentinel nodes, in order, for the address of `master_name`.
async fn discover_master(
    topology: &TopologyDescriptor,
    master_name: &str,
    sentinel_credentials: Option<&SentinelCredentials>,
) -> Result<ConnectionInfo, LockError> {
    let nodes: Vec<ConnectionInfo> = topology
        .endpoints
        .iter()
        .map(|endpoint| sentinel_node_info(endpoint, sentinel_credentials))
        .collect();

    tracing::info!(
        master = %master_name,
        sentinels = nodes.len(),
        "resolving redis master through sentinel"
    );

    let mut sentinel = Sentinel::build(nodes)
        .map_err(|e| LockError::Configuration(format!("invalid sentinel topology: {e}")))?;

    let master_info = master_node_info(topology);

    let client = sentinel
        .async_master_for(master_name, Some(&master_info))
        .await
        .map_err(|e| {
            LockError::Unavailable(format!(
                "no sentinel reported a reachable master for {master_name:?}: {e}"
            ))
        })?;

    let info = client.get_connection_info().clone();
    tracing::info!(master = %master_name, addr = %info.addr, "resolved redis master");
    Ok(info)
}

/// Connection settings for the resolved master: the address credential and
/// nothing from the Sentinel credentials.
fn master_node_info(topology: &TopologyDescriptor) -> SentinelNodeConnectionInfo {
    SentinelNodeConnectionInfo {
        tls_mode: None,
        redis_connection_info: Some(RedisConnectionInfo {
            password: topology.credential.clone(),
            ..RedisConnectionInfo::default()
        }),
    }
}

fn sentinel_node_info(
    endpoint: &SentinelEndpoint,
    credentials: Option<&SentinelCredentials>,
) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(endpoint.host.clone(), endpoint.port),
        redis: RedisConnectionInfo {
            username: credentials.and_then(|c| c.username.clone()),
            password: credentials.and_then(|c| c.password.clone()),
            ..RedisConnectionInfo::default()
        },
    }
}

fn build_pool(pool_config: &Config, config: &RedisConfig) -> Result<Pool, LockError> {
    pool_config
        .builder()
        .map(|b| {
            b.max_size(config.pool_size)
                .wait_timeout(Some(config.connection_timeout))
                .create_timeout(Some(config.connection_timeout))
                .runtime(Runtime::Tokio1)
                .build()
        })
        .map_err(|e| LockError::Configuration(e.to_string()))?
        .map_err(|e| LockError::Configuration(e.to_string()))
}
