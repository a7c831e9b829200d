use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls};

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl PostgresConfig {
    fn connection_str(&self) -> String {
        format!(
            "postgresql://{}:{}@{}",
            self.username, self.password, self.hostname
        )
    }
}

/// Lazily opens a single postgres connection and hands it out to every caller.
/// `setup_sql` runs right after every successful connect.
/// A failed attempt leaves the manager empty so the next call tries again, and
/// a client whose connection has closed is replaced on the next call.
pub struct ConnectionManager {
    config: PostgresConfig,
    setup_sql: &'static str,
    client: RwLock<Option<Arc<Client>>>,
}

impl ConnectionManager {
    pub fn new(config: PostgresConfig, setup_sql: &'static str) -> Self {
        Self {
            config,
            setup_sql,
            client: RwLock::new(None),
        }
    }

    pub async fn connect(&self) -> Result<Arc<Client>, tokio_postgres::Error> {
        if let Some(client) = self.client.read().await.as_ref() {
            if !client.is_closed() {
                return Ok(client.clone());
            }
        }

        let mut held = self.client.write().await;
        match held.as_ref() {
            // another caller reconnected while this one waited for the lock
            Some(client) if !client.is_closed() => return Ok(client.clone()),
            Some(_) => tracing::warn!("Postgres connection closed, reconnecting"),
            None => {}
        }
        *held = None;

        tracing::info!("Connecting to postgres at {}", self.config.hostname);
        let (client, connection) =
            tokio_postgres::connect(&self.config.connection_str(), NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client.batch_execute(self.setup_sql).await?;
        let client = Arc::new(client);
        *held = Some(client.clone());
        Ok(client)
    }

    pub async fn is_connected(&self) -> bool {
        self.client
            .read()
            .await
            .as_ref()
            .is_some_and(|client| !client.is_closed())
    }
}

#[cfg(test)]
mod connection_manager_tests {
    use super::*;

    #[tokio::test]
    async fn failed_connection_is_not_memoized() {
        let manager = ConnectionManager::new(
            PostgresConfig {
                // Nothing listens on port 1
                hostname: "127.0.0.1:1".to_string(),
                username: "postgres".to_string(),
                password: "postgres".to_string(),
            },
            "SELECT 1",
        );

        assert!(manager.connect().await.is_err());
        assert!(!manager.is_connected().await);
        assert!(manager.connect().await.is_err());
    }
}
