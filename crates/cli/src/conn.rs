use crate::error::CliError;
use async_trait::async_trait;
use connectors::sql::{mssql::params::MssqlConnParams, mysql::params::MySqlConnParams};
use mysql_async::prelude::*;
use tracing::{error, info};

/// Trait for "pinging" a database
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

pub struct MySqlConnectionPinger {
    pub params: MySqlConnParams,
}

pub struct MssqlConnectionPinger {
    pub params: MssqlConnParams,
}

fn check_ping_result(target: &str, params: &str, val: Option<i32>) -> Result<(), CliError> {
    match val {
        Some(1) => Ok(()),
        Some(other) => {
            let msg = format!("{target} ping to '{params}' returned unexpected result: {other}");
            error!("{}", msg);
            Err(CliError::Unexpected(msg))
        }
        None => {
            let msg = format!("{target} ping to '{params}' returned no result");
            error!("{}", msg);
            Err(CliError::Unexpected(msg))
        }
    }
}

#[async_trait]
impl ConnectionPinger for MySqlConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging MySQL at '{}'", self.params);

        let mut conn = self.params.connect().await.map_err(|e| {
            error!("MySQL connection to '{}' failed: {}", self.params, e);
            CliError::Connect {
                target: "MySQL",
                source: e,
            }
        })?;

        let val: Option<i32> = conn.query_first("SELECT 1").await.map_err(|e| {
            error!("MySQL ping query on '{}' failed: {}", self.params, e);
            CliError::MySql(e)
        })?;
        check_ping_result("MySQL", &self.params.to_string(), val)?;

        info!("MySQL ping to '{}' succeeded", self.params);
        conn.disconnect().await.ok();
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for MssqlConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Pinging SQL Server at '{}'", self.params);

        let mut client = self.params.connect().await.map_err(|e| {
            error!("SQL Server connection to '{}' failed: {}", self.params, e);
            CliError::Connect {
                target: "SQL Server",
                source: e,
            }
        })?;

        let row = client
            .simple_query("SELECT 1")
            .await?
            .into_row()
            .await
            .map_err(|e| {
                error!("SQL Server ping query on '{}' failed: {}", self.params, e);
                CliError::Mssql(e)
            })?;
        let val = row.map(|r| r.try_get::<i32, _>(0)).transpose()?.flatten();
        check_ping_result("SQL Server", &self.params.to_string(), val)?;

        info!("SQL Server ping to '{}' succeeded", self.params);
        client.close().await.ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_is_a_successful_ping() {
        assert!(check_ping_result("MySQL", "wb@db:3306/x", Some(1)).is_ok());
        assert!(matches!(
            check_ping_result("MySQL", "wb@db:3306/x", Some(2)),
            Err(CliError::Unexpected(msg)) if msg.contains("unexpected result: 2")
        ));
        assert!(check_ping_result("SQL Server", "sa@sql:1433/WB", None).is_err());
    }
}
