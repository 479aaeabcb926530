use crate::sql::base::error::DbError;
use std::fmt;
use tiberius::{AuthMethod, Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::info;

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Connection settings for the SQL Server destination.
#[derive(Clone, PartialEq, Eq)]
pub struct MssqlConnParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Accept the server certificate without validating it.
    pub trust_cert: bool,
}

impl MssqlConnParams {
    pub fn config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        config.database(&self.database);
        config.application_name("wb-sync");
        if self.trust_cert {
            config.trust_cert();
        }
        config
    }

    pub async fn connect(&self) -> Result<MssqlClient, DbError> {
        let config = self.config();
        match open(config.clone()).await {
            Ok(client) => Ok(client),
            // Azure SQL may redirect the login to another node.
            Err(DbError::Mssql(tiberius::error::Error::Routing { host, port })) => {
                info!("SQL Server redirected the connection to {}:{}", host, port);
                let mut config = config;
                config.host(&host);
                config.port(port);
                open(config).await
            }
            Err(err) => Err(err),
        }
    }
}

async fn open(config: Config) -> Result<MssqlClient, DbError> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Ok(Client::connect(config, tcp.compat_write()).await?)
}

impl fmt::Debug for MssqlConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MssqlConnParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("trust_cert", &self.trust_cert)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MssqlConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}
