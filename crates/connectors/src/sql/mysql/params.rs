use crate::sql::base::error::DbError;
use mysql_async::{Conn, Opts, OptsBuilder};
use std::fmt;

/// Connection settings for the MySQL source.
#[derive(Clone, PartialEq, Eq)]
pub struct MySqlConnParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl MySqlConnParams {
    pub fn opts(&self) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
            .into()
    }

    /// Opens a single dedicated connection.
    pub async fn connect(&self) -> Result<Conn, DbError> {
        Ok(Conn::new(self.opts()).await?)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for MySqlConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MySqlConnParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}
