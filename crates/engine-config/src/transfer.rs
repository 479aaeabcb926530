use crate::error::ConfigError;
use connectors::sql::{mssql::params::MssqlConnParams, mysql::params::MySqlConnParams};
use model::core::identifiers::TableName;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const MYSQL_HOST: &str = "MYSQL_HOST";
pub const MYSQL_PORT: &str = "MYSQL_PORT";
pub const MYSQL_USER: &str = "MYSQL_USER";
pub const MYSQL_PASS: &str = "MYSQL_PASS";
pub const MYSQL_DB: &str = "MYSQL_DB";
pub const SQLSERVER_HOST: &str = "SQLSERVER_HOST";
pub const SQLSERVER_PORT: &str = "SQLSERVER_PORT";
pub const SQLSERVER_USER: &str = "SQLSERVER_USER";
pub const SQLSERVER_PASS: &str = "SQLSERVER_PASS";
pub const SQLSERVER_DB: &str = "SQLSERVER_DB";
pub const SQLSERVER_TRUST_CERT: &str = "SQLSERVER_TRUST_CERT";
pub const MYSQL_TABLE: &str = "MYSQL_TABLE";
pub const SQLSRV_TABLE: &str = "SQLSRV_TABLE";
pub const SQLSERVER_TABLE: &str = "SQLSERVER_TABLE";
pub const WB_TAG: &str = "WB_TAG";

/// Every variable the transfer reads, in the order they are documented.
pub const RECOGNIZED_VARS: [&str; 15] = [
    MYSQL_HOST,
    MYSQL_PORT,
    MYSQL_USER,
    MYSQL_PASS,
    MYSQL_DB,
    SQLSERVER_HOST,
    SQLSERVER_PORT,
    SQLSERVER_USER,
    SQLSERVER_PASS,
    SQLSERVER_DB,
    SQLSERVER_TRUST_CERT,
    MYSQL_TABLE,
    SQLSRV_TABLE,
    SQLSERVER_TABLE,
    WB_TAG,
];

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MSSQL_PORT: u16 = 1433;
pub const DEFAULT_WB_TAG: &str = "DEFAULT_WB";

const MASK: &str = "********";

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub mysql: MySqlConnParams,
    pub mssql: MssqlConnParams,
    pub source_table: TableName,
    pub destination_table: TableName,
    pub wb_tag: String,
}

impl TransferConfig {
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = Vars(vars);
        let mysql = mysql_params(vars)?;
        let mssql = mssql_params(vars)?;

        let source_table = table(MYSQL_TABLE, lookup.required(MYSQL_TABLE)?)?;
        let destination_raw = lookup
            .get(SQLSRV_TABLE)
            .or_else(|| lookup.get(SQLSERVER_TABLE))
            .ok_or(ConfigError::MissingEither {
                primary: SQLSRV_TABLE,
                fallback: SQLSERVER_TABLE,
            })?;
        let destination_table = table(SQLSRV_TABLE, destination_raw)?;

        let wb_tag = lookup.get(WB_TAG).unwrap_or(DEFAULT_WB_TAG).to_string();

        let config = TransferConfig {
            mysql,
            mssql,
            source_table,
            destination_table,
            wb_tag,
        };
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Serializable view of the configuration with passwords masked.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            mysql: ConnectionSummary {
                host: self.mysql.host.clone(),
                port: self.mysql.port,
                user: self.mysql.user.clone(),
                password: mask(&self.mysql.password),
                database: self.mysql.database.clone(),
                trust_cert: None,
            },
            sqlserver: ConnectionSummary {
                host: self.mssql.host.clone(),
                port: self.mssql.port,
                user: self.mssql.user.clone(),
                password: mask(&self.mssql.password),
                database: self.mssql.database.clone(),
                trust_cert: Some(self.mssql.trust_cert),
            },
            source_table: self.source_table.to_string(),
            destination_table: self.destination_table.to_string(),
            wb_tag: self.wb_tag.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub mysql: ConnectionSummary,
    pub sqlserver: ConnectionSummary,
    pub source_table: String,
    pub destination_table: String,
    pub wb_tag: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectionSummary {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: &'static str,
    pub database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_cert: Option<bool>,
}

/// Resolves only the MySQL connection settings.
pub fn mysql_params(vars: &HashMap<String, String>) -> Result<MySqlConnParams, ConfigError> {
    let vars = Vars(vars);
    let (host, host_port) = split_host_port(MYSQL_HOST, vars.required(MYSQL_HOST)?, &[':'])?;
    let port = match host_port {
        Some(port) => port,
        None => port_or(MYSQL_PORT, vars.get(MYSQL_PORT), DEFAULT_MYSQL_PORT)?,
    };

    Ok(MySqlConnParams {
        host,
        port,
        user: vars.required(MYSQL_USER)?.to_string(),
        password: vars.secret(MYSQL_PASS),
        database: vars.required(MYSQL_DB)?.to_string(),
    })
}

/// Resolves only the SQL Server connection settings.
pub fn mssql_params(vars: &HashMap<String, String>) -> Result<MssqlConnParams, ConfigError> {
    let vars = Vars(vars);
    let (host, host_port) =
        split_host_port(SQLSERVER_HOST, vars.required(SQLSERVER_HOST)?, &[':', ','])?;
    let port = match host_port {
        Some(port) => port,
        None => port_or(SQLSERVER_PORT, vars.get(SQLSERVER_PORT), DEFAULT_MSSQL_PORT)?,
    };
    let trust_cert = match vars.get(SQLSERVER_TRUST_CERT) {
        Some(raw) => parse_flag(SQLSERVER_TRUST_CERT, raw)?,
        None => true,
    };

    Ok(MssqlConnParams {
        host,
        port,
        user: vars.required(SQLSERVER_USER)?.to_string(),
        password: vars.secret(SQLSERVER_PASS),
        database: vars.required(SQLSERVER_DB)?.to_string(),
        trust_cert,
    })
}

struct Vars<'a>(&'a HashMap<String, String>);

impl<'a> Vars<'a> {
    /// Trimmed value, `None` when unset or blank.
    fn get(&self, name: &str) -> Option<&'a str> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<&'a str, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    /// Passwords are taken verbatim and may be empty.
    fn secret(&self, name: &str) -> String {
        self.0.get(name).cloned().unwrap_or_default()
    }
}

fn mask(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { MASK }
}

/// Splits `host:port` (or `host,port` where allowed) into its parts.
fn split_host_port(
    var: &'static str,
    raw: &str,
    separators: &[char],
) -> Result<(String, Option<u16>), ConfigError> {
    let Some(pos) = raw.rfind(separators) else {
        return Ok((raw.to_string(), None));
    };

    let (host, port) = (raw[..pos].trim(), raw[pos + 1..].trim());
    if host.is_empty() {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("'{raw}' has no host part"),
        });
    }
    let port = parse_port(var, port)?;
    Ok((host.to_string(), Some(port)))
}

fn port_or(var: &'static str, raw: Option<&str>, default: u16) -> Result<u16, ConfigError> {
    raw.map_or(Ok(default), |raw| parse_port(var, raw))
}

fn parse_port(var: &'static str, raw: &str) -> Result<u16, ConfigError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("'{raw}' is not a valid port"),
        }),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}

fn table(var: &'static str, raw: &str) -> Result<TableName, ConfigError> {
    raw.parse()
        .map_err(|source| ConfigError::Table { var, source })
}
