pub mod base;
pub mod mssql;
pub mod mysql;
