use crate::sql::{
    base::{
        dialect::{Dialect, MySql},
        error::DbError,
        source::{RowCursor, RowSource},
    },
    mysql::{params::MySqlConnParams, row::decode_row},
};
use async_trait::async_trait;
use model::{core::identifiers::TableName, records::row::SourceRow};
use mysql_async::{BinaryProtocol, Conn, QueryResult, prelude::Queryable};
use std::sync::Arc;
use tracing::{debug, info};

/// Reads a whole MySQL table over one connection.
pub struct MySqlRowSource {
    conn: Conn,
    table: TableName,
    dialect: MySql,
}

impl MySqlRowSource {
    pub fn new(conn: Conn, table: TableName) -> Self {
        Self {
            conn,
            table,
            dialect: MySql,
        }
    }

    pub async fn connect(params: &MySqlConnParams, table: TableName) -> Result<Self, DbError> {
        let conn = params.connect().await?;
        info!("Connected to MySQL at {}", params);
        Ok(Self::new(conn, table))
    }

    pub async fn disconnect(self) -> Result<(), DbError> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl RowSource for MySqlRowSource {
    fn table(&self) -> &TableName {
        &self.table
    }

    async fn open<'a>(&'a mut self) -> Result<Box<dyn RowCursor + 'a>, DbError> {
        let sql = self.dialect.select_all(&self.table);
        debug!("Executing source query: {}", sql);

        let result = self.conn.exec_iter(sql, ()).await?;
        let columns: Arc<[String]> = result
            .columns_ref()
            .iter()
            .map(|col| col.name_str().into_owned())
            .collect();

        Ok(Box::new(MySqlCursor { result, columns }))
    }
}

/// Streams rows from a binary-protocol result set without buffering it.
pub struct MySqlCursor<'a> {
    result: QueryResult<'a, 'static, BinaryProtocol>,
    columns: Arc<[String]>,
}

#[async_trait]
impl RowCursor for MySqlCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<SourceRow>, DbError> {
        let Some(row) = self.result.next().await? else {
            return Ok(None);
        };
        let values = decode_row(row, &self.columns)?;
        Ok(Some(SourceRow::new(self.columns.clone(), values)))
    }

    async fn close(self: Box<Self>) -> Result<(), DbError> {
        self.result.drop_result().await?;
        Ok(())
    }
}
