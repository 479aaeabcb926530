use crate::sql::{
    base::{
        destination::{BulkChannel, BulkSink},
        dialect::{Dialect, Mssql},
        error::DbError,
    },
    mssql::{
        coercion::coerce,
        metadata::{ColumnPlan, insertable_columns},
        params::{MssqlClient, MssqlConnParams},
    },
};
use async_trait::async_trait;
use model::{
    core::{identifiers::TableName, value::Value},
    records::row::EnrichedRow,
};
use tiberius::{BulkLoadRequest, TokenRow};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;
use tracing::{debug, info, warn};

/// SQL Server table loaded through the TDS bulk-copy protocol inside one
/// explicit transaction.
pub struct MssqlBulkSink {
    client: MssqlClient,
    table: TableName,
    quoted_table: String,
    dialect: Mssql,
    in_transaction: bool,
}

impl MssqlBulkSink {
    pub fn new(client: MssqlClient, table: TableName) -> Self {
        let dialect = Mssql;
        Self {
            client,
            quoted_table: dialect.quote_table(&table),
            table,
            dialect,
            in_transaction: false,
        }
    }

    pub async fn connect(params: &MssqlConnParams, table: TableName) -> Result<Self, DbError> {
        let client = params.connect().await?;
        info!("Connected to SQL Server at {}", params);
        Ok(Self::new(client, table))
    }

    pub async fn close(self) -> Result<(), DbError> {
        if self.in_transaction {
            warn!(
                "Closing SQL Server connection with an open transaction on {}",
                self.table
            );
        }
        self.client.close().await?;
        Ok(())
    }

    async fn batch(&mut self, sql: &str) -> Result<(), DbError> {
        debug!("Executing: {}", sql);
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

#[async_trait]
impl BulkSink for MssqlBulkSink {
    fn table(&self) -> &TableName {
        &self.table
    }

    async fn row_count(&mut self) -> Result<u64, DbError> {
        let sql = self.dialect.count_rows(&self.table);
        let row = self.client.simple_query(sql).await?.into_row().await?;
        let count = match row {
            Some(row) => row.try_get::<i64, _>(0)?.unwrap_or(0),
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    async fn begin(&mut self) -> Result<(), DbError> {
        self.batch("BEGIN TRANSACTION").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn open_channel<'a>(
        &'a mut self,
        columns: &[String],
    ) -> Result<Box<dyn BulkChannel + 'a>, DbError> {
        let dest_columns = insertable_columns(&mut self.client, &self.quoted_table).await?;
        let plan = ColumnPlan::new(dest_columns, columns)?;
        let unfilled: Vec<&str> = plan
            .iter()
            .filter(|(_, src)| src.is_none())
            .map(|(c, _)| c.name.as_str())
            .collect();
        if !unfilled.is_empty() {
            info!(
                "Columns of {} not present in the source will be NULL: {}",
                self.table,
                unfilled.join(", ")
            );
        }

        let request = self.client.bulk_insert(&self.quoted_table).await?;
        debug!(
            "Bulk insert into {} prepared for {} columns",
            self.quoted_table,
            plan.columns().len()
        );

        Ok(Box::new(MssqlBulkChannel {
            request,
            plan,
            sent: 0,
        }))
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.batch("COMMIT TRANSACTION").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await?;
        self.in_transaction = false;
        Ok(())
    }
}

/// One in-flight bulk insert. Rows are coerced to the destination types
/// before they reach the TDS buffer, so a bad row never leaves a partially
/// written record behind.
pub struct MssqlBulkChannel<'a> {
    request: BulkLoadRequest<'a, Compat<TcpStream>>,
    plan: ColumnPlan,
    sent: u64,
}

impl MssqlBulkChannel<'_> {
    fn encode(&self, row: EnrichedRow) -> Result<TokenRow<'static>, DbError> {
        if row.len() != self.plan.width() {
            return Err(DbError::RowShape {
                expected: self.plan.width(),
                actual: row.len(),
            });
        }

        let mut values: Vec<Option<Value>> = row.into_values().into_iter().map(Some).collect();
        let mut token_row = TokenRow::new();
        for (column, source) in self.plan.iter() {
            let value = source
                .and_then(|idx| values[idx].take())
                .unwrap_or(Value::Null);
            token_row.push(coerce(value, column)?);
        }
        Ok(token_row)
    }
}

#[async_trait]
impl BulkChannel for MssqlBulkChannel<'_> {
    async fn send(&mut self, row: EnrichedRow) -> Result<(), DbError> {
        let token_row = self.encode(row)?;
        self.request.send(token_row).await?;
        self.sent += 1;
        Ok(())
    }

    async fn finalize(self: Box<Self>) -> Result<u64, DbError> {
        let sent = self.sent;
        let result = self.request.finalize().await?;
        let loaded = result.total();
        if loaded != sent {
            warn!("Bulk load reported {} rows but {} were sent", loaded, sent);
        }
        Ok(loaded)
    }
}
