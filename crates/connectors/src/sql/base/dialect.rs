use model::core::identifiers::TableName;

pub trait Dialect {
    /// Quotes an identifier for use in a SQL statement.
    ///
    /// - MySQL uses backticks: `` `my_column` ``
    /// - SQL Server uses brackets: `[my_column]`
    fn quote_identifier(&self, ident: &str) -> String;

    fn quote_table(&self, table: &TableName) -> String {
        table
            .parts()
            .iter()
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn select_all(&self, table: &TableName) -> String {
        format!("SELECT * FROM {}", self.quote_table(table))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Mssql;

impl Mssql {
    pub fn count_rows(&self, table: &TableName) -> String {
        format!("SELECT COUNT_BIG(*) FROM {}", self.quote_table(table))
    }
}

impl Dialect for Mssql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_per_dialect() {
        let table: TableName = "dbo.timbang".parse().unwrap();
        assert_eq!(MySql.select_all(&table), "SELECT * FROM `dbo`.`timbang`");
        assert_eq!(Mssql.count_rows(&table), "SELECT COUNT_BIG(*) FROM [dbo].[timbang]");
        assert_eq!(Mssql.quote_identifier("a]b"), "[a]]b]");
        assert_eq!(MySql.quote_identifier("a`b"), "`a``b`");
    }
}
