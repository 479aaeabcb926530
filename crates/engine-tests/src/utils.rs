use chrono::{NaiveDate, NaiveDateTime};

/// Source table used by the live tests; recreated before every run.
pub const SOURCE_TABLE: &str = "wb_sync_it_timbang";
/// Destination table used by the live tests; recreated before every run.
pub const DEST_TABLE: &str = "dbo.wb_sync_it_timbang";

pub const MYSQL_SOURCE_DDL: &str = r#"
    CREATE TABLE wb_sync_it_timbang (
        ID INT PRIMARY KEY,
        NO_POL VARCHAR(20) NULL,
        BERAT DECIMAL(10, 2) NULL,
        TANGGAL2 DATETIME NULL
    )"#;

/// `NO_POL` is deliberately narrower than the source so an oversized value is rejected.
pub const MSSQL_DEST_DDL: &str = r#"
    CREATE TABLE dbo.wb_sync_it_timbang (
        ROW_ID BIGINT IDENTITY(1, 1) PRIMARY KEY,
        ID INT NOT NULL,
        NO_POL NVARCHAR(10) NULL,
        BERAT DECIMAL(10, 2) NULL,
        TANGGAL2 DATETIME2(0) NULL,
        TANGGAL_SHIFT DATETIME NULL,
        DATE_SYNC DATETIME2(3) NOT NULL,
        WB_TAG NVARCHAR(50) NOT NULL,
        DELETED BIT NOT NULL
    )"#;

pub const MSSQL_DROP_DEST: &str =
    "IF OBJECT_ID('dbo.wb_sync_it_timbang', 'U') IS NOT NULL DROP TABLE dbo.wb_sync_it_timbang";

/// Seed rows: one per shift bucket, a NULL reading and one plate that does not fit.
pub const MYSQL_SEED: &str = r#"
    INSERT INTO wb_sync_it_timbang (ID, NO_POL, BERAT, TANGGAL2) VALUES
        (1, 'BK1234AA', 1250.50, '2024-03-10 09:15:00'),
        (2, 'BK5678BB', 980.00, '2024-03-10 21:40:00'),
        (3, 'BK9012CC', 1100.25, '2024-03-11 03:05:00'),
        (4, 'BK3456DD', 760.75, NULL),
        (5, 'BK7890EE-OVERSIZED', 500.00, '2024-03-11 08:00:00')"#;

pub fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid timestamp literal")
}

pub fn date_at(y: i32, m: u32, d: u32, secs: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, secs))
        .expect("valid date literal")
}
