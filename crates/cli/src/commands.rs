use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Copy the MySQL source table into the empty SQL Server table
    Run {
        #[arg(long, help = "Also write the JSON run report to this file")]
        report: Option<PathBuf>,

        #[arg(long, help = "Print the JSON run report to stdout when done")]
        json: bool,
    },
    /// Connect to one of the databases and run `SELECT 1`
    TestConn {
        #[arg(long, value_enum)]
        target: Target,
    },
    /// Print the recognized variables and the resolved configuration, secrets masked
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Mysql,
    Mssql,
}
