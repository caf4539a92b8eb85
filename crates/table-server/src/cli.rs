use std::{net::SocketAddr, path::PathBuf};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "table-server", version, about = "Paged, sortable, read-only HTTP access to a SQLite table")]
pub struct Args {
    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// SQLite busy timeout applied to every pooled connection.
    #[arg(long, default_value_t = 2_000, global = true)]
    pub busy_timeout_ms: u64,

    /// Database worker threads per database file.
    #[arg(long, default_value_t = 4, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the table data and viewer endpoints over HTTP.
    Serve(ServeArgs),
    /// Dump a whole table, with its schema metadata, to a JSON file.
    Export(ExportArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// SQLite database file.
    #[arg(long)]
    pub db: PathBuf,

    /// Table checked at startup; any table in the database can be requested afterwards.
    #[arg(long)]
    pub table: String,

    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Root directory for static assets.
    #[arg(long, default_value = ".")]
    pub static_dir: PathBuf,

    /// Viewer page template; `{{ table_name }}` is replaced with the requested table.
    #[arg(long)]
    pub template: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    #[arg(long)]
    pub db: PathBuf,

    #[arg(long)]
    pub table: String,

    /// Output file.
    #[arg(long)]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_defaults() {
        let args = Args::parse_from(["table-server", "serve", "--db", "a.db", "--table", "t"]);
        assert_eq!(args.workers, 4);
        assert_eq!(args.busy_timeout_ms, 2_000);
        let Command::Serve(serve) = args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.table, "t");
        assert_eq!(serve.addr.port(), 8080);
        assert_eq!(serve.static_dir, PathBuf::from("."));
        assert!(serve.template.is_none());
    }

    #[test]
    fn rejects_zero_workers() {
        let res = Args::try_parse_from([
            "table-server",
            "--workers",
            "0",
            "export",
            "--db",
            "a.db",
            "--table",
            "t",
            "--out",
            "t.json",
        ]);
        assert!(res.is_err());
    }
}
