mod adapters;
mod cli;
mod core;
mod error;
mod logging;

use clap::Parser;

use crate::{
    cli::{Args, Command},
    core::connection::ConnectionPool,
    error::{AppError, AppResult},
};

fn main() -> AppResult<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let pool = ConnectionPool::new(usize::from(args.workers), args.busy_timeout_ms);

    match args.command {
        Command::Serve(serve) => {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| AppError::Internal(e.to_string()))?;
            rt.block_on(adapters::http::run(serve, pool))
        }
        Command::Export(export) => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| AppError::Internal(e.to_string()))?;
            rt.block_on(async move {
                pool.worker(&export.db)?
                    .export(export.table, export.out)
                    .await
                    .map(|_| ())
            })
        }
    }
}
