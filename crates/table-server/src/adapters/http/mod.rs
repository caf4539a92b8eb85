mod routes;
mod viewer;

use std::sync::Arc;

use crate::{
    cli::ServeArgs,
    core::connection::ConnectionPool,
    error::{AppError, AppResult},
};

pub use routes::{create_table_router, TableApiState};
pub use viewer::ViewerTemplate;

/// Check the configured table, then serve until the listener fails.
pub async fn run(args: ServeArgs, pool: ConnectionPool) -> AppResult<()> {
    let viewer = ViewerTemplate::load(args.template.as_deref())?;

    // Surface an unopenable database or a missing table as a startup failure.
    let desc = pool.worker(&args.db)?.describe(args.table.clone()).await?;
    tracing::info!(
        db = %args.db.display(),
        table = %desc.name,
        columns = desc.columns.len(),
        rows = desc.total_row_count,
        "table ready"
    );

    let state = TableApiState {
        pool,
        db_path: args.db.clone(),
        viewer: Arc::new(viewer),
    };
    let app = create_table_router(state, &args.static_dir);

    let listener = tokio::net::TcpListener::bind(args.addr).await.map_err(|e| {
        tracing::error!(addr = %args.addr, error = %e, "failed to bind HTTP server");
        AppError::Io(e)
    })?;
    tracing::info!(
        "viewer at http://{}/table_viewer?table_name={}",
        args.addr,
        args.table
    );
    axum::serve(listener, app).await?;
    Ok(())
}
