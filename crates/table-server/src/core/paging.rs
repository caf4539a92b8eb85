use rusqlite::{params, Connection};

use crate::core::{
    format::format_cell,
    limits::coerce_bounds,
    schema::{describe_table, quote_ident},
    types::{ColumnInfo, FormattedRow, PageRequest, PageResponse, RawRow, TableDescriptor},
};
use crate::error::AppResult;

/// Fetch one formatted page of `table`.
///
/// The sort is applied only when the column belongs to the table and a
/// direction was given; any other combination silently falls back to
/// storage order. Rows beyond the end of the table are simply absent.
pub fn get_page(conn: &Connection, table: &str, req: &PageRequest) -> AppResult<PageResponse> {
    let desc = describe_table(conn, table)?;
    let bounds = coerce_bounds(req.start_row, req.row_limit);

    let mut sql = select_columns(&desc);
    if let (Some(col), Some(dir)) = (req.sort_column.as_deref(), req.sort_direction) {
        if desc.column(col).is_some() {
            sql.push_str(&format!(" ORDER BY {} {}", quote_ident(col), dir.as_sql()));
        }
    }
    sql.push_str(" LIMIT ?1 OFFSET ?2");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![bounds.row_limit, bounds.start_row])?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(desc.columns.len());
        for (i, col) in desc.columns.iter().enumerate() {
            cells.push((col.id.clone(), format_cell(col.kind, row.get_ref(i)?)));
        }
        results.push(FormattedRow(cells));
    }

    Ok(PageResponse {
        request: bounds,
        column_info: desc.columns.iter().map(ColumnInfo::from).collect(),
        total_row_count: desc.total_row_count,
        results,
    })
}

/// Every row of `table` in storage order, unformatted.
pub fn get_all_rows(conn: &Connection, table: &str) -> AppResult<(TableDescriptor, Vec<RawRow>)> {
    let desc = describe_table(conn, table)?;
    let mut stmt = conn.prepare(&select_columns(&desc))?;
    let width = desc.columns.len();
    let rows = stmt
        .query_map([], |row| {
            (0..width).map(|i| row.get(i)).collect::<Result<RawRow, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok((desc, rows))
}

/// Select exactly the described columns, in descriptor order, so cells can be read by position.
fn select_columns(desc: &TableDescriptor) -> String {
    let cols: Vec<String> = desc.columns.iter().map(|c| quote_ident(&c.id)).collect();
    format!("SELECT {} FROM {}", cols.join(", "), quote_ident(&desc.name))
}
