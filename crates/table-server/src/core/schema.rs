use rusqlite::{Connection, OptionalExtension, Row};

use crate::core::types::{ColumnDescriptor, TableDescriptor};
use crate::error::{AppError, AppResult};

/// Suffix of the optional sidecar table holding one description per column.
pub const COLUMN_INFO_SUFFIX: &str = "_columnInfo";

/// Read column names, declared types, display names and the row count of `table`.
///
/// Only columns listed by `PRAGMA table_info` are described; hidden and
/// generated columns are left out, so queries must select by these ids.
pub fn describe_table(conn: &Connection, table: &str) -> AppResult<TableDescriptor> {
    if !table_exists(conn, table)? {
        return Err(AppError::TableNotFound(table.to_string()));
    }

    let mut columns = list_columns(conn, table)?;
    apply_display_names(conn, table, &mut columns)?;

    let total_row_count: i64 = conn.query_row(
        &format!("SELECT count(*) FROM {}", quote_ident(table)),
        [],
        |r| r.get(0),
    )?;

    Ok(TableDescriptor {
        name: table.to_string(),
        columns,
        total_row_count,
    })
}

pub fn table_exists(conn: &Connection, table: &str) -> AppResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn list_columns(conn: &Connection, table: &str) -> AppResult<Vec<ColumnDescriptor>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let cols = stmt
        .query_map([], |row: &Row<'_>| {
            let name: String = row.get("name")?;
            // SQLite reports some declared types upper-cased; keep one spelling on the wire.
            let decl_type: Option<String> = row.get("type")?;
            Ok(ColumnDescriptor::new(
                name,
                decl_type.unwrap_or_default().to_ascii_lowercase(),
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

/// Pair companion descriptions with columns by position. Columns without a
/// (non-null) description keep their id as display name; surplus rows are ignored.
fn apply_display_names(
    conn: &Connection,
    table: &str,
    columns: &mut [ColumnDescriptor],
) -> AppResult<()> {
    let info_table = format!("{table}{COLUMN_INFO_SUFFIX}");
    if !table_exists(conn, &info_table)? {
        return Ok(());
    }

    let sql = format!("SELECT description FROM {}", quote_ident(&info_table));
    let mut stmt = conn.prepare(&sql)?;
    let descriptions = stmt
        .query_map([], |r| r.get::<_, Option<String>>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    if descriptions.len() != columns.len() {
        tracing::warn!(
            table,
            columns = columns.len(),
            descriptions = descriptions.len(),
            "column info row count does not match column count"
        );
    }

    for (col, desc) in columns.iter_mut().zip(descriptions) {
        if let Some(desc) = desc {
            col.display_name = desc;
        }
    }
    Ok(())
}

/// Quote an identifier for embedding in SQL.
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn_with(sql: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql).unwrap();
        conn
    }

    #[test]
    fn describes_columns_in_storage_order() {
        let conn = conn_with(
            "CREATE TABLE emp (id integer, name text, salary real);
             INSERT INTO emp VALUES (1, 'Ann', 50000.5), (2, 'Bo', 60000);",
        );
        let d = describe_table(&conn, "emp").unwrap();
        let ids: Vec<_> = d.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["id", "name", "salary"]);
        let types: Vec<_> = d.columns.iter().map(|c| c.decl_type.as_str()).collect();
        assert_eq!(types, ["integer", "text", "real"]);
        assert_eq!(d.total_row_count, 2);
    }

    #[test]
    fn display_names_default_to_ids_without_companion() {
        let conn = conn_with("CREATE TABLE t (a integer, b text);");
        let d = describe_table(&conn, "t").unwrap();
        assert!(d.columns.iter().all(|c| c.display_name == c.id));
        assert_eq!(d.total_row_count, 0);
    }

    #[test]
    fn companion_table_supplies_display_names() {
        let conn = conn_with(
            "CREATE TABLE t (a integer, b text);
             CREATE TABLE t_columnInfo (description text);
             INSERT INTO t_columnInfo VALUES ('Alpha'), ('Beta');",
        );
        let d = describe_table(&conn, "t").unwrap();
        assert_eq!(d.column("a").unwrap().display_name, "Alpha");
        assert_eq!(d.column("b").unwrap().display_name, "Beta");
    }

    #[test]
    fn short_companion_falls_back_for_unmatched_columns() {
        let conn = conn_with(
            "CREATE TABLE t (a integer, b text, c real);
             CREATE TABLE t_columnInfo (description text);
             INSERT INTO t_columnInfo VALUES ('Alpha'), (NULL);",
        );
        let d = describe_table(&conn, "t").unwrap();
        let names: Vec<_> = d.columns.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, ["Alpha", "b", "c"]);
    }

    #[test]
    fn long_companion_is_truncated() {
        let conn = conn_with(
            "CREATE TABLE t (a integer);
             CREATE TABLE t_columnInfo (description text);
             INSERT INTO t_columnInfo VALUES ('Alpha'), ('Extra');",
        );
        let d = describe_table(&conn, "t").unwrap();
        assert_eq!(d.columns.len(), 1);
        assert_eq!(d.columns[0].display_name, "Alpha");
    }

    #[test]
    fn declared_types_are_lower_cased() {
        let conn = conn_with("CREATE TABLE t (a INTEGER, b Real, c VARCHAR(20), d);");
        let d = describe_table(&conn, "t").unwrap();
        let types: Vec<_> = d.columns.iter().map(|c| c.decl_type.as_str()).collect();
        assert_eq!(types, ["integer", "real", "varchar(20)", ""]);
    }

    #[test]
    fn table_names_resolve_case_insensitively() {
        let conn = conn_with(
            "CREATE TABLE Emp (id integer, name text);
             CREATE TABLE EMP_COLUMNINFO (description text);
             INSERT INTO Emp VALUES (1, 'Ann');
             INSERT INTO EMP_COLUMNINFO VALUES ('Id'), ('Name');",
        );
        let d = describe_table(&conn, "emp").unwrap();
        assert_eq!(d.total_row_count, 1);
        let names: Vec<_> = d.columns.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, ["Id", "Name"]);
    }

    #[test]
    fn generated_columns_are_not_described() {
        let conn = conn_with(
            "CREATE TABLE g (a integer, b integer GENERATED ALWAYS AS (a * 1000) VIRTUAL, c text);",
        );
        let d = describe_table(&conn, "g").unwrap();
        let ids: Vec<_> = d.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn missing_table_is_not_found() {
        let conn = conn_with("CREATE TABLE t (a integer);");
        let err = describe_table(&conn, "nope").unwrap_err();
        assert!(matches!(err, AppError::TableNotFound(ref t) if t == "nope"));
    }

    #[test]
    fn quoted_identifiers_survive_odd_names() {
        let conn = conn_with(r#"CREATE TABLE "odd ""name""" ("my col" integer);"#);
        let d = describe_table(&conn, r#"odd "name""#).unwrap();
        assert_eq!(d.columns[0].id, "my col");
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
    }
}
