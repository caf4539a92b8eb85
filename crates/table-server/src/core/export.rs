use std::path::Path;

use base64::Engine as _;
use rusqlite::{types::Value as SqlValue, Connection};
use serde_json::{json, Map, Value};

use crate::core::{
    paging::get_all_rows,
    types::{RawRow, TableDescriptor},
};
use crate::error::AppResult;

pub const FILE_FORMAT_VERSION: u32 = 1;

/// Write `table` (schema header plus raw rows) to `out_path`. Returns the number of rows written.
pub fn export_table(conn: &Connection, table: &str, out_path: &Path) -> AppResult<usize> {
    let (desc, rows) = get_all_rows(conn, table)?;
    let doc = build_document(&desc, &rows);

    // serde_json's default map is ordered by key, which keeps repeated exports byte-identical.
    let mut buf = serde_json::to_vec_pretty(&doc)?;
    buf.push(b'\n');
    std::fs::write(out_path, buf)?;

    tracing::info!(table, path = %out_path.display(), rows = rows.len(), "exported table");
    Ok(rows.len())
}

pub fn build_document(desc: &TableDescriptor, rows: &[RawRow]) -> Value {
    let mut column_metadata = Map::new();
    for c in &desc.columns {
        let mut entry = Map::new();
        entry.insert("type".into(), Value::from(c.decl_type.clone()));
        if c.display_name != c.id {
            entry.insert("displayName".into(), Value::from(c.display_name.clone()));
        }
        column_metadata.insert(c.id.clone(), Value::Object(entry));
    }
    let columns: Vec<&str> = desc.columns.iter().map(|c| c.id.as_str()).collect();
    let row_data: Vec<Value> = rows
        .iter()
        .map(|r| Value::Array(r.iter().map(raw_to_json).collect()))
        .collect();

    json!([
        {
            "fileFormatVersion": FILE_FORMAT_VERSION,
            "columns": columns,
            "columnMetadata": column_metadata,
            "totalRowCount": desc.total_row_count,
        },
        { "rowData": row_data }
    ])
}

fn raw_to_json(v: &SqlValue) -> Value {
    match v {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(x) => Value::from(*x),
        // JSON has no infinities; keep them distinguishable from NULL.
        SqlValue::Real(x) if !x.is_finite() => json!({
            "$type": "real",
            "value": x.to_string()
        }),
        SqlValue::Real(x) => Value::from(*x),
        SqlValue::Text(t) => Value::from(t.clone()),
        SqlValue::Blob(b) => json!({
            "$type": "blob",
            "base64": base64::engine::general_purpose::STANDARD.encode(b),
            "size": b.len()
        }),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE emp (id integer, name text, salary real, photo blob);
             CREATE TABLE emp_columnInfo (description text);
             INSERT INTO emp_columnInfo VALUES ('id'), ('Full name'), ('Salary (USD)'), ('photo');
             INSERT INTO emp VALUES (1, 'Ann', 50000.5, NULL), (2, 'Bo', 60000, x'0102');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn document_layout() {
        let conn = fixture();
        let (desc, rows) = get_all_rows(&conn, "emp").unwrap();
        let doc = build_document(&desc, &rows);
        assert_eq!(
            doc,
            json!([
                {
                    "fileFormatVersion": 1,
                    "columns": ["id", "name", "salary", "photo"],
                    "columnMetadata": {
                        "id": {"type": "integer"},
                        "name": {"type": "text", "displayName": "Full name"},
                        "salary": {"type": "real", "displayName": "Salary (USD)"},
                        "photo": {"type": "blob"}
                    },
                    "totalRowCount": 2
                },
                {
                    "rowData": [
                        [1, "Ann", 50000.5, null],
                        [2, "Bo", 60000.0, {"$type": "blob", "base64": "AQI=", "size": 2}]
                    ]
                }
            ])
        );
    }

    #[test]
    fn infinite_reals_are_tagged() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE m (x real);
             INSERT INTO m VALUES (9e999), (-9e999), (1.5), (NULL);",
        )
        .unwrap();
        let (desc, rows) = get_all_rows(&conn, "m").unwrap();
        let doc = build_document(&desc, &rows);
        assert_eq!(
            doc[1]["rowData"],
            json!([
                [{"$type": "real", "value": "inf"}],
                [{"$type": "real", "value": "-inf"}],
                [1.5],
                [null]
            ])
        );
    }

    #[test]
    fn output_is_pretty_with_sorted_keys() -> AppResult<()> {
        let tmp = TempDir::new()?;
        let out = tmp.path().join("emp.json");
        let conn = fixture();
        let n = export_table(&conn, "emp", &out)?;
        assert_eq!(n, 2);

        let text = std::fs::read_to_string(&out)?;
        assert!(text.starts_with("[\n  {\n    \"columnMetadata\""));
        let meta = text.find("\"columnMetadata\"").unwrap();
        let cols = text.find("\"columns\"").unwrap();
        let ver = text.find("\"fileFormatVersion\"").unwrap();
        let total = text.find("\"totalRowCount\"").unwrap();
        assert!(meta < cols && cols < ver && ver < total);
        Ok(())
    }

    #[test]
    fn repeated_exports_are_byte_identical() -> AppResult<()> {
        let tmp = TempDir::new()?;
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        let conn = fixture();
        export_table(&conn, "emp", &a)?;
        export_table(&conn, "emp", &b)?;
        assert_eq!(std::fs::read(&a)?, std::fs::read(&b)?);
        Ok(())
    }
}
