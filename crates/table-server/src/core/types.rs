use serde::{ser::SerializeMap, Serialize, Serializer};

/// Display-relevant storage class of a column, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Other,
}

impl ColumnType {
    pub fn from_decl(decl_type: &str) -> Self {
        let decl = decl_type.trim();
        if decl.eq_ignore_ascii_case("integer") {
            ColumnType::Integer
        } else if decl.eq_ignore_ascii_case("real") {
            ColumnType::Real
        } else {
            ColumnType::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Storage column name, used verbatim in queries.
    pub id: String,
    pub display_name: String,
    /// Declared type exactly as written in the table schema.
    pub decl_type: String,
    pub kind: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(id: impl Into<String>, decl_type: impl Into<String>) -> Self {
        let id = id.into();
        let decl_type = decl_type.into();
        Self {
            display_name: id.clone(),
            kind: ColumnType::from_decl(&decl_type),
            id,
            decl_type,
        }
    }
}

/// Schema and row-count snapshot of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub total_row_count: i64,
}

impl TableDescriptor {
    pub fn column(&self, id: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Accepts `asc` / `desc` in any case; anything else is not a direction.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("asc") {
            Some(SortDirection::Ascending)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(SortDirection::Descending)
        } else {
            None
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub sort_column: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub start_row: i64,
    pub row_limit: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEcho {
    pub start_row: i64,
    pub row_limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub id: String,
    pub field: String,
    pub name: String,
    #[serde(rename = "type")]
    pub decl_type: String,
}

impl From<&ColumnDescriptor> for ColumnInfo {
    fn from(c: &ColumnDescriptor) -> Self {
        Self {
            id: c.id.clone(),
            field: c.id.clone(),
            name: c.display_name.clone(),
            decl_type: c.decl_type.clone(),
        }
    }
}

/// One result row: column id to display string, kept in table column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedRow(pub Vec<(String, Option<String>)>);

impl FormattedRow {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == id)
            .and_then(|(_, v)| v.as_deref())
    }
}

impl Serialize for FormattedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub request: RequestEcho,
    pub column_info: Vec<ColumnInfo>,
    pub total_row_count: i64,
    pub results: Vec<FormattedRow>,
}

pub type RawRow = Vec<rusqlite::types::Value>;
