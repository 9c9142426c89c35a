use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use plaza_types::record::Record;

use crate::error::StoreError;
use crate::query::{Direction, Query};
use crate::schema::{self, Collection, Column, ColumnType};
use crate::{Store, migrations};

/// Reference store: SQLite behind a mutex, with blocking work pushed onto
/// the tokio blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self::from_connection(conn)?;
        info!("store opened at {}", path.display());
        Ok(store)
    }

    /// Private in-memory database; used by tests and throwaway setups.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&conn)
        })
        .await?
    }
}

impl Store for SqliteStore {
    async fn list(&self, collection: Collection, query: Query) -> Result<Vec<Record>, StoreError> {
        let (sql, params) = build_select(collection, &query)?;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params_from_iter(params), |row| {
                    row_to_record(collection, row)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }

    async fn create(&self, collection: Collection, fields: Record) -> Result<Record, StoreError> {
        let record = schema::new_record(collection, fields)?;
        let (sql, params) = build_insert(collection, &record)?;
        self.with_conn(move |conn| {
            conn.execute(&sql, params_from_iter(params))?;
            Ok(record)
        })
        .await
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Record,
    ) -> Result<Record, StoreError> {
        schema::check_patch(collection, &fields)?;

        let mut sets: Vec<String> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();
        for (key, value) in &fields {
            let column = schema::check_field(collection, key)?;
            params.push(bind_value(collection, column, value)?);
            sets.push(format!("{} = ?{}", key, params.len()));
        }
        if collection.has_updated_at() && !fields.contains_key("updated_at") {
            params.push(SqlValue::Text(schema::timestamp_now()));
            sets.push(format!("updated_at = ?{}", params.len()));
        }

        let update_sql = if sets.is_empty() {
            None
        } else {
            params.push(SqlValue::Text(id.to_string()));
            Some(format!(
                "UPDATE {} SET {} WHERE id = ?{}",
                collection.table(),
                sets.join(", "),
                params.len()
            ))
        };
        let select_sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            column_list(collection),
            collection.table()
        );

        self.with_conn(move |conn| {
            if let Some(sql) = update_sql {
                let affected = conn.execute(&sql, params_from_iter(params))?;
                if affected == 0 {
                    return Err(StoreError::NotFound { collection, id });
                }
            }
            let mut stmt = conn.prepare(&select_sql)?;
            match stmt.query_row([id.to_string()], |row| row_to_record(collection, row)) {
                Ok(record) => Ok(record),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    Err(StoreError::NotFound { collection, id })
                }
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", collection.table());
        self.with_conn(move |conn| {
            let affected = conn.execute(&sql, [id.to_string()])?;
            if affected == 0 {
                return Err(StoreError::NotFound { collection, id });
            }
            Ok(())
        })
        .await
    }
}

fn column_list(collection: Collection) -> String {
    collection
        .columns()
        .iter()
        .map(|column| column.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_select(
    collection: Collection,
    query: &Query,
) -> Result<(String, Vec<SqlValue>), StoreError> {
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(collection),
        collection.table()
    );
    let mut params: Vec<SqlValue> = Vec::new();

    if !query.filters.is_empty() {
        let mut clauses = Vec::new();
        for (field, value) in &query.filters {
            let column = schema::check_field(collection, field)?;
            params.push(bind_value(collection, column, value)?);
            clauses.push(format!("{} = ?{}", column.name, params.len()));
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    if let Some((field, direction)) = &query.order {
        let column = schema::check_field(collection, field)?;
        let keyword = match direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {} {}", column.name, keyword));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok((sql, params))
}

fn build_insert(
    collection: Collection,
    record: &Record,
) -> Result<(String, Vec<SqlValue>), StoreError> {
    let mut names = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Vec::new();
    for column in collection.columns() {
        let value = record.get(column.name).unwrap_or(&Value::Null);
        params.push(bind_value(collection, column, value)?);
        names.push(column.name);
        placeholders.push(format!("?{}", params.len()));
    }
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        collection.table(),
        names.join(", "),
        placeholders.join(", ")
    );
    Ok((sql, params))
}

fn bind_value(
    collection: Collection,
    column: &Column,
    value: &Value,
) -> Result<SqlValue, StoreError> {
    schema::check_value(collection, column, value)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => SqlValue::Real(number.as_f64().unwrap_or_default()),
        // check_value rejects arrays and objects
        _ => SqlValue::Null,
    })
}

fn row_to_record(collection: Collection, row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (index, column) in collection.columns().iter().enumerate() {
        let value = match row.get_ref(index)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(number) => match column.ty {
                ColumnType::Bool => Value::Bool(number != 0),
                _ => Value::from(number),
            },
            ValueRef::Real(number) => Value::from(number),
            ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(rusqlite::Error::Utf8Error)?;
                Value::String(text.to_string())
            }
            ValueRef::Blob(_) => Value::Null,
        };
        record.insert(column.name.to_string(), value);
    }
    Ok(record)
}
