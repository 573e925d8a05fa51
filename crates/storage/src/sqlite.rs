#![forbid(unsafe_code)]

use crate::query::is_identifier;
use crate::store::merge_shallow;
use crate::{Condition, DurableStore, Query, StoreError, WriteOp};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tf_core::{Candidate, Document, Job, Timeline};

const DB_FILE_NAME: &str = "talentflow.db";
const SCHEMA_VERSION: &str = "v1";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE_NAME))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn, Some(storage_dir))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, storage_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        install_schema(&conn)?;
        let store = Self {
            conn: Mutex::new(conn),
            storage_dir,
        };
        store.ensure_document_indexes::<Job>()?;
        store.ensure_document_indexes::<Candidate>()?;
        store.ensure_document_indexes::<Timeline>()?;
        Ok(store)
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn ensure_document_indexes<D: Document>(&self) -> Result<(), StoreError> {
        self.ensure_indexes(D::COLLECTION, D::INDEXES)
    }

    /// Creates one `(collection, json field)` expression index per field.
    pub fn ensure_indexes(&self, collection: &str, fields: &[&str]) -> Result<(), StoreError> {
        if !is_identifier(collection) {
            return Err(StoreError::InvalidInput("collection must be an identifier"));
        }
        let conn = self.conn.lock();
        for field in fields {
            if !is_identifier(field) {
                return Err(StoreError::InvalidInput("index field must be an identifier"));
            }
            conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{collection}_{field} \
                 ON documents(collection, {expr})",
                expr = json_field_expr(field),
            ))?;
        }
        Ok(())
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          collection TEXT NOT NULL,
          id TEXT NOT NULL,
          body TEXT NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY (collection, id)
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;
    Ok(())
}

fn json_field_expr(field: &str) -> String {
    format!("json_extract(body, '$.{field}')")
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn parse_body(raw: String) -> Result<Value, StoreError> {
    Ok(serde_json::from_str(&raw)?)
}

fn get_tx(tx: &Transaction<'_>, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
    let raw = tx
        .query_row(
            "SELECT body FROM documents WHERE collection=?1 AND id=?2",
            params![collection, id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    raw.map(parse_body).transpose()
}

fn write_tx(
    tx: &Transaction<'_>,
    collection: &str,
    id: &str,
    body: &Value,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO documents(collection, id, body, updated_at_ms) VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(collection, id) DO UPDATE SET body=excluded.body, updated_at_ms=excluded.updated_at_ms",
        params![collection, id, body.to_string(), tf_core::now_ms()],
    )?;
    Ok(())
}

fn update_tx(
    tx: &Transaction<'_>,
    collection: &str,
    id: &str,
    partial: &Value,
) -> Result<bool, StoreError> {
    let Some(mut existing) = get_tx(tx, collection, id)? else {
        return Ok(false);
    };
    merge_shallow(&mut existing, partial)?;
    write_tx(tx, collection, id, &existing)?;
    Ok(true)
}

fn apply_op_tx(tx: &Transaction<'_>, op: &WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Add {
            collection,
            id,
            body,
        } => {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO documents(collection, id, body, updated_at_ms) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![collection, id, body.to_string(), tf_core::now_ms()],
            )?;
            if inserted == 0 {
                return Err(StoreError::AlreadyExists {
                    collection: collection.clone(),
                    id: id.clone(),
                });
            }
        }
        WriteOp::Put {
            collection,
            id,
            body,
        } => write_tx(tx, collection, id, body)?,
        WriteOp::Update {
            collection,
            id,
            partial,
        } => {
            update_tx(tx, collection, id, partial)?;
        }
        WriteOp::Delete { collection, id } => {
            tx.execute(
                "DELETE FROM documents WHERE collection=?1 AND id=?2",
                params![collection, id],
            )?;
        }
    }
    Ok(())
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let body = get_tx(&tx, collection, id)?;
        tx.commit()?;
        Ok(body)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: Value,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let updated = update_tx(&tx, collection, id, &partial)?;
        tx.commit()?;
        Ok(updated)
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(1) FROM documents WHERE collection=?1",
            params![collection],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count).map_err(|_| StoreError::InvalidInput("document count out of range"))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Value>, StoreError> {
        if !is_identifier(&query.field) {
            return Err(StoreError::InvalidInput("query field must be an identifier"));
        }
        let expr = json_field_expr(&query.field);
        let mut bindings = vec![SqlValue::Text(collection.to_string())];
        let mut clauses = vec!["collection=?1".to_string()];
        match &query.condition {
            Condition::Equals(value) => {
                bindings.push(to_sql_value(value));
                clauses.push(format!("{expr} = ?{}", bindings.len()));
            }
            Condition::Between { lower, upper } => {
                clauses.push(format!("{expr} IS NOT NULL"));
                if let Some(lower) = lower {
                    bindings.push(to_sql_value(lower));
                    clauses.push(format!("{expr} >= ?{}", bindings.len()));
                }
                if let Some(upper) = upper {
                    bindings.push(to_sql_value(upper));
                    clauses.push(format!("{expr} <= ?{}", bindings.len()));
                }
            }
        }
        let limit = query
            .limit
            .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        bindings.push(SqlValue::Integer(limit));
        let sql = format!(
            "SELECT body FROM documents WHERE {} ORDER BY {expr} ASC, id ASC LIMIT ?{}",
            clauses.join(" AND "),
            bindings.len(),
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bindings.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(parse_body(row.get::<_, String>(0)?)?);
        }
        Ok(out)
    }

    async fn all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT body FROM documents WHERE collection=?1 ORDER BY id ASC")?;
        let mut rows = stmt.query(params![collection])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(parse_body(row.get::<_, String>(0)?)?);
        }
        Ok(out)
    }

    async fn clear(&self, collection: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM documents WHERE collection=?1",
            params![collection],
        )?;
        Ok(())
    }

    async fn transaction(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for op in &ops {
            apply_op_tx(&tx, op)?;
        }
        tx.commit()?;
        Ok(())
    }
}
