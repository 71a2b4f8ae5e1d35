use std::sync::Mutex;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, ToSql};
use time::OffsetDateTime;

use super::{CredentialStore, TodoStore};
use crate::error::AppError;
use crate::id::TodoId;
use crate::merge::merge;
use crate::models::{Credential, NewTodo, Status, Todo, TodoPatch};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status INTEGER NOT NULL DEFAULT 0 CHECK (status IN (0, 1)),
        due_date INTEGER
    );

    CREATE TABLE IF NOT EXISTS credentials (
        id INTEGER PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL
    );
";

const SELECT_TODO: &str = "SELECT id, name, description, status, due_date FROM todos";

/// SQLite-backed store. Values are always bound positionally.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, AppError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        Status::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

fn to_unix(when: Option<OffsetDateTime>) -> Option<i64> {
    when.map(OffsetDateTime::unix_timestamp)
}

fn todo_from_row(row: &Row) -> rusqlite::Result<Todo> {
    let id = TodoId::new(row.get(0)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
    let due_date = row
        .get::<_, Option<i64>>(4)?
        .map(OffsetDateTime::from_unix_timestamp)
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Integer, Box::new(e)))?;

    Ok(Todo {
        id,
        name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        due_date,
    })
}

fn credential_from_row(row: &Row) -> rusqlite::Result<Credential> {
    Ok(Credential {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn get_todo_internal(conn: &Connection, id: TodoId) -> Result<Option<Todo>, AppError> {
    let mut stmt = conn.prepare(&format!("{SELECT_TODO} WHERE id = ?1"))?;
    Ok(stmt.query_row([id.get()], todo_from_row).optional()?)
}

fn find_credential_internal(
    conn: &Connection,
    username: &str,
) -> Result<Option<Credential>, AppError> {
    let mut stmt =
        conn.prepare("SELECT id, username, password_hash FROM credentials WHERE username = ?1")?;
    Ok(stmt.query_row([username], credential_from_row).optional()?)
}

impl TodoStore for SqliteStore {
    fn list(&self) -> Result<Vec<Todo>, AppError> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_TODO} ORDER BY id ASC"))?;
        let todos = stmt
            .query_map([], todo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    fn get(&self, id: TodoId) -> Result<Todo, AppError> {
        let conn = self.conn.lock()?;
        get_todo_internal(&conn, id)?.ok_or(AppError::NotFound)
    }

    fn insert(&self, todo: NewTodo) -> Result<Todo, AppError> {
        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO todos (name, description, status, due_date) VALUES (?1, ?2, ?3, ?4)",
            (
                &todo.name,
                &todo.description,
                todo.status,
                to_unix(todo.due_date),
            ),
        )?;
        let id = TodoId::new(conn.last_insert_rowid())?;

        get_todo_internal(&conn, id)?.ok_or(AppError::NotFound)
    }

    fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, AppError> {
        let conn = self.conn.lock()?;
        let existing = get_todo_internal(&conn, id)?.ok_or(AppError::NotFound)?;

        if patch.is_empty() {
            return Ok(existing);
        }

        let merged = merge(existing, patch);
        conn.execute(
            "UPDATE todos SET name = ?1, description = ?2, status = ?3, due_date = ?4 WHERE id = ?5",
            (
                &merged.name,
                &merged.description,
                merged.status,
                to_unix(merged.due_date),
                id.get(),
            ),
        )?;

        get_todo_internal(&conn, id)?.ok_or(AppError::NotFound)
    }

    fn delete(&self, id: TodoId) -> Result<(), AppError> {
        let conn = self.conn.lock()?;
        let rows = conn.execute("DELETE FROM todos WHERE id = ?1", [id.get()])?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

impl CredentialStore for SqliteStore {
    fn insert_credential(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Credential, AppError> {
        let conn = self.conn.lock()?;
        if find_credential_internal(&conn, username)?.is_some() {
            return Err(AppError::Conflict("Username already exists"));
        }

        match conn.execute(
            "INSERT INTO credentials (username, password_hash) VALUES (?1, ?2)",
            (username, password_hash),
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(AppError::Conflict("Username already exists"));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Credential {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    fn find_credential(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let conn = self.conn.lock()?;
        find_credential_internal(&conn, username)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn groceries() -> NewTodo {
        NewTodo {
            name: "Groceries".to_string(),
            description: "eggs, milk".to_string(),
            status: Status::Pending,
            due_date: Some(datetime!(2026-10-20 09:00 UTC)),
        }
    }

    fn id(raw: i64) -> TodoId {
        TodoId::new(raw).unwrap()
    }

    #[test]
    fn insert_update_delete_scenario() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store.insert(groceries()).unwrap();
        assert_eq!(created.id, id(1));
        assert_eq!(created.due_date, Some(datetime!(2026-10-20 09:00 UTC)));

        let updated = store
            .update(
                id(1),
                TodoPatch {
                    status: Some(Status::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, Status::Completed);
        assert_eq!(updated.name, "Groceries");
        assert_eq!(updated.description, "eggs, milk");
        assert_eq!(updated.due_date, created.due_date);

        store.delete(id(1)).unwrap();
        assert!(matches!(store.get(id(1)), Err(AppError::NotFound)));
        assert!(matches!(store.delete(id(1)), Err(AppError::NotFound)));
    }

    #[test]
    fn update_of_missing_id_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        for patch in [
            TodoPatch::default(),
            TodoPatch {
                name: Some("x".into()),
                ..Default::default()
            },
        ] {
            assert!(matches!(store.update(id(5), patch), Err(AppError::NotFound)));
        }
    }

    #[test]
    fn patch_values_are_bound_not_interpolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert(groceries()).unwrap();
        store.insert(groceries()).unwrap();

        let hostile = "x', name = 'pwned' --";
        let updated = store
            .update(
                id(1),
                TodoPatch {
                    name: Some(hostile.into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, hostile);
        assert_eq!(store.get(id(2)).unwrap().name, "Groceries");
    }

    #[test]
    fn missing_due_date_round_trips_as_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        let created = store
            .insert(NewTodo {
                due_date: None,
                ..groceries()
            })
            .unwrap();
        assert_eq!(store.get(created.id).unwrap().due_date, None);
    }

    #[test]
    fn out_of_range_status_is_rejected_by_schema() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.conn.lock().unwrap();
        let res = conn.execute("INSERT INTO todos (name, status) VALUES ('bad', 7)", []);
        assert!(res.is_err());
    }

    #[test]
    fn duplicate_username_conflicts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let alice = store.insert_credential("alice", "hash-1").unwrap();
        assert!(matches!(
            store.insert_credential("alice", "hash-2"),
            Err(AppError::Conflict(_))
        ));
        let found = store.find_credential("alice").unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert_eq!(found.password_hash, "hash-1");
        assert!(store.find_credential("bob").unwrap().is_none());
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store.insert(groceries()).unwrap();
            store.insert_credential("alice", "hash").unwrap();
        }

        let store = SqliteStore::open(path).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.find_credential("alice").unwrap().is_some());
    }
}
