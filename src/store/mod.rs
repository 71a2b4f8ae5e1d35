pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use crate::error::AppError;
use crate::id::TodoId;
use crate::models::{Credential, NewTodo, Todo, TodoPatch};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Todo persistence. Every method may fail with `StoreUnavailable`.
pub trait TodoStore: Send + Sync {
    fn list(&self) -> Result<Vec<Todo>, AppError>;

    fn get(&self, id: TodoId) -> Result<Todo, AppError>;

    /// Persists a new record; the store picks the identifier.
    fn insert(&self, todo: NewTodo) -> Result<Todo, AppError>;

    /// Merges `patch` into the stored record. An empty patch never writes.
    fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, AppError>;

    fn delete(&self, id: TodoId) -> Result<(), AppError>;
}

pub trait CredentialStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    fn insert_credential(&self, username: &str, password_hash: &str)
        -> Result<Credential, AppError>;

    fn find_credential(&self, username: &str) -> Result<Option<Credential>, AppError>;
}

/// Where todos and credentials live, chosen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory { seed_demo: bool },
    Sqlite(String),
}

pub struct Stores {
    pub todos: Arc<dyn TodoStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

pub fn open(backend: &Backend) -> Result<Stores, AppError> {
    match backend {
        Backend::Memory { seed_demo } => {
            let store = if *seed_demo {
                Arc::new(MemoryStore::with_demo_todos())
            } else {
                Arc::new(MemoryStore::new())
            };
            Ok(Stores {
                todos: store.clone(),
                credentials: store,
            })
        }
        Backend::Sqlite(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            Ok(Stores {
                todos: store.clone(),
                credentials: store,
            })
        }
    }
}
