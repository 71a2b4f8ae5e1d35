use std::sync::Mutex;

use time::{Duration, OffsetDateTime};

use super::{CredentialStore, TodoStore};
use crate::error::AppError;
use crate::id::TodoId;
use crate::merge::merge;
use crate::models::{Credential, NewTodo, Status, Todo, TodoPatch};

/// Process-local store. One lock guards everything, so read-modify-write
/// updates are serialized.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

struct Inner {
    todos: Vec<Todo>,
    next_todo_id: TodoId,
    credentials: Vec<Credential>,
    last_credential_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            todos: Vec::new(),
            next_todo_id: TodoId::FIRST,
            credentials: Vec::new(),
            last_credential_id: 0,
        }
    }
}

impl Inner {
    fn push(&mut self, todo: NewTodo) -> Todo {
        let id = self.next_todo_id;
        self.next_todo_id = id.next();
        let todo = Todo {
            id,
            name: todo.name,
            description: todo.description,
            status: todo.status,
            due_date: todo.due_date,
        };
        self.todos.push(todo.clone());
        todo
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding a few sample todos, handy for trying the API out.
    pub fn with_demo_todos() -> Self {
        let now = OffsetDateTime::now_utc();
        let mut inner = Inner::default();
        let samples = [
            ("Shopping", "eggs, milk", Status::Completed, 1),
            ("Reading", "finish chapter 4", Status::Pending, 2),
            (
                "Web framework tutorial",
                "work through the handlers section",
                Status::Pending,
                3,
            ),
        ];
        for (name, description, status, days) in samples {
            inner.push(NewTodo {
                name: name.to_string(),
                description: description.to_string(),
                status,
                due_date: Some(now + Duration::days(days)),
            });
        }
        MemoryStore {
            inner: Mutex::new(inner),
        }
    }
}

impl TodoStore for MemoryStore {
    fn list(&self) -> Result<Vec<Todo>, AppError> {
        Ok(self.inner.lock()?.todos.clone())
    }

    fn get(&self, id: TodoId) -> Result<Todo, AppError> {
        let inner = self.inner.lock()?;
        inner
            .todos
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    fn insert(&self, todo: NewTodo) -> Result<Todo, AppError> {
        Ok(self.inner.lock()?.push(todo))
    }

    fn update(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, AppError> {
        let mut inner = self.inner.lock()?;
        let slot = inner
            .todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AppError::NotFound)?;

        if patch.is_empty() {
            return Ok(slot.clone());
        }

        *slot = merge(slot.clone(), patch);
        Ok(slot.clone())
    }

    fn delete(&self, id: TodoId) -> Result<(), AppError> {
        let mut inner = self.inner.lock()?;
        let before = inner.todos.len();
        inner.todos.retain(|t| t.id != id);
        if inner.todos.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    fn insert_credential(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Credential, AppError> {
        let mut inner = self.inner.lock()?;
        if inner.credentials.iter().any(|c| c.username == username) {
            return Err(AppError::Conflict("Username already exists"));
        }
        inner.last_credential_id += 1;
        let credential = Credential {
            id: inner.last_credential_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        inner.credentials.push(credential.clone());
        Ok(credential)
    }

    fn find_credential(&self, username: &str) -> Result<Option<Credential>, AppError> {
        let inner = self.inner.lock()?;
        Ok(inner
            .credentials
            .iter()
            .find(|c| c.username == username)
            .cloned())
    }
}
