use crate::models::{Todo, TodoPatch};

/// Applies every supplied field of `patch` on top of `existing`.
///
/// The identifier is never touched. An empty patch yields `existing` unchanged.
pub fn merge(existing: Todo, patch: TodoPatch) -> Todo {
    let TodoPatch {
        name,
        description,
        status,
        due_date,
    } = patch;

    Todo {
        id: existing.id,
        name: name.unwrap_or(existing.name),
        description: description.unwrap_or(existing.description),
        status: status.unwrap_or(existing.status),
        due_date: due_date.or(existing.due_date),
    }
}
