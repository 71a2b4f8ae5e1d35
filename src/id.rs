use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Store-assigned todo identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TodoId(i64);

impl TodoId {
    pub const FIRST: TodoId = TodoId(1);

    pub fn new(raw: i64) -> Result<Self, AppError> {
        if raw > 0 {
            Ok(TodoId(raw))
        } else {
            Err(AppError::InvalidIdentifier)
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// The identifier handed out after this one.
    pub fn next(self) -> TodoId {
        TodoId(self.0.saturating_add(1))
    }
}

impl TryFrom<i64> for TodoId {
    type Error = AppError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        TodoId::new(raw)
    }
}

impl From<TodoId> for i64 {
    fn from(id: TodoId) -> Self {
        id.0
    }
}

impl FromStr for TodoId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // i64::from_str accepts a leading '+', identifiers don't
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::InvalidIdentifier);
        }
        let raw = s.parse::<i64>().map_err(|_| AppError::InvalidIdentifier)?;
        TodoId::new(raw)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_integers() {
        assert_eq!("1".parse::<TodoId>().unwrap().get(), 1);
        assert_eq!("42".parse::<TodoId>().unwrap().to_string(), "42");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for raw in ["", "0", "-3", "+3", "abc", "1.5", " 7", "99999999999999999999"] {
            assert!(
                matches!(raw.parse::<TodoId>(), Err(AppError::InvalidIdentifier)),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn deserialization_enforces_positive_ids() {
        assert_eq!(serde_json::from_str::<TodoId>("3").unwrap().get(), 3);
        assert!(serde_json::from_str::<TodoId>("0").is_err());
        assert!(serde_json::from_str::<TodoId>("-4").is_err());
        assert_eq!(serde_json::to_string(&TodoId::FIRST).unwrap(), "1");
    }

    #[test]
    fn next_counts_up_from_first() {
        assert_eq!(TodoId::FIRST.next().get(), 2);
    }
}
