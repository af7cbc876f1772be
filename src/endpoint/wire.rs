//! Wire format shared by the HTTP server and the HTTP endpoint adapter.
//!
//! Requests carry a single field `s`. Replies carry the value `v` and an
//! optional `err`; errors travel in the body so that a remote failure reaches
//! the caller as data.

use serde::{Deserialize, Serialize};

/// The logical operations offered by the string service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Uppercase,
    Downcase,
    Count,
    Palindrome,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Uppercase,
        Operation::Downcase,
        Operation::Count,
        Operation::Palindrome,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Uppercase => "uppercase",
            Operation::Downcase => "downcase",
            Operation::Count => "count",
            Operation::Palindrome => "palindrome",
        }
    }

    /// Route used when an instance address carries no explicit path.
    pub fn path(self) -> &'static str {
        match self {
            Operation::Uppercase => "/uppercase",
            Operation::Downcase => "/downcase",
            Operation::Count => "/count",
            Operation::Palindrome => "/palindrome",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRequest {
    pub s: String,
}

impl StringRequest {
    pub fn new(s: impl Into<String>) -> Self {
        Self { s: s.into() }
    }
}

/// Reply body for every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub v: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

pub type StringReply = Reply<String>;

impl<T> Reply<T> {
    pub fn ok(v: T) -> Self {
        Self { v, err: None }
    }
}

impl<T: Default> Reply<T> {
    /// Encode a service result, moving any error into the body.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::ok(v),
            Err(e) => Self {
                v: T::default(),
                err: Some(e.to_string()),
            },
        }
    }
}

/// Access to the in-body error indicator of a decoded reply.
pub trait WireResponse {
    /// The error carried by the reply, if any. Empty strings count as none.
    fn error(&self) -> Option<&str>;
}

impl<T> WireResponse for Reply<T> {
    fn error(&self) -> Option<&str> {
        self.err.as_deref().filter(|e| !e.is_empty())
    }
}
