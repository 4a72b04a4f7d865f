//! Connection and transaction messages.
//!
//! Each of these endpoints answers with a plain text body: the new
//! connection or transaction id, or an acknowledgment that is ignored.

use crate::protocol::message::{form, Body, Message, Method};

/// Open a connection (`GET /API/OpenConnection`).
#[derive(Debug, Clone, Default)]
pub struct OpenConnectionMessage;

impl Message for OpenConnectionMessage {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        "/API/OpenConnection".to_string()
    }

    fn failure_message(&self) -> String {
        "Failed to open connection".to_string()
    }
}

/// Close a connection.
#[derive(Debug, Clone)]
pub struct CloseConnectionMessage<'a> {
    pub connection_id: &'a str,
}

impl Message for CloseConnectionMessage<'_> {
    fn path(&self) -> String {
        "/API/CloseConnection".to_string()
    }

    fn body(&self) -> Body {
        form([("connectionId", self.connection_id)])
    }

    fn failure_message(&self) -> String {
        format!("Failed to close connection {}", self.connection_id)
    }
}

/// Begin a transaction on a connection.
#[derive(Debug, Clone)]
pub struct BeginTransactionMessage<'a> {
    pub connection_id: &'a str,
}

impl Message for BeginTransactionMessage<'_> {
    fn path(&self) -> String {
        "/API/BeginTransaction".to_string()
    }

    fn body(&self) -> Body {
        form([("connectionId", self.connection_id)])
    }

    fn failure_message(&self) -> String {
        format!(
            "Failed to begin transaction on connection {}",
            self.connection_id
        )
    }
}

/// How a transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Make the transaction's changes permanent.
    Commit,
    /// Discard the transaction's changes.
    Rollback,
}

impl Outcome {
    fn verb(&self) -> &'static str {
        match self {
            Outcome::Commit => "commit",
            Outcome::Rollback => "rollback",
        }
    }
}

/// Commit or roll back a transaction.
#[derive(Debug, Clone)]
pub struct EndTransactionMessage<'a> {
    pub connection_id: &'a str,
    pub transaction_id: &'a str,
    pub outcome: Outcome,
}

impl Message for EndTransactionMessage<'_> {
    fn path(&self) -> String {
        match self.outcome {
            Outcome::Commit => "/API/CommitTransaction".to_string(),
            Outcome::Rollback => "/API/RollbackTransaction".to_string(),
        }
    }

    fn body(&self) -> Body {
        form([
            ("connectionId", self.connection_id),
            ("transactionId", self.transaction_id),
        ])
    }

    fn failure_message(&self) -> String {
        format!(
            "Failed to {} transaction {} on connection {}",
            self.outcome.verb(),
            self.transaction_id,
            self.connection_id
        )
    }
}
