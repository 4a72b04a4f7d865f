//! Connection/transaction sequencing for multi-step writes.
//!
//! A write runs over five remote calls:
//!
//! 1. open connection → connection id
//! 2. begin transaction → transaction id
//! 3. execute one or more statements bound to both ids
//! 4. commit or roll back
//! 5. close connection
//!
//! [`TransactionSequencer`] drives these calls as an explicit state machine:
//!
//! ```text
//! Idle -> ConnectionOpen -> TransactionActive -> Executed -> Committed|RolledBack -> Closed
//! ```
//!
//! A step only advances the state when its remote call succeeds. A failed
//! step leaves the state as it was and does **not** close the connection;
//! cleanup is up to the caller. [`TransactionSequencer::run`] is the
//! alternative that always rolls back on execute failure and always closes.
//!
//! # Example
//!
//! ```no_run
//! use cinchy_rs::{Client, ClientConfig, Outcome, Params, Statement, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env()?;
//!     let client = Client::new(config, Arc::new(StaticTokenProvider::new()))?;
//!
//!     let insert = Statement::saved("SDK Demo", "Insert Answer")
//!         .with_params(Params::new().with("@answer", "42"));
//!
//!     client.transaction().run(&insert, Outcome::Commit).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cursor::QueryResult;
use crate::error::{Error, Result};
use crate::protocol::messages::{Outcome, Statement};

/// The remote calls a transaction is made of.
///
/// Implemented by [`Client`](crate::Client); tests substitute their own.
#[async_trait]
pub trait TransactionApi: Send + Sync {
    /// Open a connection and return its id.
    async fn open_connection(&self) -> Result<String>;

    /// Begin a transaction. Returns `None` without a remote call when
    /// `connection_id` is empty.
    async fn begin_transaction(&self, connection_id: &str) -> Result<Option<String>>;

    /// Execute a statement bound to the connection and transaction.
    async fn execute(
        &self,
        connection_id: &str,
        transaction_id: &str,
        statement: &Statement,
    ) -> Result<QueryResult>;

    /// Commit. Returns `false` without a remote call when an id is empty.
    async fn commit_transaction(&self, connection_id: &str, transaction_id: &str) -> Result<bool>;

    /// Roll back. Returns `false` without a remote call when an id is empty.
    async fn rollback_transaction(&self, connection_id: &str, transaction_id: &str)
        -> Result<bool>;

    /// Close a connection. Returns `false` without a remote call when
    /// `connection_id` is empty.
    async fn close_connection(&self, connection_id: &str) -> Result<bool>;
}

/// State of a transaction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Nothing opened yet.
    Idle,
    /// Connection open, no transaction.
    ConnectionOpen,
    /// Transaction begun, nothing executed yet.
    TransactionActive,
    /// At least one statement executed.
    Executed,
    Committed,
    RolledBack,
    /// Connection closed; the sequence is over.
    Closed,
}

impl TransactionState {
    /// Whether a remote connection is held in this state.
    pub fn holds_connection(&self) -> bool {
        !matches!(self, TransactionState::Idle | TransactionState::Closed)
    }
}

/// Drives one connection/transaction sequence.
///
/// Every step takes `&mut self`, so a sequencer cannot run two sequences at
/// once. Use one sequencer per transaction; independent sequencers may run
/// concurrently against the same API.
pub struct TransactionSequencer<'a, A: TransactionApi + ?Sized> {
    api: &'a A,
    state: TransactionState,
    connection_id: Option<String>,
    transaction_id: Option<String>,
}

impl<'a, A: TransactionApi + ?Sized> TransactionSequencer<'a, A> {
    /// Create an idle sequencer.
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            state: TransactionState::Idle,
            connection_id: None,
            transaction_id: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Connection id, once open.
    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Transaction id, once begun.
    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    fn require(&self, operation: &'static str, allowed: &[TransactionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidTransactionState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, to: TransactionState) {
        debug!(from = ?self.state, ?to, connection_id = ?self.connection_id, "transaction state change");
        self.state = to;
    }

    fn ids(&self) -> (&str, &str) {
        (
            self.connection_id.as_deref().unwrap_or_default(),
            self.transaction_id.as_deref().unwrap_or_default(),
        )
    }

    /// Open the connection.
    pub async fn open(&mut self) -> Result<&str> {
        self.require("open a connection", &[TransactionState::Idle])?;
        let connection_id = self.api.open_connection().await?;
        self.connection_id = Some(connection_id);
        self.transition(TransactionState::ConnectionOpen);
        Ok(self.ids().0)
    }

    /// Begin the transaction.
    ///
    /// Returns `None` and stays in `ConnectionOpen` if the connection id is
    /// empty or no transaction id was returned; callers must check before
    /// relying on a transaction.
    pub async fn begin(&mut self) -> Result<Option<&str>> {
        self.require("begin a transaction", &[TransactionState::ConnectionOpen])?;
        let (connection_id, _) = self.ids();
        match self.api.begin_transaction(connection_id).await? {
            Some(transaction_id) if !transaction_id.is_empty() => {
                self.transaction_id = Some(transaction_id);
                self.transition(TransactionState::TransactionActive);
                Ok(self.transaction_id.as_deref())
            }
            _ => {
                debug!(connection_id, "begin transaction skipped");
                Ok(None)
            }
        }
    }

    /// Execute a statement in the transaction.
    ///
    /// May be called repeatedly while the transaction is active.
    pub async fn execute(&mut self, statement: &Statement) -> Result<QueryResult> {
        self.require(
            "execute",
            &[TransactionState::TransactionActive, TransactionState::Executed],
        )?;
        let (connection_id, transaction_id) = self.ids();
        let result = self
            .api
            .execute(connection_id, transaction_id, statement)
            .await?;
        self.transition(TransactionState::Executed);
        Ok(result)
    }

    /// Commit the transaction.
    pub async fn commit(&mut self) -> Result<()> {
        self.end(Outcome::Commit).await
    }

    /// Roll back the transaction.
    ///
    /// Allowed right after `begin` too, so a failed `execute` can be undone.
    pub async fn rollback(&mut self) -> Result<()> {
        self.end(Outcome::Rollback).await
    }

    async fn end(&mut self, outcome: Outcome) -> Result<()> {
        let (operation, target) = match outcome {
            Outcome::Commit => ("commit", TransactionState::Committed),
            Outcome::Rollback => ("roll back", TransactionState::RolledBack),
        };
        self.require(
            operation,
            &[TransactionState::TransactionActive, TransactionState::Executed],
        )?;
        let (connection_id, transaction_id) = self.ids();
        let issued = match outcome {
            Outcome::Commit => self.api.commit_transaction(connection_id, transaction_id).await?,
            Outcome::Rollback => {
                self.api
                    .rollback_transaction(connection_id, transaction_id)
                    .await?
            }
        };
        if !issued {
            return Err(Error::invalid_argument(format!(
                "cannot {} without connection and transaction ids",
                operation
            )));
        }
        self.transition(target);
        Ok(())
    }

    /// Close the connection.
    ///
    /// Allowed from any state holding a connection; issues at most one remote
    /// close per sequence.
    pub async fn close(&mut self) -> Result<()> {
        if !self.state.holds_connection() {
            return Err(Error::InvalidTransactionState {
                operation: "close the connection",
                state: self.state,
            });
        }
        let (connection_id, _) = self.ids();
        self.api.close_connection(connection_id).await?;
        self.transition(TransactionState::Closed);
        Ok(())
    }

    /// Run a complete sequence for one statement.
    ///
    /// The connection is closed on every path once opened. If `execute` fails
    /// the transaction is rolled back first. The first error encountered is
    /// returned; cleanup failures after it are logged.
    pub async fn run(&mut self, statement: &Statement, outcome: Outcome) -> Result<QueryResult> {
        self.open().await?;

        match self.begin().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let err = Error::remote("Failed to begin transaction: no transaction id");
                return Err(self.cleanup(err, false).await);
            }
            Err(err) => return Err(self.cleanup(err, false).await),
        }

        let result = match self.execute(statement).await {
            Ok(result) => result,
            Err(err) => return Err(self.cleanup(err, true).await),
        };

        let ended = match outcome {
            Outcome::Commit => self.commit().await,
            Outcome::Rollback => self.rollback().await,
        };
        let closed = self.close().await;
        match (ended, closed) {
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "failed to close connection after failed {:?}", outcome);
                }
                Err(err)
            }
            (Ok(()), Err(err)) => Err(err),
            (Ok(()), Ok(())) => Ok(result),
        }
    }

    async fn cleanup(&mut self, err: Error, rollback: bool) -> Error {
        if rollback {
            if let Err(rollback_err) = self.rollback().await {
                warn!(error = %rollback_err, "failed to roll back transaction");
            }
        }
        if let Err(close_err) = self.close().await {
            warn!(error = %close_err, "failed to close connection");
        }
        err
    }
}

impl<A: TransactionApi + ?Sized> Drop for TransactionSequencer<'_, A> {
    fn drop(&mut self) {
        if self.state.holds_connection() {
            warn!(
                state = ?self.state,
                connection_id = ?self.connection_id,
                "transaction sequencer dropped without closing its connection"
            );
        }
    }
}
