//! Cinchy Client for Rust
//!
//! An async client for the Cinchy data platform: runs CSQL and saved queries
//! over the platform's HTTP API, walks tabular results with a row cursor, and
//! sequences multi-step writes through connections and transactions.
//!
//! # Example
//!
//! ```no_run
//! use cinchy_rs::{AccessToken, Client, ClientConfig, Params, Result, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::new(
//!         "https://cinchy.example.com",
//!         "https://sso.example.com/identity",
//!         "my-app",
//!     );
//!     let identity = Arc::new(StaticTokenProvider::with_token(AccessToken::new("token")));
//!     let client = Client::new(config, identity)?;
//!
//!     // Run a saved query
//!     let params = Params::new().with("@questionid", 42);
//!     let mut result = client.execute_query("SDK Demo", "Get Answers", &params).await?;
//!
//!     println!("Columns: {:?}", result.column_names());
//!     while result.advance() {
//!         println!("{}", result.cell_value("Answer")?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod transaction;

// Re-export main types
pub use auth::{AccessToken, IdentityProvider, StaticTokenProvider};
pub use config::ClientConfig;
pub use connection::{Client, QueryResponse, SavedQuery, UserIdentity, UserPreference};
pub use cursor::{ColumnRef, KeyedValue, QueryResult};
pub use error::{Error, Result};
pub use gateway::{HttpGateway, RequestGateway};
pub use protocol::decode::decode_multi_value;
pub use protocol::types::{Column, ColumnInfo, Row, Value};
pub use protocol::{
    ApiRequest, Body, Method, Outcome, ParamValue, Params, QueryType, Statement, Target,
};
pub use transaction::{TransactionApi, TransactionSequencer, TransactionState};
