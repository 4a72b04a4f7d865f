//! API message definitions.
//!
//! Each message implements the `Message` trait.

pub mod account;
pub mod execute;
pub mod transaction;

pub use account::{GroupsMessage, TableEntitlementsMessage, TableRef, UserInfoMessage};
pub use execute::{
    Binding, ExecuteCqlMessage, ParamValue, Params, QueryType, SavedQueryMessage, Statement,
};
pub use transaction::{
    BeginTransactionMessage, CloseConnectionMessage, EndTransactionMessage, OpenConnectionMessage,
    Outcome,
};
