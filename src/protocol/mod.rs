//! Wire-level pieces of the Cinchy API: messages, payload parsing, cell types.

pub mod decode;
pub mod message;
pub mod messages;
pub mod response;
pub mod types;

pub use message::{ApiRequest, Body, Message, Method, Target};
pub use messages::{
    ExecuteCqlMessage, Outcome, ParamValue, Params, QueryType, SavedQueryMessage, Statement,
};
pub use types::{Column, ColumnInfo, Row, Value};

/// True if the text is empty or whitespace only.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}
