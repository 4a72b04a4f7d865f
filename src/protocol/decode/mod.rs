//! Decoders for structured cell encodings.
//!
//! ## Currently Supported
//!
//! | Encoding | Module |
//! |----------|--------|
//! | Multi-select (comma separated, quote aware) | `multi_value` |

mod multi_value;

pub use multi_value::decode_multi_value;
