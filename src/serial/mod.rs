//! XML serialization.
//!
//! Writes a [`Document`](crate::tree::Document) tree back to XML text, either
//! compact or with element-only content indented.

pub mod xml;

pub use xml::{serialize, serialize_with_options, SerializeOptions};
