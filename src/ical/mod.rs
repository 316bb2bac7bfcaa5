//! This module handles conversion between ICS documents and internal representations
//!
//! It is a wrapper around two different Rust third-party libraries, since I haven't found any complete library that is able to parse _and_ generate iCal documents

mod parser;
pub use parser::parse;
mod builder;
pub use builder::build_document;
