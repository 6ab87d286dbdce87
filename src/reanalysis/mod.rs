pub mod archive;
pub mod config;
pub mod error;
pub mod extractor;
pub mod reader;
