//! Report rendering.

pub mod generator;

pub use generator::{generate_history_table, generate_json_report, generate_markdown_report};
