//! Core logic: config types, parsing, command execution, file transfer and
//! the environment runner.

pub mod error;
pub mod executor;
pub mod parser;
pub mod runner;
pub mod transfer;
pub mod types;
