//! Moby: run staged command environments inside a throwaway docker container.
//!
//! A `moby.yml` lists environments; each one pushes files in, runs commands,
//! pulls results back out, and may wrap nested environments before and after.

pub mod cli;
pub mod console;
pub mod core;
pub mod logging;
pub mod transport;
