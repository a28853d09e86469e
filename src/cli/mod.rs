pub mod commands;

pub use commands::{build_router, cmd_derive, cmd_hash, cmd_serve, CliResult};
