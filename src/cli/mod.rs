//! Command line interface
//!
//! - `serve`: run the HTTP API
//! - `migrate`: apply pending database migrations and exit

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// Todo service - CRUD, paging, filtering and search over todo items
#[derive(Parser)]
#[command(name = "todo-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve(serve::ServeArgs),

    /// Apply pending database migrations, then exit
    Migrate,
}
