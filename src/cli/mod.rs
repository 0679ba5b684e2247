//! CLI module - Command-line interface for devgis
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// devgis - GeoJSON workspace with an administration panel
#[derive(Parser)]
#[command(name = "devgis")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create the superuser, or reset it when the email already exists
    CreateSuperuser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Generated and printed when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a regular user
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Generated and printed when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

pub use commands::*;
