//! Command-line interface for pgplite.
//!
//! Key rings live in ordinary files passed on the command line; there
//! is no hidden keyring directory. Every command reads armored or
//! binary ring files and writes armored output.

pub mod args;
pub mod commands;
pub mod utils;

use crate::Result;
use std::process;

pub use args::Command;

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    let command = match args::parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            process::exit(1);
        }
    };

    let result = match command {
        Command::GenerateKey {
            user_id,
            output_prefix,
            passphrase_protected,
        } => commands::generate_key(&user_id, &output_prefix, passphrase_protected),
        Command::ListKeys { ring_file } => commands::list_keys(&ring_file),
        Command::Encrypt {
            ring_file,
            input_file,
            output_file,
            policy,
        } => commands::encrypt(&ring_file, &input_file, &output_file, policy),
        Command::Decrypt {
            ring_file,
            input_file,
            output_file,
        } => commands::decrypt(&ring_file, &input_file, &output_file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    Ok(())
}
