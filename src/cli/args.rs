//! Command-line argument parsing for pgplite.

use crate::crypto::{CompressionAlgorithm, SymmetricAlgorithm};
use crate::message::MessagePolicy;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::process;

/// Command-line interface commands
#[derive(Debug)]
pub enum Command {
    GenerateKey {
        user_id: String,
        output_prefix: PathBuf,
        passphrase_protected: bool,
    },
    ListKeys {
        ring_file: PathBuf,
    },
    Encrypt {
        ring_file: PathBuf,
        input_file: PathBuf,
        output_file: PathBuf,
        policy: MessagePolicy,
    },
    Decrypt {
        ring_file: PathBuf,
        input_file: PathBuf,
        output_file: PathBuf,
    },
}

/// Parse command line arguments into a Command
pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "generate-key" => {
            if args.len() < 4 {
                eprintln!("Error: generate-key requires a user ID and an output prefix");
                eprintln!("Usage: pgplite generate-key <user_id> <output_prefix> [--passphrase]");
                process::exit(1);
            }

            let passphrase_protected = args.len() > 4 && args[4] == "--passphrase";

            Ok(Command::GenerateKey {
                user_id: args[2].clone(),
                output_prefix: PathBuf::from(&args[3]),
                passphrase_protected,
            })
        }

        "list-keys" => {
            if args.len() < 3 {
                eprintln!("Error: list-keys requires a key ring file");
                process::exit(1);
            }
            Ok(Command::ListKeys {
                ring_file: PathBuf::from(&args[2]),
            })
        }

        "encrypt" => {
            if args.len() < 5 {
                eprintln!("Error: encrypt requires a public ring, input file, and output file");
                eprintln!(
                    "Usage: pgplite encrypt <public_ring> <input> <output> \
                     [--symmetric <cipher>] [--compression <mode>]"
                );
                process::exit(1);
            }

            let mut symmetric = SymmetricAlgorithm::Aes256Gcm;
            let mut compression = CompressionAlgorithm::Zip;

            let mut i = 5;
            while i < args.len() {
                match args[i].as_str() {
                    "--symmetric" => {
                        i += 1;
                        symmetric = match args.get(i).map(String::as_str) {
                            Some("aes256-gcm") => SymmetricAlgorithm::Aes256Gcm,
                            Some("tripledes-cbc") => SymmetricAlgorithm::TripleDesCbc,
                            other => {
                                eprintln!(
                                    "Error: unsupported cipher '{}'",
                                    other.unwrap_or("<missing>")
                                );
                                eprintln!("Supported ciphers: aes256-gcm, tripledes-cbc");
                                process::exit(1);
                            }
                        };
                    }
                    "--compression" => {
                        i += 1;
                        compression = match args.get(i).map(String::as_str) {
                            Some("zip") => CompressionAlgorithm::Zip,
                            Some("none") => CompressionAlgorithm::Uncompressed,
                            other => {
                                eprintln!(
                                    "Error: unsupported compression mode '{}'",
                                    other.unwrap_or("<missing>")
                                );
                                eprintln!("Supported modes: zip, none");
                                process::exit(1);
                            }
                        };
                    }
                    other => {
                        eprintln!("Error: unknown option '{}'", other);
                        process::exit(1);
                    }
                }
                i += 1;
            }

            Ok(Command::Encrypt {
                ring_file: PathBuf::from(&args[2]),
                input_file: PathBuf::from(&args[3]),
                output_file: PathBuf::from(&args[4]),
                policy: MessagePolicy::new(symmetric, compression),
            })
        }

        "decrypt" => {
            if args.len() < 5 {
                eprintln!("Error: decrypt requires a secret ring, input file, and output file");
                process::exit(1);
            }
            Ok(Command::Decrypt {
                ring_file: PathBuf::from(&args[2]),
                input_file: PathBuf::from(&args[3]),
                output_file: PathBuf::from(&args[4]),
            })
        }

        _ => {
            eprintln!("Error: Unknown command '{}'", args[1]);
            print_usage();
            process::exit(1);
        }
    }
}

/// Print usage information
pub fn print_usage() {
    println!("pgplite - Post-quantum message encryption");
    println!("=========================================");
    println!();
    println!("Usage: pgplite <command> [args...]");
    println!();
    println!("Commands:");
    println!("  generate-key <user_id> <prefix> [--passphrase]   Generate a key ring pair");
    println!("  list-keys <ring_file>                            List keys in a ring file");
    println!("  encrypt <public_ring> <input> <output>           Encrypt a file");
    println!("      [--symmetric aes256-gcm|tripledes-cbc]");
    println!("      [--compression zip|none]");
    println!("  decrypt <secret_ring> <input> <output>           Decrypt a file");
    println!();
    println!("Examples:");
    println!("  pgplite generate-key 'Alice <alice@example.com>' alice");
    println!("  pgplite generate-key 'Bob <bob@example.com>' bob --passphrase");
    println!("  pgplite encrypt alice.pub.asc message.txt message.asc");
    println!("  pgplite encrypt alice.pub.asc notes.txt notes.asc --compression none");
    println!("  pgplite decrypt alice.sec.asc message.asc message.txt");
}
