mod config;
mod serve;
mod trust;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::config::{Config, Overrides};

/// Student achievement (prestasi) workflow service.
#[derive(Parser)]
#[command(name = "prestasi", version, about = "Student achievement workflow service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Path to a TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Listen address, overrides [server] listen
        #[arg(long, env = "PRESTASI_LISTEN")]
        listen: Option<SocketAddr>,
        /// Base64 Ed25519 token verifying key, overrides [auth]
        #[arg(long, env = "PRESTASI_PUBLIC_KEY")]
        public_key: Option<String>,
        /// Attachment directory, overrides [uploads] dir
        #[arg(long, env = "PRESTASI_UPLOAD_DIR")]
        upload_dir: Option<PathBuf>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },

    /// Validate a config file without starting the server
    CheckConfig {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// Generate an Ed25519 token-signing keypair
    Keygen {
        /// Output file prefix; writes <prefix>.secret and <prefix>.pub
        #[arg(long, default_value = "prestasi")]
        prefix: String,
    },

    /// Issue a signed bearer token (development aid)
    Token {
        /// Path to the .secret file from `prestasi keygen`
        #[arg(long)]
        key: PathBuf,
        /// User id (`sub` claim)
        #[arg(long)]
        user_id: String,
        /// Username claim
        #[arg(long)]
        username: String,
        /// Role: Admin, "Dosen Wali", Mahasiswa (or admin, advisor, student)
        #[arg(long)]
        role: String,
        /// Permission names, repeatable
        #[arg(long = "perm")]
        perms: Vec<String>,
        /// Token lifetime in hours
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            public_key,
            upload_dir,
            tls_cert,
            tls_key,
        } => {
            // Validate TLS flags: both must be provided or neither
            if tls_cert.is_some() != tls_key.is_some() {
                eprintln!("error: --tls-cert and --tls-key must both be provided");
                process::exit(1);
            }
            let mut config = match Config::load(config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            };
            config.apply(Overrides {
                listen,
                public_key,
                upload_dir,
            });
            if let Err(e) = config.validate() {
                eprintln!("{}", e);
                process::exit(1);
            }

            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config, tls_cert, tls_key)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::CheckConfig { config } => {
            let result = Config::load(Some(config.as_path())).and_then(|c| c.validate().map(|()| c));
            match result {
                Ok(c) => println!(
                    "{}: ok ({} users, {} students, {} lecturers)",
                    config.display(),
                    c.directory.users.len(),
                    c.directory.students.len(),
                    c.directory.lecturers.len()
                ),
                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(1);
                }
            }
        }
        Commands::Keygen { prefix } => {
            trust::keygen::cmd_keygen(&prefix);
        }
        Commands::Token {
            key,
            user_id,
            username,
            role,
            perms,
            ttl_hours,
        } => {
            trust::token::cmd_token(&key, &user_id, &username, &role, perms, ttl_hours);
        }
    }
}
