//! buildmark - inspect and convert build/version identities.
//!
//! ## Commands
//!
//! - `parse`: normalize a free-form version string
//! - `describe`: normalize a VCS-describe string
//! - `unpack`: decode a packed base-1000 version integer

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};

use buildmark_core::{init_tracing, VersionIdentity};

#[derive(Parser)]
#[command(name = "buildmark")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build/version identity toolbox", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a free-form version string such as `svc-v1.2.3-0a1b2c3d`
    Parse {
        /// Version string to parse
        input: String,

        /// Fill missing hash/build-time from the running executable
        #[arg(long)]
        enrich: bool,
    },

    /// Normalize a VCS-describe string such as `v0.0.1-1-gd4f800c-dirty`
    Describe {
        /// Describe output to parse
        input: String,
    },

    /// Decode a packed base-1000 version integer
    Unpack {
        /// Packed value, e.g. 1002003
        value: i32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Parse { input, enrich } => {
            let mut identity = VersionIdentity::default();
            identity.parse_str(&input)?;
            if enrich {
                identity.enrich();
            }
            debug!(event = "cli.parsed", input = %input, packed = identity.as_int32());
            report(&identity)?;
        }
        Commands::Describe { input } => {
            let mut identity = VersionIdentity::default();
            identity.parse_commit(&input)?;
            report(&identity)?;
        }
        Commands::Unpack { value } => {
            let mut identity = VersionIdentity::default();
            identity.parse_int(value);
            report(&identity)?;
        }
    }
    Ok(())
}

/// Print the canonical rendering, the packed form and the record itself.
fn report(identity: &VersionIdentity) -> Result<()> {
    println!("{identity}");
    println!("packed: {}", identity.as_int32());
    println!("record: {}", serde_json::to_string(identity)?);
    Ok(())
}
