use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "zonecheck")]
#[command(about = "Cross-zone object version checks", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (environment variables still override)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configured zones and default bucket
    Zones,

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> site...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Compare the latest version of one key across every zone
    Check {
        /// Object key
        #[arg(long)]
        key: String,

        /// Zone the caller is looking at
        #[arg(long)]
        current_zone: String,

        /// Overrides BUCKET
        #[arg(long)]
        bucket: Option<String>,

        /// Exit with status 3 when the zones disagree
        #[arg(long, default_value_t = false)]
        require_consistent: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience).
    let _ = dotenvy::from_filename(".env.local");

    // stdout carries results; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_refs: Vec<&str> = cli.config_paths.iter().map(|s| s.as_str()).collect();

    match cli.cmd {
        Commands::Zones => {
            let settings = commands::load_settings(&config_refs)?;
            println!(
                "bucket={}",
                settings.default_bucket.as_deref().unwrap_or("")
            );
            for zone in settings.registry.iter() {
                println!("{}\t{}", zone.name, zone.endpoint);
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = zc_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Check {
            key,
            current_zone,
            bucket,
            require_consistent,
        } => {
            let settings = commands::load_settings(&config_refs)?;
            let report =
                commands::check::run(&settings, &key, &current_zone, bucket.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if require_consistent && !report.consistent {
                std::process::exit(3);
            }
        }
    }

    Ok(())
}
