use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use tokio::io::AsyncBufReadExt;

use decodegen::extract::DefineScanner;
use decodegen::profile::PayloadProfile;
use decodegen::render;

#[derive(Parser)]
#[command(name = "decodegen")]
#[command(about = "Generates the LoRaWAN uplink decoder call from a compile-time feature configuration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Payload profile file (TOML); built-in weather station layout if omitted
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Read preprocessor output and print the decoder call (the default)
    Generate {
        /// Read macro definitions from a file instead of stdin
        #[arg(short, long)]
        input: Option<String>,
    },
    /// List the feature flags the generator recognizes
    Features {
        /// Emit the list as JSON
        #[arg(long)]
        json: bool,
    },
    /// List every field of the payload layout in packing order
    Fields {
        /// Emit the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the payload profile and report duplicate keys
    Check {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the built-in layout as a profile template
    Init {
        /// Where to write the template (defaults to payload-profile.toml)
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .init();

    debug!("decodegen v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Generate { input: None }) {
        Commands::Generate { input } => {
            let profile = load_profile(cli.profile.as_deref()).await?;
            let mut scanner = DefineScanner::new(&profile);

            match input {
                Some(path) => {
                    let content = tokio::fs::read_to_string(&path)
                        .await
                        .map_err(|e| anyhow!("Failed to read input {}: {}", path, e))?;
                    scanner.scan_lines(content.lines());
                }
                None => {
                    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
                    while let Some(line) = lines.next_line().await? {
                        scanner.scan_line(&line);
                    }
                }
            }

            let active = scanner.finish();
            debug!("active features: {:?}", active.sorted());

            println!("{}", render::render(&profile, &active)?);
        }
        Commands::Features { json } => {
            let profile = load_profile(cli.profile.as_deref()).await?;
            if json {
                println!("{}", serde_json::json!({ "features": profile.features }));
            } else {
                for name in &profile.features {
                    println!("{}", name);
                }
            }
        }
        Commands::Fields { json } => {
            let profile = load_profile(cli.profile.as_deref()).await?;
            if json {
                let fields: Vec<_> = profile
                    .fields
                    .iter()
                    .enumerate()
                    .map(|(pos, field)| {
                        serde_json::json!({
                            "position": pos + 1,
                            "key": field.key,
                            "type": field.decode_type,
                            "condition": field.condition,
                        })
                    })
                    .collect();
                println!("{}", serde_json::json!({ "fields": fields }));
            } else {
                for (pos, field) in profile.fields.iter().enumerate() {
                    println!(
                        "{:>2}  {:<22} {:<12} {}",
                        pos + 1,
                        field.key,
                        field.decode_type,
                        field.condition_label()
                    );
                }
            }
        }
        Commands::Check { json } => {
            // Parse without validating up front so the verdict itself is the report.
            let profile = match cli.profile.as_deref() {
                Some(path) => {
                    let content = tokio::fs::read_to_string(path)
                        .await
                        .map_err(|e| anyhow!("Failed to read profile {}: {}", path, e))?;
                    toml::from_str::<PayloadProfile>(&content)
                        .map_err(|e| anyhow!("Failed to parse profile {}: {}", path, e))?
                }
                None => PayloadProfile::default(),
            };

            let verdict = profile.validate();
            let shared = profile.shared_keys();

            if json {
                let payload = serde_json::json!({
                    "status": if verdict.is_ok() { "ok" } else { "invalid" },
                    "error": verdict.as_ref().err().map(|e| e.to_string()),
                    "fields": profile.fields.len(),
                    "features": profile.features.len(),
                    "shared_keys": shared
                        .iter()
                        .map(|(key, conditions)| serde_json::json!({
                            "key": key,
                            "conditions": conditions,
                        }))
                        .collect::<Vec<_>>(),
                });
                println!("{}", payload);
            } else {
                println!(
                    "profile: {} fields, {} known flags",
                    profile.fields.len(),
                    profile.features.len()
                );
                for (key, conditions) in &shared {
                    println!("shared key {} under: {}", key, conditions.join(", "));
                }
                match &verdict {
                    Ok(()) => println!("OK"),
                    Err(e) => println!("INVALID: {}", e),
                }
            }

            if verdict.is_err() {
                std::process::exit(1);
            }
        }
        Commands::Init { path } => {
            let path = path
                .or(cli.profile)
                .unwrap_or_else(|| "payload-profile.toml".to_string());
            PayloadProfile::write_template(&path).await?;
            info!("Profile template written to {}", path);
        }
    }

    Ok(())
}

async fn load_profile(path: Option<&str>) -> Result<PayloadProfile> {
    match path {
        Some(path) => {
            let profile = PayloadProfile::load(path).await?;
            info!("Loaded payload profile from {}", path);
            Ok(profile)
        }
        None => Ok(PayloadProfile::default()),
    }
}
