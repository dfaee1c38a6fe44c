//! minio-deploy CLI
//!
//! Mirrors the build output into the configured bucket.
//!
//! Run with: minio-deploy deploy

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minio_deploy::deploy::{self, DeployReport};
use minio_deploy::envfile::{EnvFile, DEFAULT_ENV_FILE};
use minio_deploy::error::Result;
use minio_deploy::sync::SyncPlan;
use minio_deploy::Settings;

#[derive(Parser)]
#[command(name = "minio-deploy")]
#[command(about = "Mirror a static build directory into an S3-compatible bucket")]
#[command(version)]
struct Cli {
    /// Configuration file with KEY=value lines
    #[arg(long, env = "DEPLOY_ENV_FILE", default_value = DEFAULT_ENV_FILE, global = true)]
    env_file: String,

    /// Print the report as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "DEPLOY_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the source directory, creating the bucket if needed
    Deploy {
        #[command(flatten)]
        target: TargetArgs,
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List planned uploads and deletions (S3 transport)
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// S3 API endpoint (not the console port)
    #[arg(long, env = "MINIO_URL")]
    endpoint: Option<String>,
    /// Access key
    #[arg(long, env = "MINIO_ACCESS_KEY")]
    access_key: Option<String>,
    /// Secret key
    #[arg(long, env = "MINIO_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,
    /// Target bucket
    #[arg(long, env = "MINIO_BUCKET")]
    bucket: Option<String>,
    /// Sub-path inside the bucket
    #[arg(long, env = "MINIO_PREFIX")]
    prefix: Option<String>,
    /// Bucket region
    #[arg(long, env = "MINIO_REGION")]
    region: Option<String>,
    /// Remove remote objects that do not exist locally
    #[arg(
        long,
        env = "MINIO_REMOVE_EXTRA",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "1"
    )]
    remove_extra: Option<String>,
    /// Local directory to upload [default: dist]
    #[arg(long, env = "SOURCE_DIR")]
    source_dir: Option<String>,
    /// Alias name for the mc transport [default: minio]
    #[arg(long, env = "MINIO_ALIAS")]
    alias: Option<String>,
    /// Transport: sdk or mc [default: sdk]
    #[arg(long, env = "DEPLOY_TRANSPORT")]
    transport: Option<String>,
    /// Parallel uploads [default: 8]
    #[arg(long, env = "DEPLOY_CONCURRENCY")]
    concurrency: Option<String>,
}

impl TargetArgs {
    fn into_settings(self) -> Settings {
        Settings {
            endpoint: self.endpoint,
            access_key: self.access_key,
            secret_key: self.secret_key,
            bucket: self.bucket,
            prefix: self.prefix,
            region: self.region,
            alias: self.alias,
            remove_extra: self.remove_extra,
            source_dir: self.source_dir,
            transport: self.transport,
            concurrency: self.concurrency,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays clean
    let json_layer = cli.log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!cli.log_json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });
    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let env_path = PathBuf::from(shellexpand::tilde(&cli.env_file).as_ref());
    let env_file = EnvFile::load(&env_path)?;
    let from_file = Settings::from_env_file(&env_file);

    match cli.command {
        Commands::Deploy { target, dry_run } => {
            let settings = target.into_settings().or(from_file);
            let report = deploy::deploy_settings(settings, dry_run).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Plan { target } => {
            let config = target.into_settings().or(from_file).resolve()?;
            let plan = deploy::plan(&config).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }
    }

    Ok(())
}

fn print_report(report: &DeployReport) {
    let destination = if report.prefix.is_empty() {
        report.bucket.clone()
    } else {
        format!("{}/{}", report.bucket, report.prefix)
    };

    match &report.mirror {
        Some(mirror) if mirror.dry_run => {
            println!("Dry run against {} finished, nothing was written", destination);
        }
        Some(mirror) => {
            println!(
                "Deployed {} files ({} bytes) to {}",
                mirror.uploaded, mirror.bytes_uploaded, destination
            );
            if mirror.deleted > 0 {
                println!("Removed {} remote-only objects", mirror.deleted);
            }
        }
        None => println!(
            "Deployed to {} via {}",
            destination,
            report.transport.as_str()
        ),
    }
    println!(
        "Took {} ms",
        (report.completed_at - report.started_at).num_milliseconds()
    );
}

fn print_plan(plan: &SyncPlan) {
    for upload in &plan.uploads {
        println!("upload  {} ({})", upload.key, upload.content_type);
    }
    for key in &plan.deletions {
        println!("delete  {}", key);
    }
    println!(
        "{} uploads, {} deletions",
        plan.uploads.len(),
        plan.deletions.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_json_is_global() {
        let cli = Cli::try_parse_from(["minio-deploy", "plan", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Plan { .. }));

        let cli = Cli::try_parse_from(["minio-deploy", "deploy", "--dry-run"]).unwrap();
        assert!(!cli.log_json);
        assert!(matches!(cli.command, Commands::Deploy { dry_run: true, .. }));
    }

    #[test]
    fn test_bare_remove_extra_flag_means_true() {
        let cli = Cli::try_parse_from(["minio-deploy", "deploy", "--remove-extra"]).unwrap();
        let Commands::Deploy { target, .. } = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(target.remove_extra.as_deref(), Some("1"));
    }
}
