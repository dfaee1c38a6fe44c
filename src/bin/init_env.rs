//! minio-init-env
//!
//! Creates the `.env` file with the deploy variables, or prints the current
//! values when it already exists.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minio_deploy::envfile::{init_env_file, render_known_vars, InitOutcome, DEFAULT_ENV_FILE};
use minio_deploy::error::Result;

#[derive(Parser, Debug)]
#[command(name = "minio-init-env")]
#[command(about = "Create or inspect the deploy .env file")]
#[command(version)]
struct Args {
    /// Path of the file to create or inspect
    #[arg(long, env = "DEPLOY_ENV_FILE", default_value = DEFAULT_ENV_FILE)]
    path: String,

    /// Print secret values instead of masking them
    #[arg(long)]
    show_secrets: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(args: Args) -> Result<()> {
    let path = PathBuf::from(shellexpand::tilde(&args.path).as_ref());

    match init_env_file(&path)? {
        InitOutcome::Created(path) => {
            println!(".env created at: {}", path.display());
            println!("Fill in the variables and run: minio-deploy deploy");
        }
        InitOutcome::Existing(path, env) => {
            println!(".env already exists at: {}", path.display());
            println!("Current values:");
            for line in render_known_vars(&env, args.show_secrets) {
                println!("{}", line);
            }
        }
    }

    Ok(())
}
