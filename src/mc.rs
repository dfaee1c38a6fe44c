//! `mc` transport
//!
//! Drives the MinIO Client CLI instead of the S3 SDK: register an alias,
//! create the bucket with `--ignore-existing`, then `mc mirror --overwrite`
//! (plus `--remove` when remote-only objects should go). `mc` does the walk
//! and the diff itself, so no per-file counts come back.

use std::process::{ExitStatus, Stdio};

use chrono::Utc;
use tokio::process::Command;

use crate::config::{DeployConfig, Transport};
use crate::deploy::{check_source, DeployReport};
use crate::error::{DeployError, Result};

/// Default executable name
pub const MC_PROGRAM: &str = "mc";

/// Thin wrapper around the `mc` executable
#[derive(Debug, Clone)]
pub struct McClient {
    program: String,
}

impl Default for McClient {
    fn default() -> Self {
        Self::new(MC_PROGRAM)
    }
}

impl McClient {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Fail with [`DeployError::Tool`] unless `mc --version` runs cleanly
    pub async fn check_available(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(DeployError::Tool(format!(
                "MinIO Client '{}' not found in PATH. Install it or add it to PATH: \
                 https://min.io/docs/minio/linux/reference/minio-mc.html",
                self.program
            ))),
        }
    }

    /// Run `mc` with inherited stdio, failing on a non-zero exit
    async fn run(&self, args: &[String]) -> Result<()> {
        let subcommand = self.log_subcommand(args);

        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|e| self.start_error(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(self.exit_error(subcommand, status, ""))
        }
    }

    /// Like [`McClient::run`], but stderr is captured, echoed, and carried in
    /// the error so callers can inspect the server's reply
    async fn run_captured(&self, args: &[String]) -> Result<()> {
        let subcommand = self.log_subcommand(args);

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.start_error(e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            eprint!("{}", stderr);
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(self.exit_error(subcommand, output.status, stderr.trim()))
        }
    }

    fn log_subcommand<'a>(&self, args: &'a [String]) -> &'a str {
        // Never log the full argument list: `alias set` carries credentials
        let subcommand = args.first().map_or("", String::as_str);
        tracing::debug!("Running {} {}", self.program, subcommand);
        subcommand
    }

    fn start_error(&self, e: std::io::Error) -> DeployError {
        DeployError::Tool(format!("failed to start {}: {}", self.program, e))
    }

    fn exit_error(&self, subcommand: &str, status: ExitStatus, detail: &str) -> DeployError {
        let code = status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let mut message = format!("{} {} exited with code {}", self.program, subcommand, code);
        if !detail.is_empty() {
            message.push_str(": ");
            message.push_str(detail);
        }
        DeployError::Tool(message)
    }
}

/// `mc alias set <alias> <url> <access> <secret>`
pub fn alias_set_args(config: &DeployConfig) -> Vec<String> {
    vec![
        "alias".into(),
        "set".into(),
        config.alias.clone(),
        config.endpoint.clone(),
        config.access_key.clone(),
        config.secret_key.clone(),
    ]
}

/// `mc mb --ignore-existing [--region R] <alias>/<bucket>`
pub fn make_bucket_args(config: &DeployConfig) -> Vec<String> {
    let mut args = vec!["mb".to_string(), "--ignore-existing".to_string()];
    if let Some(region) = &config.region {
        args.push("--region".into());
        args.push(region.clone());
    }
    args.push(format!("{}/{}", config.alias, config.bucket));
    args
}

/// `mc mirror --overwrite [--remove] [--dry-run] <source> <target>`
pub fn mirror_args(config: &DeployConfig, dry_run: bool) -> Vec<String> {
    let mut args = vec!["mirror".to_string(), "--overwrite".to_string()];
    if config.remove_extra {
        args.push("--remove".into());
    }
    if dry_run {
        args.push("--dry-run".into());
    }
    args.push(config.source_dir.to_string_lossy().into_owned());
    args.push(target(config));
    args
}

/// `<alias>/<bucket>[/<prefix>]`
pub fn target(config: &DeployConfig) -> String {
    format!("{}/{}", config.alias, config.destination())
}

/// Deploy through the `mc` executable
pub async fn deploy(config: &DeployConfig, dry_run: bool) -> Result<DeployReport> {
    deploy_with(&McClient::default(), config, dry_run).await
}

/// Deploy through `client`; the source directory is checked before `mc` runs
pub async fn deploy_with(
    client: &McClient,
    config: &DeployConfig,
    dry_run: bool,
) -> Result<DeployReport> {
    check_source(config)?;
    client.check_available().await?;
    let started_at = Utc::now();

    tracing::info!("Configuring alias '{}' -> {}", config.alias, config.endpoint);
    client.run(&alias_set_args(config)).await?;

    if dry_run {
        tracing::info!("[dry-run] skipping bucket creation for '{}'", config.bucket);
    } else {
        tracing::info!("Creating bucket if needed: {}", config.bucket);
        client.run_captured(&make_bucket_args(config)).await.map_err(|e| {
            crate::sync::provision::provisioning_error(&config.bucket, &config.endpoint, e)
        })?;
    }

    tracing::info!(
        "Mirroring '{}' -> '{}'",
        config.source_dir.display(),
        target(config)
    );
    client.run(&mirror_args(config, dry_run)).await?;
    tracing::info!("Deploy completed successfully");

    Ok(DeployReport {
        transport: Transport::Mc,
        endpoint: config.endpoint.clone(),
        bucket: config.bucket.clone(),
        prefix: config.prefix.clone(),
        bucket_created: None,
        started_at,
        completed_at: Utc::now(),
        mirror: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use pretty_assertions::assert_eq;

    fn config(prefix: &str, remove_extra: bool, region: Option<&str>) -> DeployConfig {
        Settings {
            endpoint: Some("http://localhost:9000".into()),
            access_key: Some("key".into()),
            secret_key: Some("secret".into()),
            bucket: Some("site".into()),
            prefix: Some(prefix.into()),
            region: region.map(String::from),
            remove_extra: Some(if remove_extra { "1" } else { "" }.into()),
            source_dir: Some("dist".into()),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_alias_args() {
        assert_eq!(
            alias_set_args(&config("", false, None)),
            strings(&["alias", "set", "minio", "http://localhost:9000", "key", "secret"])
        );
    }

    #[test]
    fn test_make_bucket_args() {
        assert_eq!(
            make_bucket_args(&config("", false, None)),
            strings(&["mb", "--ignore-existing", "minio/site"])
        );
        assert_eq!(
            make_bucket_args(&config("", false, Some("eu-west-1"))),
            strings(&["mb", "--ignore-existing", "--region", "eu-west-1", "minio/site"])
        );
    }

    #[test]
    fn test_mirror_args() {
        assert_eq!(
            mirror_args(&config("", false, None), false),
            strings(&["mirror", "--overwrite", "dist", "minio/site"])
        );
        assert_eq!(
            mirror_args(&config("/widgets/info/", true, None), true),
            strings(&[
                "mirror",
                "--overwrite",
                "--remove",
                "--dry-run",
                "dist",
                "minio/site/widgets/info"
            ])
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_error() {
        let client = McClient::new("mc-definitely-not-installed-here");
        let err = client.check_available().await.unwrap_err();
        assert!(matches!(err, DeployError::Tool(_)));
        assert_eq!(err.exit_code(), 6);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_tool_error() {
        let err = McClient::new("false")
            .run(&strings(&["mirror"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with code 1"));

        McClient::new("true").run(&strings(&["mirror"])).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_make_bucket_failure_keeps_server_reply() {
        let script = "echo 'S3 API Request made to Console port. S3 Requests should be sent to API port.' >&2; exit 1";
        let err = McClient::new("sh")
            .run_captured(&strings(&["-c", script]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("made to Console port"));

        let err = crate::sync::provision::provisioning_error("site", "http://localhost:9000", err);
        match err {
            DeployError::Provisioning { message, hint, .. } => {
                assert!(message.contains("exited with code 1"));
                assert!(hint.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
