//! Install command

use std::sync::Arc;

use binpkg_core::Reporter;
use binpkg_core::config::FetchConfig;
use binpkg_core::io::install::InstallOptions;
use tokio_util::sync::CancellationToken;

use crate::InstallArgs;
use crate::ops::{Context, InstallError, InstallRequest, install_package};
use crate::ui::ConsoleReporter;

/// Install the binary `args.manifest` provides for `args.arch`.
pub async fn install(
    args: &InstallArgs,
    quiet: bool,
    cancel: CancellationToken,
) -> Result<(), InstallError> {
    let config = resolve_config(args, |key| std::env::var(key).ok())?;
    tracing::debug!("Fetch policy: {config:?}");

    let client = reqwest::Client::builder()
        .user_agent(crate::USER_AGENT)
        .build()
        .map_err(|e| InstallError::Other(format!("Failed to build HTTP client: {e}")))?;
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(quiet));
    let ctx = Context::new(client, config, reporter, cancel);

    let request = InstallRequest {
        manifest: args.manifest.clone(),
        arch: args.arch.clone(),
        dest: args.dest.clone(),
        options: InstallOptions {
            executable: args.executable,
        },
    };
    install_package(&ctx, &request).await?;
    Ok(())
}

/// Layer config sources: file, then environment, then flags.
fn resolve_config(
    args: &InstallArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<FetchConfig, InstallError> {
    let mut config = FetchConfig::discover(args.config.as_deref())?.with_env_overrides(env)?;
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(timeout) = args.timeout_seconds {
        config.timeout_seconds = timeout;
    }
    Ok(config.validate()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use binpkg_core::config::{ConfigError, ENV_RETRIES, ENV_TIMEOUT_SECONDS};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(config: PathBuf) -> InstallArgs {
        InstallArgs {
            manifest: PathBuf::from("mpfr.toml"),
            arch: None,
            dest: PathBuf::from("out"),
            config: Some(config),
            retries: None,
            timeout_seconds: None,
            executable: false,
        }
    }

    fn env(key: &str) -> Option<String> {
        match key {
            k if k == ENV_RETRIES => Some("7".to_string()),
            k if k == ENV_TIMEOUT_SECONDS => Some("45".to_string()),
            _ => None,
        }
    }

    #[test]
    fn flags_beat_env_beat_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "retries = 1\ntimeout_seconds = 5\nbackoff_ms = 10\n").unwrap();

        let from_env = resolve_config(&args(path.clone()), env).unwrap();
        assert_eq!(from_env.retries, 7);
        assert_eq!(from_env.timeout_seconds, 45);
        assert_eq!(from_env.backoff_ms, 10);

        let mut with_flags = args(path);
        with_flags.retries = Some(0);
        with_flags.timeout_seconds = Some(2);
        let config = resolve_config(&with_flags, env).unwrap();
        assert_eq!(config.retries, 0);
        assert_eq!(config.timeout_seconds, 2);
    }

    #[test]
    fn bad_config_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "retry = 1\n").unwrap();

        let err = resolve_config(&args(path), |_| None).unwrap_err();
        assert!(matches!(err, InstallError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn zero_timeout_is_rejected_unless_overridden() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_seconds = 0\n").unwrap();

        let err = resolve_config(&args(path.clone()), |_| None).unwrap_err();
        assert!(matches!(err, InstallError::Config(ConfigError::InvalidValue { .. })));
        assert_eq!(err.exit_code(), 1);

        let mut with_flag = args(path.clone());
        with_flag.timeout_seconds = Some(5);
        assert_eq!(resolve_config(&with_flag, |_| None).unwrap().timeout_seconds, 5);

        std::fs::write(&path, "timeout_seconds = 5\n").unwrap();
        let mut zero_flag = args(path);
        zero_flag.timeout_seconds = Some(0);
        assert!(resolve_config(&zero_flag, |_| None).is_err());
    }
}
