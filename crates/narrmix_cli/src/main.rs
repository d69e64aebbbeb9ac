//! narrmix - run narration mix requests from the command line.
//!
//! ```text
//! narrmix mix --chunk-key intro.mp3 --chunk-key body.mp3 --bucket narration --music calm.mp3
//! narrmix mix --request event.json
//! narrmix config show
//! ```

mod cli;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use directories::ProjectDirs;

use narrmix_core::api::{self, parse_body, MixRequest};
use narrmix_core::config::ConfigManager;
use narrmix_core::engine::FfmpegEngine;
use narrmix_core::logging::{self, FanoutSink, JobLogger, LogLevel, LogSink, TracingSink};
use narrmix_core::models::new_job_id;
use narrmix_core::orchestrator::MixJob;
use narrmix_core::storage::FsObjectStore;

use cli::{Cli, Commands, ConfigAction, MixArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = match cli.config {
        Some(ref path) => path.clone(),
        None => default_config_path()?,
    };

    match cli.command {
        Commands::Config { ref action } => config_command(action, config_path),
        Commands::Mix(ref args) => mix_command(&cli, args, config_path),
    }
}

fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("dev", "narrmix", "narrmix")
        .ok_or_else(|| anyhow!("failed to resolve default config directory"))?;
    Ok(dirs.config_dir().join("narrmix.toml"))
}

fn config_command(action: &ConfigAction, config_path: PathBuf) -> Result<ExitCode> {
    let mut config = ConfigManager::new(config_path);
    match action {
        ConfigAction::Path => println!("{}", config.path().display()),
        ConfigAction::Init => {
            config
                .load_or_create()
                .with_context(|| format!("initialize {}", config.path().display()))?;
            println!("Config written to {}", config.path().display());
        }
        ConfigAction::Show => {
            if config.path().exists() {
                config
                    .load()
                    .with_context(|| format!("load {}", config.path().display()))?;
            }
            config.apply_env_overrides();
            print!("{}", config.render().context("render settings")?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn mix_command(cli: &Cli, args: &MixArgs, config_path: PathBuf) -> Result<ExitCode> {
    let mut config = ConfigManager::new(config_path);
    if config.path().exists() {
        config
            .load()
            .with_context(|| format!("load {}", config.path().display()))?;
    }
    config.apply_env_overrides();
    apply_overrides(&mut config, args);
    config.ensure_dirs_exist().context("create scratch and log directories")?;

    let settings = config.settings().clone();
    let level = match cli.verbose {
        0 => settings.logging.level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    let _guard = logging::init_tracing_with_file(level, &config.logs_folder());
    tracing::debug!(config = %config.path().display(), "narrmix {}", narrmix_core::version());

    let request = read_request(args)?;
    let job_id = new_job_id();

    let job_logger = if settings.logging.job_logs {
        let mut log_config = settings.logging.log_config();
        log_config.level = level;
        Some(Arc::new(
            JobLogger::new(&job_id, config.logs_folder(), log_config, None)
                .context("create job log")?,
        ))
    } else {
        None
    };
    let mut sink = FanoutSink::new().with_sink(Arc::new(TracingSink));
    if let Some(ref logger) = job_logger {
        sink = sink.with_sink(logger.clone() as Arc<dyn LogSink>);
    }

    let job = MixJob::new(
        settings.clone(),
        Arc::new(FfmpegEngine::from_settings(&settings.engine)),
        Arc::new(FsObjectStore::new(&settings.storage.root)),
        Arc::new(sink),
    );
    let response = api::respond(&job, &job_id, &request);

    if let Some(ref logger) = job_logger {
        if !response.is_success() {
            logger.show_tail("ffmpeg");
        }
        logger.flush();
    }

    let output = if args.envelope {
        response.to_envelope()
    } else {
        response.body.clone()
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn apply_overrides(config: &mut ConfigManager, args: &MixArgs) {
    let settings = config.settings_mut();
    if let Some(ref bucket) = args.output_bucket {
        settings.storage.output_bucket = bucket.clone();
    }
    if let Some(ref bucket) = args.music_bucket {
        settings.storage.music_bucket = Some(bucket.clone());
    }
    if let Some(ref root) = args.storage_root {
        settings.storage.root = root.to_string_lossy().into_owned();
    }
    if args.strict {
        settings.assembly.strict_chunks = true;
    }
}

/// The request from `--request`, or built from the field flags.
fn read_request(args: &MixArgs) -> Result<MixRequest> {
    match args.request.as_deref() {
        Some("-") => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("read request from stdin")?;
            Ok(parse_body(&raw))
        }
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("read request {}", path))?;
            Ok(parse_body(&raw))
        }
        None => {
            let mut request = MixRequest::new(
                args.chunk_keys.clone(),
                args.bucket.clone().unwrap_or_default(),
            );
            if let Some(ref music) = args.music {
                request = request.with_music(music.clone());
            }
            Ok(request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_request() {
        let args = MixArgs {
            chunk_keys: vec!["a.mp3".into()],
            bucket: Some("narr".into()),
            music: Some("calm.mp3".into()),
            ..MixArgs::default()
        };
        let request = read_request(&args).unwrap();
        let job = request.validate().unwrap();
        assert_eq!(job.bucket, "narr");
        assert_eq!(job.music.unwrap().key(), "calm.mp3");
    }

    #[test]
    fn missing_flags_fail_validation() {
        let request = read_request(&MixArgs::default()).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = ConfigManager::new("unused.toml");
        let args = MixArgs {
            output_bucket: Some("out".into()),
            music_bucket: Some("beds".into()),
            strict: true,
            ..MixArgs::default()
        };
        apply_overrides(&mut config, &args);
        let settings = config.settings();
        assert_eq!(settings.storage.output_bucket, "out");
        assert_eq!(settings.storage.effective_music_bucket(), "beds");
        assert!(settings.assembly.strict_chunks);
    }
}
