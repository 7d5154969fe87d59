//! Quorum CLI - Command-line interface for the AI-backend gateway

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quorum_core::{
    AnalysisRequest, GatewayConfig, Orchestrator, Platform, ProviderKind, SimulatedProvider,
};
use quorum_firewall::{get_security_recommendations, SecurityGate};

#[derive(Parser)]
#[command(name = "quorum")]
#[command(about = "Quorum - Redundant AI analysis behind budgets and an input firewall")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Check configuration validity
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "config/quorum.toml")]
        config: PathBuf,
    },
    /// Run content through the Security Gate only
    Scan {
        /// Target platform (linkedin, twitter, blog, email)
        #[arg(short, long, default_value = "linkedin")]
        platform: Platform,
        /// Content to inspect
        content: String,
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a full analysis against simulated providers
    Analyze {
        /// Target platform (linkedin, twitter, blog, email)
        #[arg(short, long, default_value = "linkedin")]
        platform: Platform,
        /// Actor the request is budgeted against
        #[arg(short, long, default_value = "cli")]
        actor: String,
        /// Number of times to submit the request
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,
        /// Content to analyze
        content: String,
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show the budget applied to each platform
    Limits {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Parses and validates a TOML gateway configuration.
fn load_config_from_str(content: &str, source: &str) -> anyhow::Result<GatewayConfig> {
    let config: GatewayConfig =
        toml::from_str(content).with_context(|| format!("failed to parse {}", source))?;
    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", source))?;
    Ok(config)
}

fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    load_config_from_str(&content, &path.display().to_string())
}

/// Loads `path` if given, otherwise the built-in defaults.
fn load_config_or_default(path: Option<&Path>) -> anyhow::Result<GatewayConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(GatewayConfig::default()),
    }
}

/// One simulated backend per known family.
fn demo_gateway(config: GatewayConfig) -> anyhow::Result<Orchestrator> {
    let gateway = Orchestrator::new(config)?;
    let providers = [
        ("openai", ProviderKind::OpenAi, 0.000_03),
        ("anthropic", ProviderKind::Anthropic, 0.000_025),
        ("gemini", ProviderKind::Gemini, 0.000_01),
        ("mistral", ProviderKind::Mistral, 0.000_008),
    ];
    for (name, kind, price) in providers {
        gateway.register_provider(Arc::new(
            SimulatedProvider::new(name, kind).with_cost_per_token(price),
        ));
    }
    Ok(gateway)
}

async fn run_analyze(
    config: GatewayConfig,
    platform: Platform,
    actor: String,
    repeat: u32,
    content: String,
) -> anyhow::Result<()> {
    let gateway = demo_gateway(config)?;
    gateway.start_background_tasks();

    let mut failure = None;
    for attempt in 1..=repeat.max(1) {
        let request = AnalysisRequest::new(actor.as_str(), platform, content.as_str());
        match gateway.analyze(request).await {
            Ok(result) => {
                info!(attempt, score = result.consensus.score, "analysis succeeded");
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            Err(e) => {
                eprintln!("[{}] {}", e.status_code(), e);
                failure = Some(e);
                break;
            }
        }
    }

    if let Some(usage) = gateway.current_usage(&actor)? {
        eprintln!("usage for {}: {}", actor, serde_json::to_string(&usage)?);
    }
    gateway.shutdown().await;

    if let Some(e) = failure {
        bail!("request rejected with status {}", e.status_code());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Check { config }) => {
            let loaded = load_config(&config)?;
            println!(
                "Config OK: {} platform budgets, {} minimum lengths, health TTL {}s",
                loaded.limiter.platforms.len(),
                loaded.firewall.min_lengths.len(),
                loaded.council.health_ttl_secs
            );
        }
        Some(Commands::Scan {
            platform,
            content,
            config,
        }) => {
            let loaded = load_config_or_default(config.as_deref())?;
            let gate = SecurityGate::with_config(loaded.firewall)?;
            let verdict = gate.check_input_security(&content, platform.as_str());
            let report = serde_json::json!({
                "verdict": verdict,
                "reason": verdict.reason_message(),
                "recommendations": get_security_recommendations(&verdict),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(Commands::Analyze {
            platform,
            actor,
            repeat,
            content,
            config,
        }) => {
            let loaded = load_config_or_default(config.as_deref())?;
            run_analyze(loaded, platform, actor, repeat, content).await?;
        }
        Some(Commands::Limits { config }) => {
            let loaded = load_config_or_default(config.as_deref())?;
            let gateway = Orchestrator::new(loaded)?;
            for platform in Platform::ALL {
                let limits = gateway.platform_config(platform.as_str());
                println!("{:<9} {}", platform, serde_json::to_string(&limits)?);
            }
        }
        None => {
            println!("Quorum v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            [firewall]
            block_trolls = true
            reason_policy = "severity_precedence"

            [limiter.platforms.twitter]
            requests_per_minute = 5
            requests_per_hour = 50
            requests_per_day = 100
            max_cost_per_day = 1.0
            max_tokens_per_request = 1000
            concurrent_requests = 1

            [council]
            health_ttl_secs = 10
        "#;
        let config = load_config_from_str(toml, "inline").unwrap();
        assert!(config.firewall.block_trolls);
        assert_eq!(config.limiter.platforms["twitter"].requests_per_minute, 5);
        assert_eq!(config.limiter.platforms["blog"].max_tokens_per_request, 8000);
        assert_eq!(config.limiter.platforms["blog"].concurrent_requests, 2);
        assert_eq!(config.firewall.min_length_for("blog"), 50);
        assert_eq!(config.council.health_ttl_secs, 10);
        assert_eq!(config.council.max_insights, 5);
        assert!(config.global.sanitize_input);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let toml = r#"
            [council]
            max_hashtags = 0
        "#;
        let err = load_config_from_str(toml, "inline").unwrap_err();
        assert!(err.to_string().contains("invalid configuration in inline"));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = load_config_from_str("[firewall", "broken.toml").unwrap_err();
        assert!(err.to_string().contains("failed to parse broken.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[global]\naudit_logging = false").unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(!config.global.audit_logging);
        assert!(load_config(Path::new("/nonexistent/quorum.toml")).is_err());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = include_str!("../../../config/quorum.toml");
        let config = load_config_from_str(shipped, "config/quorum.toml").unwrap();
        let defaults = GatewayConfig::default();

        assert_eq!(config.limiter.platforms, defaults.limiter.platforms);
        assert_eq!(config.firewall.min_lengths, defaults.firewall.min_lengths);
        assert_eq!(config.council.health_ttl_secs, defaults.council.health_ttl_secs);
    }

    #[test]
    fn test_cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "quorum", "analyze", "--platform", "twitter", "--repeat", "3", "Hello world post",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Analyze {
                platform, repeat, ..
            }) => {
                assert_eq!(platform, Platform::Twitter);
                assert_eq!(repeat, 3);
            }
            _ => panic!("expected analyze"),
        }
    }
}
