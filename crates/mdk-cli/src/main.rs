use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use uuid::Uuid;

use mdk_audit::{verify_chain, TransitionLog, VerifyResult};
use mdk_config::{report_unused_keys, LoadedConfig, UnusedKeyPolicy};
use mdk_promotion::{
    criteria_from_config, format_criteria_report, format_criteria_summary, run_gate,
    run_promotion, AutoApprove,
    GateOutcome, GateRequest, Metrics, ProductionCriteria, PromoteOutcome,
};
use mdk_registry::{FileRegistry, ModelRegistry};

mod approval;
use approval::StdinApprovalGate;

/// Registry file fallback when --registry is not given.
pub const ENV_REGISTRY_PATH: &str = "MDK_REGISTRY_PATH";
/// Transition log fallback when --transition-log is not given.
pub const ENV_TRANSITION_LOG_PATH: &str = "MDK_TRANSITION_LOG_PATH";

#[derive(Parser)]
#[command(name = "mdk")]
#[command(about = "ModelDesk model-promotion CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a run's metrics and register it with a lifecycle alias.
    Gate {
        /// Registered model name
        #[arg(long)]
        name: String,

        /// Evaluation run id (UUID). Generated when omitted.
        #[arg(long)]
        run_id: Option<String>,

        /// Serving provider (e.g. openai)
        #[arg(long)]
        provider: String,

        /// Provider-side model id (e.g. gpt-4o-mini)
        #[arg(long)]
        model: String,

        /// Path to a JSON file mapping metric name -> value
        #[arg(long)]
        metrics: String,

        /// Register even when criteria fail (no alias is assigned)
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Criteria config paths in merge order (defaults apply when omitted)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Registry JSON path (env MDK_REGISTRY_PATH, default registry.json)
        #[arg(long)]
        registry: Option<String>,
    },

    /// Promote the current challenger to champion, with approval.
    Promote {
        /// Registered model name
        #[arg(long)]
        name: String,

        /// Skip the interactive prompt and approve.
        #[arg(long, default_value_t = false)]
        auto_approve: bool,

        /// Interactive approval timeout. On expiry the promotion is rejected.
        #[arg(long, default_value_t = 120)]
        approval_timeout_secs: u64,

        /// Registry JSON path (env MDK_REGISTRY_PATH, default registry.json)
        #[arg(long)]
        registry: Option<String>,

        /// Transition log path (env MDK_TRANSITION_LOG_PATH, default transitions.jsonl)
        #[arg(long)]
        transition_log: Option<String>,
    },

    /// List every registered version of a model.
    Versions {
        /// Registered model name
        #[arg(long)]
        name: String,

        /// Registry JSON path (env MDK_REGISTRY_PATH, default registry.json)
        #[arg(long)]
        registry: Option<String>,
    },

    /// Print the effective production criteria, or a run's pass/fail report.
    Criteria {
        /// Criteria config paths in merge order (defaults apply when omitted)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Optional JSON metrics file; when given, each metric is reported
        /// against its threshold with the overall verdict.
        #[arg(long)]
        metrics: Option<String>,
    },

    /// Compute layered config hash + print canonical JSON.
    ConfigHash {
        /// Paths in merge order (base first, overlays after)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Registry maintenance commands.
    Registry {
        #[command(subcommand)]
        cmd: RegistryCmd,
    },

    /// Transition log utilities.
    Log {
        #[command(subcommand)]
        cmd: LogCmd,
    },
}

#[derive(Subcommand)]
enum RegistryCmd {
    /// Delete every version and alias of a model. Guardrail: requires --yes.
    Purge {
        /// Registered model name
        #[arg(long)]
        name: String,

        /// Acknowledge the deletion is irreversible.
        #[arg(long, default_value_t = false)]
        yes: bool,

        /// Registry JSON path (env MDK_REGISTRY_PATH, default registry.json)
        #[arg(long)]
        registry: Option<String>,
    },
}

#[derive(Subcommand)]
enum LogCmd {
    /// Verify the hash chain of a transition log.
    Verify {
        /// Transition log path
        path: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Gate {
            name,
            run_id,
            provider,
            model,
            metrics,
            force,
            config_paths,
            registry,
        } => {
            let run_id = match run_id {
                Some(raw) => Uuid::parse_str(&raw).context("invalid run_id uuid")?,
                None => Uuid::new_v4(),
            };
            let metrics = load_metrics(&metrics)?;
            let (criteria, loaded) = load_criteria(&config_paths)?;

            let mut reg = FileRegistry::open(resolve_registry_path(registry))?;
            let req = GateRequest {
                model_name: name,
                run_id,
                provider,
                model,
                metrics,
                force,
            };
            let outcome = run_gate(&mut reg, &criteria, &req)?;

            println!("run_id={}", run_id);
            if let Some(loaded) = &loaded {
                println!("config_hash={}", loaded.config_hash);
            }
            match outcome {
                GateOutcome::Rejected { reason } => {
                    anyhow::bail!("GATE_REJECTED: {reason}");
                }
                GateOutcome::DuplicateRejected { existing } => {
                    anyhow::bail!(
                        "GATE_REJECTED_DUPLICATE: metrics identical to existing version {} \
                        (category_accuracy={})",
                        existing.version,
                        existing.tag_str("category_accuracy")
                    );
                }
                GateOutcome::Registered {
                    version,
                    alias,
                    forced,
                } => {
                    println!("registered=true version={}", version);
                    println!("alias={}", alias.map(|a| a.as_str()).unwrap_or("none"));
                    println!("forced={}", forced);
                }
            }
        }

        Commands::Promote {
            name,
            auto_approve,
            approval_timeout_secs,
            registry,
            transition_log,
        } => {
            let mut reg = FileRegistry::open(resolve_registry_path(registry))?;
            let mut log = TransitionLog::open(resolve_transition_log_path(transition_log))?;

            let outcome = if auto_approve {
                run_promotion(&mut reg, &name, &AutoApprove, &mut log)?
            } else {
                let gate = StdinApprovalGate::new(approval_timeout_secs);
                run_promotion(&mut reg, &name, &gate, &mut log)?
            };

            match outcome {
                PromoteOutcome::NoChallenger => {
                    println!("promoted=false decision=no_challenger");
                }
                PromoteOutcome::Cancelled => {
                    println!("promoted=false decision=cancelled");
                }
                PromoteOutcome::Promoted {
                    new_champion,
                    defeated,
                } => {
                    println!("promoted=true new_champion={}", new_champion);
                    println!(
                        "defeated={}",
                        defeated.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
                    );
                    println!("transition_log={}", log.path().display());
                }
            }
        }

        Commands::Versions { name, registry } => {
            let reg = FileRegistry::open(resolve_registry_path(registry))?;
            let versions = reg.search_versions(&name)?;
            println!("model_name={} versions={}", name, versions.len());
            for entry in versions {
                let aliases: Vec<&str> = entry.aliases.iter().map(|a| a.as_str()).collect();
                println!(
                    "version={} aliases={} accuracy={} f1={} provider={} model={} created_at_utc={}",
                    entry.version,
                    if aliases.is_empty() {
                        "none".to_string()
                    } else {
                        aliases.join(",")
                    },
                    entry.tag_str("category_accuracy"),
                    entry.tag_str("category_f1"),
                    entry.tag_str("provider"),
                    entry.tag_str("model"),
                    entry.created_at_utc.to_rfc3339(),
                );
            }
        }

        Commands::Criteria {
            config_paths,
            metrics,
        } => {
            let (criteria, loaded) = load_criteria(&config_paths)?;
            if let Some(loaded) = &loaded {
                println!("config_hash={}", loaded.config_hash);
            }
            match metrics {
                Some(path) => {
                    let metrics = load_metrics(&path)?;
                    print!("{}", format_criteria_report(&criteria, &metrics));
                }
                None => print!("{}", format_criteria_summary(&criteria)),
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = mdk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Registry { cmd } => match cmd {
            RegistryCmd::Purge {
                name,
                yes,
                registry,
            } => {
                if !yes {
                    anyhow::bail!(
                        "REFUSING PURGE: this deletes every version and alias of '{}'. \
                        Re-run with: `mdk registry purge --name {} --yes`",
                        name,
                        name
                    );
                }
                let mut reg = FileRegistry::open(resolve_registry_path(registry))?;
                let removed = reg.delete_model(&name)?;
                println!("purged=true model_name={} deleted_versions={}", name, removed);
            }
        },

        Commands::Log { cmd } => match cmd {
            LogCmd::Verify { path } => match verify_chain(&path)? {
                VerifyResult::Valid { lines } => {
                    println!("chain_valid=true lines={}", lines);
                }
                VerifyResult::Broken { line, reason } => {
                    anyhow::bail!("CHAIN_BROKEN at line {}: {}", line, reason);
                }
            },
        },
    }

    Ok(())
}

fn resolve_registry_path(cli_value: Option<String>) -> String {
    cli_value
        .or_else(|| std::env::var(ENV_REGISTRY_PATH).ok())
        .unwrap_or_else(|| "registry.json".to_string())
}

fn resolve_transition_log_path(cli_value: Option<String>) -> String {
    cli_value
        .or_else(|| std::env::var(ENV_TRANSITION_LOG_PATH).ok())
        .unwrap_or_else(|| "transitions.jsonl".to_string())
}

fn load_metrics(path: &str) -> Result<Metrics> {
    let raw = fs::read_to_string(path).with_context(|| format!("read metrics file: {path}"))?;
    let metrics: Metrics =
        serde_json::from_str(&raw).context("metrics file must map metric name -> number")?;
    Ok(metrics)
}

/// Criteria from layered config, or pure defaults when no paths are given.
/// Unused config keys are reported as warnings, never ignored silently.
fn load_criteria(config_paths: &[String]) -> Result<(ProductionCriteria, Option<LoadedConfig>)> {
    if config_paths.is_empty() {
        return Ok((ProductionCriteria::default(), None));
    }
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = mdk_config::load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        tracing::warn!(pointer = %pointer, "unused config key");
    }

    let criteria = criteria_from_config(&loaded.config_json);
    Ok((criteria, Some(loaded)))
}
