//! Interactive demo of the permission flow against a simulated Android host
//!
//! ```bash
//! permflow --api-level 30 --log-format compact
//! RUST_LOG=permflow=debug permflow --audit-log ./flow.jsonl
//! ```

mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use permflow::audit::{AuditSink, FileAuditSink, NullAuditSink};
use permflow::flow::{FlowStep, PermissionFlowController};
use permflow::simulated::SimulatedHost;
use permflow::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
use permflow::{FlowConfig, FlowKind, PermissionId, PlatformVersion};

/// Walk through the runtime-permission flow from a terminal
#[derive(Debug, Parser)]
#[command(name = "permflow", version)]
struct Args {
    /// Simulated Android API level
    #[arg(long, env = "PERMFLOW_API_LEVEL")]
    api_level: Option<u32>,

    /// Package identifier used for settings navigation
    #[arg(long)]
    package: Option<String>,

    /// JSON config file (defaults to <config dir>/permflow/config.json if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value = "compact")]
    log_format: TracingFormat,

    /// Append flow events to this JSON Lines file
    #[arg(long)]
    audit_log: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<FlowConfig> {
    let path = args.config.clone().or_else(|| {
        dirs::config_dir()
            .map(|dir| dir.join("permflow").join("config.json"))
            .filter(|path| path.exists())
    });

    let mut config = match path {
        Some(path) => FlowConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => FlowConfig::default(),
    };

    if let Some(level) = args.api_level {
        config = config.with_platform(PlatformVersion::new(level));
    }
    if let Some(package) = &args.package {
        config = config.with_package(package.clone());
    }
    Ok(config)
}

fn audit_sink(args: &Args) -> Result<Arc<dyn AuditSink>> {
    let sink: Arc<dyn AuditSink> = match &args.audit_log {
        Some(path) => Arc::new(
            FileAuditSink::new(path)
                .with_context(|| format!("opening audit log {}", path.display()))?,
        ),
        None => Arc::new(NullAuditSink),
    };
    Ok(sink)
}

/// Drive one flow until it settles, answering dialogs from the terminal
async fn run_flow(controller: &PermissionFlowController, kind: FlowKind) -> Result<()> {
    let mut step = controller.request(kind).await?;
    loop {
        step = match step {
            FlowStep::Satisfied(notice) => {
                terminal::show_notice(notice.text(&controller.config().messages));
                return Ok(());
            }
            FlowStep::ShowRationale(dialog) => {
                if terminal::ask_rationale(&dialog)? {
                    controller.on_rationale_confirm().await?
                } else {
                    controller.on_rationale_cancel()
                }
            }
            FlowStep::ShowSettings(dialog) => {
                if terminal::ask_settings(&dialog)? {
                    controller.on_settings_confirm()?
                } else {
                    controller.on_settings_cancel()
                }
            }
            FlowStep::SettingsOpened => {
                println!("(opened app settings; use `grant <NAME>` to flip a permission on)");
                return Ok(());
            }
            FlowStep::Dismissed | FlowStep::Busy | FlowStep::NoPendingDialog => return Ok(()),
        };
    }
}

fn print_status(host: &SimulatedHost, controller: &PermissionFlowController) {
    let mut all = controller.permissions_for(FlowKind::Multiple);
    for id in &controller.permissions_for(FlowKind::Single) {
        all.insert(id.clone());
    }
    for id in &all {
        let state = host.permission(id);
        println!(
            "  {:<24} granted={:<5} denials={} permanent={}",
            id.short_name(),
            state.granted,
            state.denials,
            state.permanently_denied
        );
    }
}

/// `camera` and `android.permission.CAMERA` both name the camera permission
fn parse_permission(name: &str) -> PermissionId {
    let short = name.rsplit('.').next().unwrap_or(name);
    PermissionId::new(format!("android.permission.{}", short.to_uppercase()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_subscriber_with_config(TracingConfig {
        format: args.log_format,
        ..Default::default()
    });

    let config = load_config(&args)?;
    let host = Arc::new(SimulatedHost::with_responder(terminal::TerminalResponder));
    let audit = audit_sink(&args)?;

    let controller = PermissionFlowController::builder()
        .with_host(Arc::clone(&host))
        .audit(audit)
        .config(config)
        .build()?;

    if !terminal::is_interactive() {
        tracing::warn!("Not attached to a terminal, dialogs will read answers from piped input");
    }

    println!(
        "permflow demo ({}, package {})",
        controller.config().platform,
        controller.config().package
    );

    loop {
        println!("[1] request camera  [2] request camera + storage  [status]  [grant NAME]  [revoke NAME]  [q]uit");
        let Some(line) = terminal::read_answer("> ")? else {
            break;
        };
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("1"), _) => run_flow(&controller, FlowKind::Single).await?,
            (Some("2"), _) => run_flow(&controller, FlowKind::Multiple).await?,
            (Some("status"), _) => print_status(&host, &controller),
            (Some("grant"), Some(name)) => host.grant_in_settings(parse_permission(name)),
            (Some("revoke"), Some(name)) => host.revoke(parse_permission(name)),
            (Some("q" | "quit"), _) => break,
            (None, _) => {}
            _ => println!("unrecognized command"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permission() {
        assert_eq!(parse_permission("camera").as_str(), "android.permission.CAMERA");
        assert_eq!(
            parse_permission("android.permission.read_media_video").as_str(),
            "android.permission.READ_MEDIA_VIDEO"
        );
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from([
            "permflow",
            "--api-level",
            "30",
            "--package",
            "org.example.scan",
            "--config",
            "/nonexistent/permflow.json",
        ]);
        assert!(load_config(&args).is_err());

        let args = Args::parse_from(["permflow", "--api-level", "30", "--package", "org.example.scan"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.platform, PlatformVersion::new(30));
        assert_eq!(config.package, "org.example.scan");
        assert_eq!(args.log_format, TracingFormat::Compact);
    }
}
