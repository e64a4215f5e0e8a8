//! sysmate — chat with your machine.

mod render;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use sysmate_core::bus::EventBus;
use sysmate_core::config::SysmateConfig;
use sysmate_core::error::SysmateError;
use sysmate_core::orchestrator::{Orchestrator, OrchestratorConfig};
use sysmate_core::provider::{LlmProvider, ProviderConfig};
use sysmate_hub::probe::{LinuxProbe, SystemProbe};
use sysmate_hub::providers::OpenAiProvider;
use sysmate_hub::report::FsReportStore;
use sysmate_hub::tools::build_registry;

#[derive(Parser)]
#[command(name = "sysmate", version, about = "AI assistant for system monitoring")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session (default)
    Chat(ModelArgs),

    /// Ask a single question and exit
    Ask {
        /// The question to ask
        message: String,

        #[command(flatten)]
        args: ModelArgs,
    },

    /// Show or edit the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print a quick system snapshot without the model
    Status,
}

#[derive(Args, Default)]
struct ModelArgs {
    /// Provider: gemini, openai, or ollama
    #[arg(long)]
    provider: Option<String>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// API key (falls back to config, then environment)
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL override
    #[arg(long)]
    api_base: Option<String>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SYSMATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Chat(ModelArgs::default())) {
        Command::Chat(args) => chat(args, None).await,
        Command::Ask { message, args } => chat(args, Some(message)).await,
        Command::Config { action } => config_cmd(action),
        Command::Status => status().await,
    }
}

// ─── Provider resolution ───────────────────────────────────

fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4o-mini",
        "ollama" => "llama3.2",
        _ => "gemini-2.0-flash",
    }
}

fn env_api_key(provider: &str) -> Option<String> {
    match provider {
        "gemini" => std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok(),
        "openai" => std::env::var("OPENAI_API_KEY").ok(),
        "ollama" => Some("ollama".to_string()),
        _ => None,
    }
}

/// Flags beat the saved config, which beats the environment.
fn resolve_provider(config: &SysmateConfig, args: &ModelArgs) -> anyhow::Result<OpenAiProvider> {
    let provider = args
        .provider
        .clone()
        .unwrap_or_else(|| config.provider.provider.clone());

    let model = args.model.clone().unwrap_or_else(|| {
        if args.provider.is_some() && args.provider.as_deref() != Some(&config.provider.provider) {
            default_model_for(&provider).to_string()
        } else {
            config.provider.model.clone()
        }
    });

    let api_key = args
        .api_key
        .clone()
        .or_else(|| config.provider.api_key.clone())
        .or_else(|| env_api_key(&provider));

    let Some(api_key) = api_key else {
        bail!(
            "no API key for provider '{}'. Pass --api-key, run `sysmate config set api_key <key>`, \
             or set {} in the environment",
            provider,
            match provider.as_str() {
                "openai" => "OPENAI_API_KEY",
                _ => "GEMINI_API_KEY",
            }
        );
    };

    let api_base = args
        .api_base
        .clone()
        .or_else(|| config.provider.api_base.clone())
        .or_else(|| match provider.as_str() {
            "gemini" => {
                Some("https://generativelanguage.googleapis.com/v1beta/openai".to_string())
            }
            "ollama" => Some("http://localhost:11434/v1".to_string()),
            _ => None,
        });

    Ok(OpenAiProvider::new(ProviderConfig {
        provider,
        model,
        api_key: Some(api_key),
        api_base,
        max_tokens: config.provider.max_tokens,
        temperature: config.provider.temperature,
    }))
}

fn build_orchestrator(config: &SysmateConfig) -> Orchestrator {
    let reports_dir = config
        .agent
        .reports_dir
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(FsReportStore::default_dir);

    let registry = build_registry(
        Arc::new(LinuxProbe::new()),
        Arc::new(FsReportStore::new(reports_dir)),
    );

    let mut orch_config = OrchestratorConfig {
        max_rounds: config.agent.max_rounds,
        history_cap: config.agent.history_cap,
        ..Default::default()
    };
    if let Some(prompt) = &config.agent.system_prompt {
        orch_config.system_prompt = prompt.clone();
    }

    Orchestrator::new(orch_config, Arc::new(registry))
}

// ─── Chat ──────────────────────────────────────────────────

async fn chat(args: ModelArgs, one_shot: Option<String>) -> anyhow::Result<()> {
    let config = SysmateConfig::load(&SysmateConfig::default_path())?;
    let provider = resolve_provider(&config, &args)?;
    tracing::debug!(
        "Resolved provider {} with model {}",
        provider.name(),
        provider.default_model()
    );
    let mut orchestrator = build_orchestrator(&config);
    let skin = render::make_skin();

    if let Some(message) = one_shot {
        return run_message(&mut orchestrator, &provider, &skin, &message).await;
    }

    banner(&provider, &orchestrator);

    let stdin = std::io::stdin();
    loop {
        print!("{} ", "you ❯".green().bold());
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" | "bye" | "q" => {
                println!("{}", "Bye! 👋".cyan());
                break;
            }
            "clear" => {
                orchestrator.clear_history();
                print!("\x1B[2J\x1B[1;1H");
                std::io::stdout().flush()?;
                println!("{}", "Conversation cleared.".dimmed());
            }
            "history" => render::print_history(orchestrator.history()),
            "tools" => {
                for name in orchestrator.registry().names() {
                    println!("  {} {}", "•".cyan(), name);
                }
            }
            "help" => help(),
            _ => {
                if let Err(e) = run_message(&mut orchestrator, &provider, &skin, line).await {
                    eprintln!("{} {}", "error:".red().bold(), e);
                }
            }
        }
    }

    Ok(())
}

async fn run_message(
    orchestrator: &mut Orchestrator,
    provider: &OpenAiProvider,
    skin: &termimad::MadSkin,
    message: &str,
) -> anyhow::Result<()> {
    let bus = EventBus::default();
    let mut rx = bus.subscribe();

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("🧠 Analyzing your question...");

    let spinner_feed = spinner.clone();
    let feeder = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Some(status) = event.format_status() {
                spinner_feed.set_message(status);
            }
        }
    });

    let result = orchestrator
        .send_message(provider, message, Some(&bus))
        .await;

    spinner.finish_and_clear();
    feeder.abort();

    match result {
        Ok(answer) => {
            render::print_answer(skin, &answer);
            Ok(())
        }
        Err(e) if e.is_transport() => {
            bail!("cannot reach the assistant right now: {e}. Your message was not lost; try again.")
        }
        Err(SysmateError::RoundLimit(n)) => {
            bail!("the assistant kept requesting tools past {n} rounds; giving up on this message")
        }
        Err(e) => Err(e).context("message failed"),
    }
}

fn banner(provider: &OpenAiProvider, orchestrator: &Orchestrator) {
    println!();
    println!("  {}", "🖥️  sysmate".cyan().bold());
    println!("  {}", "chat with your machine".dimmed());
    println!(
        "  {}",
        format!(
            "{} · {} · {} tools",
            provider.name(),
            provider.default_model(),
            orchestrator.registry().len()
        )
        .dimmed()
    );
    println!(
        "  {}",
        "type 'help' for commands, 'exit' to leave".dimmed()
    );
    println!();
}

fn help() {
    println!("  {}  show this help", "help   ".cyan());
    println!("  {}  list available tools", "tools  ".cyan());
    println!("  {}  show retained conversation turns", "history".cyan());
    println!("  {}  reset the conversation", "clear  ".cyan());
    println!("  {}  leave (also: quit, bye, q)", "exit   ".cyan());
}

// ─── Config ────────────────────────────────────────────────

fn config_cmd(action: ConfigAction) -> anyhow::Result<()> {
    let path = SysmateConfig::default_path();

    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = SysmateConfig::load(&path)?;
            println!("provider    = {}", config.provider.provider);
            println!("model       = {}", config.provider.model);
            println!(
                "api_key     = {}",
                if config.provider.api_key.is_some() {
                    "(set)"
                } else {
                    "(unset)"
                }
            );
            println!(
                "api_base    = {}",
                config.provider.api_base.as_deref().unwrap_or("(default)")
            );
            println!("max_rounds  = {}", config.agent.max_rounds);
            println!("history_cap = {}", config.agent.history_cap);
            println!(
                "reports_dir = {}",
                config.agent.reports_dir.as_deref().unwrap_or("reports")
            );
        }
        ConfigAction::Set { key, value } => {
            let mut config = SysmateConfig::load(&path)?;
            match key.as_str() {
                "provider" => config.provider.provider = value,
                "model" => config.provider.model = value,
                "api_key" => config.provider.api_key = Some(value),
                "api_base" => config.provider.api_base = Some(value),
                "max_rounds" => {
                    config.agent.max_rounds =
                        value.parse().context("max_rounds must be a number")?
                }
                "history_cap" => {
                    config.agent.history_cap =
                        value.parse().context("history_cap must be a number")?
                }
                "reports_dir" => config.agent.reports_dir = Some(value),
                "system_prompt" => config.agent.system_prompt = Some(value),
                other => bail!(
                    "unknown key '{}'. Valid keys: provider, model, api_key, api_base, \
                     max_rounds, history_cap, reports_dir, system_prompt",
                    other
                ),
            }
            config.save(&path)?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}

// ─── Status ────────────────────────────────────────────────

async fn status() -> anyhow::Result<()> {
    let probe = LinuxProbe::new();

    let info = probe.system_info().await?;
    let memory = probe.memory_usage().await?;
    let disks = probe.disk_usage().await.unwrap_or_default();

    println!();
    println!("  {}", "🖥️  system status".cyan().bold());
    println!(
        "  {}  {} ({}) on {}",
        "os:".dimmed(),
        info.os.distro,
        info.os.release,
        info.os.hostname
    );
    println!(
        "  {}  {} ({} cores)",
        "cpu:".dimmed(),
        info.cpu.brand,
        info.cpu.cores
    );
    println!(
        "  {}  {} used of {} ({})",
        "mem:".dimmed(),
        memory.used,
        memory.total,
        memory.usage_percent
    );
    for disk in &disks {
        println!(
            "  {} {} {} used of {} ({})",
            "disk:".dimmed(),
            disk.mount,
            disk.used,
            disk.size,
            disk.usage_percent
        );
    }
    println!("  {}  {}", "up:".dimmed(), info.uptime.formatted);
    println!();

    Ok(())
}
