//! wasmboot - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wasmboot::{
    cli::{Args, Commands, Verbosity},
    config::Config,
    context::Environment,
    doctor::Doctor,
    host,
    logging,
    loader::InitStep,
    telemetry::TelemetryDisplay,
    BootOutcome, BootReport, BootstrapOrchestrator,
};

/// Exit code when every candidate failed and the fallback rendered
const EXIT_CODE_FALLBACK: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    let level = logging::effective_level(&config.logging.level, args.verbose, args.quiet);
    logging::init_logging(level, config.log_dir().as_deref()).context("Failed to start logging")?;

    match &args.command {
        Commands::Run { url, output, json } => {
            run_bootstrap(&args, &config, url, output.as_deref(), *json).await?;
        }
        Commands::Doctor { url } => {
            run_doctor(&args, &config, url).await?;
        }
        Commands::Candidates { url } => {
            list_candidates(&args, &config, url).await?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    logging::flush();
    Ok(())
}

/// Fetch the page, with a spinner unless quiet
async fn connect(args: &Args, config: &Config, url: &str) -> Result<Environment> {
    let spinner = if args.verbosity().show_progress() {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Fetching {}", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let env = host::connect(url, Duration::from_secs(config.probe.timeout_sec)).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    env.with_context(|| format!("Failed to load page {}", url))
}

async fn run_bootstrap(
    args: &Args,
    config: &Config,
    url: &str,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let env = connect(args, config, url).await?;
    let document = env.document.clone();
    let orchestrator = BootstrapOrchestrator::new(env, config);

    let report = orchestrator.run().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.verbosity());
        TelemetryDisplay::new(orchestrator.telemetry().clone(), args.verbosity()).display_summary();
    }

    if let BootOutcome::FallbackRendered { .. } = report.outcome {
        if let Some(path) = output {
            let mount = document
                .mount_point(&config.page.mount_id)
                .context("Mount point disappeared after render")?;
            std::fs::write(path, mount.to_html())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if args.verbosity().show_progress() {
                println!("Fallback HTML written to {}", path.display());
            }
        }
        logging::flush();
        std::process::exit(EXIT_CODE_FALLBACK);
    }

    Ok(())
}

fn print_report(report: &BootReport, verbosity: Verbosity) {
    if verbosity.show_events() {
        for (candidate, rejection) in &report.attempts {
            match rejection {
                Some(reason) => println!("  {} {} ({})", "✗".red(), candidate, reason),
                None => println!("  {} {}", "✓".green(), candidate),
            }
        }
    }

    match &report.outcome {
        BootOutcome::NoMountPoint => {
            println!("{}", "No mount point in page; nothing to bootstrap.".yellow());
        }
        BootOutcome::Accepted { candidate, init } => {
            println!("{} WASM loaded from {}", "✓".green(), candidate.to_string().bold());
            describe_step("default initializer", &init.default_init);
            describe_step("start", &init.start);
        }
        BootOutcome::FallbackRendered { .. } => {
            println!(
                "{} No candidate loaded ({} tried); fallback UI rendered.",
                "✗".red(),
                report.attempts.len()
            );
        }
    }
}

fn describe_step(name: &str, step: &InitStep) {
    match step {
        InitStep::Absent => {}
        InitStep::Succeeded => println!("  {}: ok", name),
        InitStep::RecoveredWithBinaryPath(path) => {
            println!("  {}: ok after retry with {}", name, path)
        }
        InitStep::Failed => println!("  {}: {}", name, "failed (ignored)".yellow()),
    }
}

async fn run_doctor(args: &Args, config: &Config, url: &str) -> Result<()> {
    let client = Arc::new(
        host::HttpClient::new(url, Duration::from_secs(config.probe.timeout_sec))
            .context("Invalid page URL")?,
    );
    let html = client
        .fetch_page()
        .await
        .with_context(|| format!("Failed to load page {}", url))?;
    let document = host::HtmlDocument::parse(client.page_url().as_str(), &html);

    let doctor = Doctor::new(Arc::new(document), client, config.clone());
    let checks = doctor.run_diagnostics().await;

    if args.verbosity().show_progress() {
        Doctor::display_results(&checks);
    }

    logging::flush();
    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

async fn list_candidates(args: &Args, config: &Config, url: &str) -> Result<()> {
    let env = connect(args, config, url).await?;
    let orchestrator = BootstrapOrchestrator::new(env, config);
    let candidates = orchestrator.candidate_list();

    for (index, candidate) in candidates.iter().enumerate() {
        let origin = if candidates.is_hinted(index) { "hint" } else { "default" };
        println!("{:>2}. {} ({})", index + 1, candidate, origin.dimmed());
    }

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!("\n{}\n", "wasmboot Configuration".bold());

    match &args.config {
        Some(path) => println!("Source: {}", path.display()),
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => println!("Source: {}", path.display()),
            None => println!("Source: built-in defaults"),
        },
    }
    println!();

    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", rendered);

    Ok(())
}
