use anyhow::Result;
use clap::Parser;
use enuma_install::cli::Invocation;
use enuma_install::color::{Colors, ERROR, INFO, SUCCESS, TIP, WARNING};
use enuma_install::config::ReleaseConfig;
use enuma_install::http::ReqwestClient;
use enuma_install::install::{TargetInputs, shadowed_by, system_mover};
use enuma_install::path::{PathOutcome, system_path_store};
use enuma_install::pipeline::{Pipeline, Report};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "enuma-install")]
#[command(about = "Install the latest enuma release for this machine")]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Install directory, followed by arguments for the installed binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let invocation = Invocation::from_args(cli.args);

    let config = match ReleaseConfig::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(None);
            eprintln!("{} {}", ERROR, Colors::error(&e.to_string()));
            return ExitCode::FAILURE;
        }
    };
    init_logging(Some(&config.env.debug));

    tokio::select! {
        code = run(config, invocation) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{} {}", WARNING, Colors::warning("Interrupted, temporary files removed"));
            ExitCode::from(130)
        }
    }
}

fn init_logging(debug_var: Option<&str>) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.format_timestamp(None);

    if debug_var.is_some_and(|name| std::env::var_os(name).is_some()) {
        builder.filter_level(log::LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(log::LevelFilter::Warn);
    }

    builder.init();
}

async fn run(config: ReleaseConfig, invocation: Invocation) -> ExitCode {
    match install(config, &invocation).await {
        Ok(report) => {
            print_report(&report);
            forward(&report, &invocation.forward);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", ERROR, Colors::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn install(config: ReleaseConfig, invocation: &Invocation) -> Result<Report> {
    let windows = cfg!(windows);
    let home = dirs::home_dir();

    let http = ReqwestClient::new(&config)?;
    let mover = system_mover();
    let path_store = system_path_store(windows, home.as_deref());
    let targets = TargetInputs::resolve(
        invocation.install_dir.as_deref(),
        &config,
        windows,
        home,
        |name| std::env::var(name).ok(),
    );

    let pipeline = Pipeline::new(config, &http, mover.as_ref(), path_store.as_ref(), targets);
    Ok(pipeline.run().await?)
}

fn print_report(report: &Report) {
    let file_name = report
        .installed
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    println!(
        "{} {} {} installed to {}",
        SUCCESS,
        Colors::info(file_name),
        Colors::version(report.version.as_str()),
        Colors::path(&report.installed.path)
    );
    println!("   {}", Colors::muted(&format!("sha256 {}", report.sha256)));
    if report.installed.elevated {
        println!("   {}", Colors::muted("placed with elevated privileges"));
    }

    let dir = report.target.dir.display().to_string();
    match &report.path {
        PathOutcome::AlreadyPresent => {}
        PathOutcome::Added { location } => {
            println!("{} Added {} to PATH in {}", INFO, Colors::success(&dir), location);
            println!(
                "{} {}",
                TIP,
                Colors::warning("Restart your shell/terminal to pick up the new PATH")
            );
        }
        PathOutcome::Failed(e) => {
            println!("{} {}", WARNING, Colors::warning(&e.to_string()));
            println!("{} Add {} to your PATH manually", TIP, Colors::info(&dir));
        }
    }

    if let Some(other) = shadowed_by(file_name, &report.installed.path) {
        println!(
            "{} {}",
            WARNING,
            Colors::warning(&format!(
                "{} resolves to {} first on the current PATH",
                file_name,
                other.display()
            ))
        );
    }
}

fn forward(report: &Report, args: &[String]) {
    if args.is_empty() {
        return;
    }

    match std::process::Command::new(&report.installed.path).args(args).status() {
        Ok(status) if !status.success() => {
            log::warn!("{} exited with {}", report.installed.path.display(), status);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!(
                "{} {}",
                WARNING,
                Colors::warning(&format!("Could not run {}: {}", report.installed.path.display(), e))
            );
        }
    }
}
