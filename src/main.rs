use clap::Parser;
use env_logger::Env;
use footprint::cli::Args;
use footprint::reporter;
use footprint::ui::ProbeProgress;
use footprint::{FootprintSearch, PlatformCatalog, ReqwestClient};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn display_banner(args: &Args) {
    println!();
    println!("    \x1b[38;5;51m┌─┐┌─┐┌─┐┌┬┐┌─┐┬─┐┬┌┐┌┌┬┐\x1b[0m");
    println!("    \x1b[38;5;45m├┤ │ ││ │ │ ├─┘├┬┘││││ │ \x1b[0m");
    println!("    \x1b[38;5;39m└  └─┘└─┘ ┴ ┴  ┴└─┴┘└┘ ┴ \x1b[0m");
    println!("    \x1b[3;38;5;147m\"See what the internet sees\"\x1b[0m");
    println!();

    let format_line = |label: &str, value: &str| {
        format!(
            "    \x1b[38;5;240m ◉ {:<10}\x1b[0m\x1b[38;5;145m{}\x1b[0m",
            label, value
        )
    };
    println!("{}", format_line("Version", env!("CARGO_PKG_VERSION")));
    println!("{}", format_line("Mode", if args.deep { "deep scan" } else { "standard" }));
    println!(
        "{}",
        format_line("Platform", &format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH))
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level()))
        .format_timestamp_millis()
        .init();

    let interactive = !args.quiet && !args.json;
    if interactive {
        display_banner(&args);
    }

    let query = args.to_query()?;
    let config = args.search_config();
    log::info!(
        "Footprint starting: {} query, deep scan {}, {} API keys configured",
        query.query_type(),
        args.deep,
        config.credentials.configured_services().len()
    );

    let catalog = match &args.catalog {
        Some(path) => PlatformCatalog::load(path)?,
        None => PlatformCatalog::builtin(),
    };
    let http = Arc::new(ReqwestClient::new()?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling search");
            interrupt.cancel();
        }
    });

    let mut search = FootprintSearch::new(http, catalog, config).with_cancellation(cancel);

    let progress_task = if interactive {
        let (tx, rx) = mpsc::channel(256);
        search = search.with_events(tx);
        let progress = ProbeProgress::new(false)?;
        Some(tokio::spawn(async move { progress.run(rx).await }))
    } else {
        None
    };

    let outcome = search.search(&query, args.deep).await;
    // Dropping the engine closes the event channel so the progress task ends
    drop(search);
    if let Some(task) = progress_task {
        if let Ok(stats) = task.await {
            log::debug!(
                "Probes: {} completed, {} found, {} failed, {} timed out",
                stats.completed,
                stats.found,
                stats.failed,
                stats.timed_out
            );
        }
    }

    let profile = outcome?;
    if args.json {
        println!("{}", profile.to_json_pretty()?);
    } else {
        reporter::print_summary(&profile);
    }

    if let Some(path) = &args.output {
        reporter::write_json_report(&profile, path)?;
        if !args.json {
            println!("\n📄 JSON report written to {}", path.display());
        }
    }

    Ok(())
}
