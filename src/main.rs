use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tunequeue::config::{self, DataPaths};
use tunequeue::console::{Console, ConsoleNotifier, PlayerFactory};
use tunequeue::duration::{self, format_duration, whole_seconds};
use tunequeue::store::JsonFileStore;
use tunequeue::target::CommandTarget;
use tunequeue::Player;

#[derive(Debug, Default)]
struct CliArgs {
    data_dir: Option<PathBuf>,
    user: Option<String>,
    estimate: Option<Vec<PathBuf>>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunequeue=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args(std::env::args().skip(1).collect())?;
    if let Some(paths) = &args.estimate {
        return run_estimate(paths);
    }

    let paths = match args.data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::from_env()?,
    };
    let settings = config::load_settings(&paths)?;
    let store = Arc::new(JsonFileStore::open(paths.clone())?);
    let runtime = tokio::runtime::Runtime::new().context("failed to start the timer runtime")?;
    let handle = runtime.handle().clone();

    let factory: PlayerFactory = Box::new(move || {
        Player::builder(store.clone())
            .target(Arc::new(CommandTarget::new(|line: &str| println!("{line}"))))
            .notifier(Arc::new(ConsoleNotifier))
            .settings(settings.clone())
            .runtime(handle.clone())
            .build()
    });
    let mut console = Console::new(factory, args.user.unwrap_or_else(|| String::from("player")))?;
    let snapshots = config::load_sessions(&paths)?;
    console.player().restore_sessions(&snapshots);
    info!(
        data_dir = %paths.root.display(),
        sessions = snapshots.len(),
        user = console.user(),
        "tunequeue ready"
    );

    let stdin = std::io::stdin();
    console.run(stdin.lock(), std::io::stdout())?;

    config::save_sessions(&paths, &console.player().snapshot_sessions())?;
    console.player().cancel_all_timers();
    runtime.shutdown_background();
    Ok(())
}

fn run_estimate(paths: &[PathBuf]) -> anyhow::Result<()> {
    for path in paths {
        if path.is_dir() {
            let scan = duration::scan_datapacks(path);
            for link in &scan.links {
                println!("{link}\t{}", estimate_label(scan.durations.get(link).copied()));
            }
        } else {
            println!("{}\t{}", path.display(), estimate_label(duration::estimate_zip(path)));
        }
    }
    Ok(())
}

fn estimate_label(seconds: Option<f64>) -> String {
    match seconds {
        Some(seconds) => format!("{seconds:.2}s ({})", format_duration(whole_seconds(Some(seconds)))),
        None => String::from("unknown"),
    }
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    if args.first().map(String::as_str) == Some("estimate") {
        let targets: Vec<PathBuf> = args[1..].iter().map(PathBuf::from).collect();
        if targets.is_empty() {
            anyhow::bail!("estimate requires at least one datapack or directory");
        }
        out.estimate = Some(targets);
        return Ok(out);
    }

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--data-dir" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--data-dir requires a directory");
                };
                out.data_dir = Some(Path::new(value.trim()).to_path_buf());
            }
            "--user" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--user requires a name");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--user cannot be empty");
                }
                out.user = Some(value.trim().to_string());
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("tunequeue");
    println!("  --data-dir DIR         Catalog, queues and settings (default ~/.config/tunequeue)");
    println!("  --user NAME            Acting user for console commands");
    println!("  estimate PATH...       Print estimated lengths of datapack zips or directories");
}
