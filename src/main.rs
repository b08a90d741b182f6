use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ghosttype::config::TypingConfig;
use ghosttype::settings::{load_typing_delays, save_typing_delays, JsonFileStore};
use ghosttype::sim::{simulate_typing, SimOptions};
use ghosttype::typo::DEFAULT_TYPO_BUDGET;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ghosttype")]
#[command(about = "Human-like auto-typing into a focused text field", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type the input into an in-memory field on a virtual clock and report.
    Simulate {
        /// Text file to type, or '-' for stdin.
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = ghosttype::config::DEFAULT_MIN_TYPING_DELAY_MS)]
        min_delay: u64,

        #[arg(long, default_value_t = ghosttype::config::DEFAULT_MAX_TYPING_DELAY_MS)]
        max_delay: u64,

        #[arg(long, default_value_t = DEFAULT_TYPO_BUDGET)]
        typo_budget: usize,

        /// Target a content-editable region instead of a textarea.
        #[arg(long)]
        rich: bool,

        /// Print the full report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Type the input into this terminal in real time. Ctrl+C resets.
    #[cfg(feature = "runtime")]
    Play {
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Seconds to wait before typing starts.
        #[arg(long, default_value_t = 5)]
        countdown: u64,

        /// JSON settings file holding the typing delays.
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show or update the persisted typing delays.
    Settings {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        #[arg(long)]
        min_delay: Option<u64>,

        #[arg(long)]
        max_delay: Option<u64>,
    },
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn seed_or_entropy(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

#[cfg(feature = "runtime")]
fn play(input: &PathBuf, countdown: u64, settings: Option<&PathBuf>, seed: Option<u64>) -> Result<()> {
    use std::rc::Rc;
    use std::time::Duration;

    use ghosttype::host::PageHost;
    use ghosttype::model::{Command as TypingCommand, TypingState};
    use ghosttype::page::ElementRef;
    use ghosttype::settings::{MemoryStore, SettingsStore};
    use ghosttype::terminal::TerminalField;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run<S: SettingsStore>(
        text: &str,
        config: TypingConfig,
        settings: S,
        seed: u64,
    ) -> Result<TypingState> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        ctrlc::set_handler(move || {
            let _ = tx.send(TypingCommand::Reset);
        })
        .context("failed to install Ctrl+C handler")?;

        let mut host = PageHost::new(config, StdRng::seed_from_u64(seed), settings);
        let field: ElementRef = Rc::new(TerminalField::new(io::stdout()));
        host.focus(Some(field));
        host.show_result(text);
        host.click_type();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("failed to start tokio runtime")?;
        Ok(runtime.block_on(ghosttype::runtime::drive(&mut host, rx)))
    }

    let text = read_input(input)?;
    let config = TypingConfig {
        countdown: Duration::from_secs(countdown),
        ..Default::default()
    };
    config.validate()?;

    if countdown > 0 {
        eprintln!("Starting in {countdown}s... (Ctrl+C to cancel)");
    }

    let seed = seed_or_entropy(seed);
    let state = match settings {
        Some(path) => run(&text, config, JsonFileStore::open(path)?, seed)?,
        None => run(&text, config, MemoryStore::new(), seed)?,
    };

    eprintln!();
    eprintln!("Finished: {state:?}");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ghosttype=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            input,
            seed,
            min_delay,
            max_delay,
            typo_budget,
            rich,
            json,
        } => {
            let text = read_input(&input)?;
            let options = SimOptions {
                seed: seed_or_entropy(seed),
                config: TypingConfig {
                    min_delay_ms: min_delay,
                    max_delay_ms: max_delay,
                    typo_budget,
                    ..Default::default()
                },
                rich,
                ..Default::default()
            };

            let report = simulate_typing(&text, &options)?;
            eprintln!(
                "Simulated: {} edits, {} typos, ~{:.1} s, final state {:?}, text {}",
                report.edits,
                report.typos,
                (report.elapsed_ms as f64) / 1000.0,
                report.final_state,
                if report.matches(&text) { "matches" } else { "differs" }
            );

            if json {
                let json =
                    serde_json::to_string_pretty(&report).context("failed to serialize report")?;
                println!("{json}");
            }
        }
        #[cfg(feature = "runtime")]
        Command::Play {
            input,
            countdown,
            settings,
            seed,
        } => play(&input, countdown, settings.as_ref(), seed)?,
        Command::Settings {
            file,
            min_delay,
            max_delay,
        } => {
            let mut store = JsonFileStore::open(&file)?;
            save_typing_delays(&mut store, min_delay, max_delay)?;
            let delays = load_typing_delays(&store);
            eprintln!("Settings: {}", store.path().display());
            println!(
                "minTypingDelay = {} ms\nmaxTypingDelay = {} ms",
                delays.min_ms(),
                delays.max_ms()
            );
        }
    }

    Ok(())
}
