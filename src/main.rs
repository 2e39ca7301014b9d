use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use enact::config as cfg;
use enact::config::TemplateKind;
use enact::driver::{WindowDriver, WindowInfo, WindowQuery, XcapWindows};
use enact::engine::{RunContext, Runner, run_with_interrupt};
use enact::error::EngineError;

/// Enact CLI
#[derive(Debug, Parser)]
#[command(
    name = enact::PKG_NAME,
    version = enact::PKG_VERSION,
    about = "Declarative GUI automation: scripted clicks, keys, waits and control flow"
)]
struct Cli {
    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Execute a script against the desktop
    Run {
        /// Path to the JSON script
        #[arg(short = 'c', long = "config")]
        config: PathBuf,

        /// Path to a recorded coordinates file
        #[arg(long = "coordinates")]
        coordinates: Option<PathBuf>,

        /// Bind the run to the first window whose title or app matches
        #[arg(short = 'w', long = "window", conflicts_with = "window_id")]
        window: Option<String>,

        /// Bind the run to a window by id (see `windows`)
        #[arg(long = "window-id")]
        window_id: Option<u32>,

        /// Log actions instead of injecting input
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /// List the windows visible to the automation backend
    Windows,

    /// Generate a starter script from a recorded coordinates file
    Generate {
        /// Path to the recorded coordinates file
        #[arg(long = "coordinates")]
        coordinates: PathBuf,

        /// Where to write the generated script
        #[arg(short = 'o', long = "output", default_value = "generated_script.json")]
        output: PathBuf,

        /// Script shape to generate
        #[arg(short = 't', long = "template", value_enum, default_value = "basic")]
        template: TemplateArg,
    },

    /// Print the JSON Schema for scripts and exit
    Schema,
}

/// Script shapes `generate` can produce.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TemplateArg {
    /// One click per recorded point
    Basic,
    /// The clicks wrapped in a bounded loop
    Loop,
    /// A condition gate to fill in
    Conditional,
}

impl From<TemplateArg> for TemplateKind {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Basic => TemplateKind::Basic,
            TemplateArg::Loop => TemplateKind::Loop,
            TemplateArg::Conditional => TemplateKind::Conditional,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    enact::init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Run {
            config,
            coordinates,
            window,
            window_id,
            dry_run,
        } => run(config, coordinates, window, window_id, dry_run).await,
        Commands::Windows => list_windows(),
        Commands::Generate {
            coordinates,
            output,
            template,
        } => generate(&coordinates, &output, template.into()),
        Commands::Schema => {
            cfg::write_schema_to_writer(std::io::stdout().lock())?;
            println!();
            Ok(())
        }
    }
}

async fn run(
    config: PathBuf,
    coordinates: Option<PathBuf>,
    window: Option<String>,
    window_id: Option<u32>,
    dry_run: bool,
) -> anyhow::Result<()> {
    info!(
        version = enact::PKG_VERSION,
        script = %config.display(),
        dry_run,
        "Starting Enact"
    );

    let script = cfg::load_script_async(&config).await?;

    let namespace = match &coordinates {
        Some(path) => {
            let doc = cfg::load_coordinates_async(path).await?;
            info!(
                points = doc.recorded_points.len(),
                file = %path.display(),
                "coordinates loaded"
            );
            doc.into_namespace()
        }
        None => cfg::Namespace::new(),
    };

    let bound = bind_window(window.as_deref(), window_id)?;

    let ctx = RunContext::new(&script.settings, CancellationToken::new())
        .with_window(bound)
        .with_coordinates(namespace);

    match run_with_interrupt(move || Runner::with_real_drivers(dry_run), script, ctx).await {
        Ok(summary) => {
            if summary.cancelled {
                warn!(executed = summary.executed, "run cancelled");
            } else if summary.budget_exhausted {
                warn!(executed = summary.executed, "run stopped at the time budget");
            } else {
                info!(executed = summary.executed, "run complete");
            }
            Ok(())
        }
        Err(EngineError::ExitRequested { code, message }) => {
            info!(code, "{message}");
            process::exit(code);
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolve the window a run is bound to. Without a selector the run
/// addresses the full display.
fn bind_window(title: Option<&str>, id: Option<u32>) -> anyhow::Result<Option<WindowInfo>> {
    let query = match (title, id) {
        (_, Some(id)) => WindowQuery::Id(id),
        (Some(title), None) => WindowQuery::Title(title),
        (None, None) => return Ok(None),
    };

    let mut windows = XcapWindows::new();
    let Some(info) = windows.find(&query)? else {
        bail!("No window matches {query:?}; see `enact windows` for candidates");
    };

    info!(
        id = info.id,
        app = %info.app_name,
        title = %info.title,
        x = info.x,
        y = info.y,
        "bound to window"
    );
    if !windows.activate(&info).unwrap_or(false) {
        warn!("Could not bring the window to the foreground; continuing anyway");
    }
    Ok(Some(info))
}

fn list_windows() -> anyhow::Result<()> {
    let windows = XcapWindows::new().list()?;
    if windows.is_empty() {
        println!("No windows visible to the capture backend.");
        return Ok(());
    }

    println!(
        "{:<8} {:<24} {:<44} {:>12} {:>10}",
        "ID", "APP", "TITLE", "POSITION", "SIZE"
    );
    for w in &windows {
        println!(
            "{:<8} {:<24} {:<44} {:>12} {:>10}",
            w.id,
            truncate(&w.app_name, 24),
            truncate(&w.title, 44),
            format!("{},{}", w.x, w.y),
            format!("{}x{}", w.width, w.height),
        );
    }
    println!("\n{} window(s).", windows.len());
    Ok(())
}

/// Cap a cell to `max` characters, char-boundary safe for non-ASCII titles.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn generate(coordinates: &Path, output: &Path, kind: TemplateKind) -> anyhow::Result<()> {
    let doc = cfg::load_coordinates(coordinates)?;
    if doc.recorded_points.is_empty() {
        warn!(
            file = %coordinates.display(),
            "no recorded points; generating an empty skeleton"
        );
    }

    let script = cfg::Script::template(kind, &doc);
    let json = serde_json::to_string_pretty(&script)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        points = doc.recorded_points.len(),
        output = %output.display(),
        "script generated"
    );
    println!("Generated {} from {}.", output.display(), coordinates.display());
    println!("Review the actions, then run:");
    match &doc.window_name {
        Some(name) => println!(
            "  enact run --config {} --coordinates {} --window \"{name}\"",
            output.display(),
            coordinates.display()
        ),
        None => println!(
            "  enact run --config {} --coordinates {}",
            output.display(),
            coordinates.display()
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_caps_long_cells_and_keeps_short_ones() {
        assert_eq!(truncate("Terminal", 24), "Terminal");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("abcdefgh", 8), "abcdefgh");
    }

    #[test]
    fn truncate_cuts_multibyte_titles_on_char_boundaries() {
        let title = "日本語のウィンドウタイトルが長い場合";
        let cell = truncate(title, 10);
        assert_eq!(cell.chars().count(), 10);
        assert!(cell.ends_with("..."));
        assert_eq!(truncate("éèêë", 4), "éèêë");
    }
}
