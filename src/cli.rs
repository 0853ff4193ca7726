use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use atty::Stream;
use clap::{Parser, Subcommand};
use namegrid_rs::{
    DirectoryIndex, Entry, LetterGroup, ReqwestTransport, RetrievalPolicy, Telemetry, TextSource,
    ViewerConfig, parse_entries, render,
};
use serde_json::json;
use termimad::MadSkin;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "namegrid-rs", about = "Browse a remote list of names", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// JSON settings file; flags below override it.
    #[arg(long, global = true, env = "NAMEGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Location of the newline-separated list.
    #[arg(long, global = true, env = "NAMEGRID_URL")]
    url: Option<String>,

    /// Retrieval policy: `single` or `fallback`.
    #[arg(long, global = true)]
    policy: Option<RetrievalPolicy>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the list and report how it was retrieved.
    Fetch,
    /// Print entries grouped under their initial letter.
    Groups {
        /// Case-insensitive substring filter.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Print matching entries, one per line, in list order.
    List {
        /// Case-insensitive substring filter.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Serve the interactive directory page.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(&cli)?;
    debug!(url = %config.source_url, policy = %config.policy, "resolved configuration");

    match cli.command {
        Command::Fetch => handle_fetch(&config, cli.json),
        Command::Groups { ref search } => {
            handle_groups(&config, search.as_deref().unwrap_or(""), cli.json)
        }
        Command::List { ref search } => {
            handle_list(&config, search.as_deref().unwrap_or(""), cli.json)
        }
        #[cfg(feature = "web")]
        Command::Serve { addr } => handle_serve(config, addr),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<ViewerConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::from_path(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.source_url = url.clone();
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    Ok(config)
}

fn fetch_entries(
    config: &ViewerConfig,
    telemetry: &Telemetry,
) -> Result<Vec<Entry>, Box<dyn Error>> {
    let transport = ReqwestTransport::new(config.request_timeout())?;
    let source = TextSource::from_config(config, Arc::new(transport)).with_telemetry(telemetry.clone());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let text = runtime.block_on(source.resolve(&config.source_url))?;
    Ok(parse_entries(&text))
}

fn handle_fetch(config: &ViewerConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    let telemetry = Telemetry::new();
    let result = fetch_entries(config, &telemetry);
    let stats = telemetry.snapshot();

    if as_json {
        let payload = json!({
            "url": config.source_url,
            "policy": config.policy,
            "entries": result.as_ref().ok().map(Vec::len),
            "error": result.as_ref().err().map(|err| err.to_string()),
            "strategies": stats.strategies,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return result.map(|_| ());
    }

    let width = stats
        .strategies
        .iter()
        .map(|s| s.strategy.len())
        .max()
        .unwrap_or(0)
        .max("STRATEGY".len());
    println!("{:<width$}  {:>8}  {:>9}", "STRATEGY", "ATTEMPTS", "SUCCESSES");
    println!("{:-<width$}  {:->8}  {:->9}", "", "", "");
    for row in &stats.strategies {
        println!(
            "{:<width$}  {:>8}  {:>9}",
            row.strategy, row.attempts, row.successes
        );
    }
    let entries = result?;
    println!("\nLoaded {} entries from {}", entries.len(), config.source_url);
    Ok(())
}

fn handle_groups(config: &ViewerConfig, term: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let entries = fetch_entries(config, &Telemetry::new())?;
    let index = DirectoryIndex::new(entries);
    let view = index.view(term);
    let search_active = !term.is_empty();

    if as_json {
        let payload = json!({
            "search": term,
            "total": view.total,
            "groups": view.groups,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let labels = &config.labels;
    println!("{}\n", render::subtitle(search_active, labels));
    if view.groups.is_empty() {
        println!("{}", labels.empty);
        return Ok(());
    }
    let skin = stdout_is_tty().then(heading_skin);
    for group in &view.groups {
        print_group(group, skin.as_ref());
    }
    let counter = render::counter(search_active, view.total, labels);
    println!("{} {} {}", counter.label, counter.count, counter.noun);
    Ok(())
}

fn handle_list(config: &ViewerConfig, term: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let entries = fetch_entries(config, &Telemetry::new())?;
    let matches = namegrid_rs::filter(&entries, term);

    if as_json {
        let payload = json!({
            "search": term,
            "total": matches.len(),
            "results": matches,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    for entry in matches {
        println!("{entry}");
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(config: ViewerConfig, addr: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(namegrid_rs::web::serve(namegrid_rs::web::WebConfig {
        addr,
        viewer: config,
    }))?;
    Ok(())
}

fn print_group(group: &LetterGroup, skin: Option<&MadSkin>) {
    for line in group_lines(group, skin) {
        println!("{line}");
    }
}

// Only the heading goes through the skin; entry text is never read as markdown.
fn group_lines(group: &LetterGroup, skin: Option<&MadSkin>) -> Vec<String> {
    let heading = match skin {
        Some(skin) => skin.bold.apply_to(group.letter).to_string(),
        None => group.letter.to_string(),
    };
    let mut lines = Vec::with_capacity(group.names.len() + 2);
    lines.push(heading);
    lines.extend(group.names.iter().map(|name| format!("  {name}")));
    lines.push(String::new());
    lines
}

fn heading_skin() -> MadSkin {
    MadSkin::default()
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}
