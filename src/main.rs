//! CLI entry point for `quotechain`.

use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use quotechain::batch::{self, BatchItem};
use quotechain::config::Config;
use quotechain::model::thread::Thread;
use quotechain::parser::header::decode_raw_bytes;
use quotechain::parser::mime::decode_mime_body_with;

/// Recover readable text and reply history from raw email.
#[derive(Parser)]
#[command(name = "quotechain", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decoded plain-text body of a message
    Decode {
        /// Raw message (.eml), or `-` for stdin
        path: PathBuf,
    },
    /// Print the reconstructed reply chain of a message, oldest first
    Thread {
        /// Raw message (.eml), or `-` for stdin
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Strip chat-service markup from a message body
    Chat {
        /// Text file, or `-` for stdin
        path: PathBuf,
    },
    /// Decode every .eml file in a directory
    Batch {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Write it to the config file location
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = quotechain::config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Decode { path } => cmd_decode(&path, &config),
        Commands::Thread { path, json } => cmd_thread(&path, json, &config),
        Commands::Chat { path } => cmd_chat(&path),
        Commands::Batch { dir, json } => cmd_batch(&dir, json, &config),
        Commands::Config { init } => cmd_config(init, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = quotechain::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "quotechain.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Read a file (or stdin for `-`) as text, tolerating non-UTF-8 bytes.
fn read_input(path: &Path) -> anyhow::Result<String> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
        std::fs::read(path)?
    };
    Ok(decode_raw_bytes(&bytes))
}

fn cmd_decode(path: &Path, config: &Config) -> anyhow::Result<()> {
    let raw = read_input(path)?;
    println!("{}", decode_mime_body_with(&raw, &config.decoder));
    Ok(())
}

fn cmd_thread(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let raw = read_input(path)?;
    let thread = quotechain::thread::assemble_thread(&raw, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&thread)?);
    } else {
        print_thread(&thread);
    }
    Ok(())
}

fn cmd_chat(path: &Path) -> anyhow::Result<()> {
    let text = read_input(path)?;
    println!("{}", quotechain::clean_chat_markup(&text));
    Ok(())
}

/// Decode a directory of .eml files with a progress bar.
fn cmd_batch(dir: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Decoding [{bar:40.cyan/blue}] {pos}/{len} files")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let items = batch::decode_directory(
        dir,
        config,
        Some(&|done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }),
    )?;
    pb.finish_and_clear();

    if json {
        print_batch_json(&items)?;
    } else {
        print_batch_table(&items, start.elapsed());
    }
    Ok(())
}

/// Print the effective configuration, optionally saving it.
fn cmd_config(init: bool, config: &Config) -> anyhow::Result<()> {
    if init {
        quotechain::config::save_config(config)?;
        if let Some(path) = quotechain::config::config_file_path() {
            eprintln!("Wrote {}", path.display());
        }
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "quotechain", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print a thread oldest first, one block per message.
fn print_thread(thread: &Thread) {
    if !thread.envelope.subject.is_empty() {
        println!("  {:<10} {}", "Subject", thread.envelope.subject);
        println!("  {}", "-".repeat(60));
    }

    for (i, msg) in thread.messages.iter().enumerate() {
        let when = msg
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| msg.date_str.clone());
        let marker = if msg.is_latest { " (latest)" } else { "" };
        println!();
        println!("  #{} {} <{}>{}", i + 1, msg.sender, msg.email_address, marker);
        println!("  {when}");
        println!();
        for line in msg.body.lines() {
            println!("    {line}");
        }
    }
    println!();
}

/// Print batch results as a human-readable table.
fn print_batch_table(items: &[BatchItem], elapsed: std::time::Duration) {
    use humansize::{format_size, BINARY};

    println!();
    println!(
        "  {:<40} {:>8} {:>9}  {}",
        "File", "Size", "Messages", "Subject"
    );
    println!("  {}", "-".repeat(90));

    let mut total_bytes = 0u64;
    let mut failed = 0usize;
    for item in items {
        let name = item
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name_trunc: String = name.chars().take(39).collect();
        let size = std::fs::metadata(&item.path).map(|m| m.len()).unwrap_or(0);
        total_bytes += size;

        match &item.result {
            Ok(thread) => {
                let subj_trunc: String = thread.envelope.subject.chars().take(40).collect();
                println!(
                    "  {:<40} {:>8} {:>9}  {}",
                    name_trunc,
                    format_size(size, BINARY),
                    thread.messages.len(),
                    subj_trunc
                );
            }
            Err(e) => {
                failed += 1;
                println!("  {:<40} {:>8} {:>9}  {}", name_trunc, "-", "-", e);
            }
        }
    }

    println!();
    println!("  {:<20} {}", "Files", items.len());
    println!("  {:<20} {}", "Failed", failed);
    println!("  {:<20} {}", "Total size", format_size(total_bytes, BINARY));
    println!("  {:<20} {:.2?}", "Decoding time", elapsed);
    println!();
}

/// Print batch results as JSON.
fn print_batch_json(items: &[BatchItem]) -> anyhow::Result<()> {
    let results: Vec<serde_json::Value> = items
        .iter()
        .map(|item| match &item.result {
            Ok(thread) => serde_json::json!({
                "path": item.path.display().to_string(),
                "thread": thread,
            }),
            Err(e) => serde_json::json!({
                "path": item.path.display().to_string(),
                "error": e.to_string(),
            }),
        })
        .collect();

    let output = serde_json::json!({
        "file_count": items.len(),
        "results": results,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
