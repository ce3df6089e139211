use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use markreport::config::DEFAULT_OUTPUT;
use markreport::summary::render_summary;
use markreport::{generate_report, ReportConfig, Renderer};

#[derive(Parser, Debug)]
#[command(name = "markreport", version, about = "Analyse class exam scores and write a Word report")]
struct Cli {
    /// Score spreadsheet (.xlsx, .xls, .ods). Asked for interactively when omitted.
    input: Option<PathBuf>,

    /// Report document to write.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// JSON configuration file (thresholds, score bands, chart settings).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the statistics as JSON instead of the text summary.
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    let input = match &cli.input {
        Some(p) => p.clone(),
        None => prompt_for_input()?,
    };

    let renderer = Renderer::new(config.charts.clone());
    let outcome = generate_report(&input, &cli.output, &config, &renderer)?;

    // keep stdout clean for --json
    let status = match &outcome.saved {
        Ok(()) => format!("Report saved to {}", cli.output.to_string_lossy()),
        Err(e) => format!("failed to save report: {:#}", e),
    };
    if cli.json || outcome.saved.is_err() {
        eprintln!("{}", status);
    } else {
        println!("{}", status);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome.statistics)
            .context("failed to serialize statistics")?;
        println!("{}", json);
    } else {
        print!("\n{}", render_summary(&outcome.statistics));
    }
    Ok(())
}

fn prompt_for_input() -> anyhow::Result<PathBuf> {
    // stdout is reserved for the report summary or JSON
    let mut stderr = io::stderr();
    write!(stderr, "Score spreadsheet path: ")?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read the spreadsheet path")?;
    let path = line.trim().trim_matches('"');
    if path.is_empty() {
        bail!("no spreadsheet path given");
    }
    Ok(PathBuf::from(path))
}
