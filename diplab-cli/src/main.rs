//! DipLab CLI — run a single configuration or sweep a parameter grid.
//!
//! Commands:
//! - `run` — first grid combination from a TOML request file, summary to
//!   stdout, result JSON and trades CSV to the output directory
//! - `sweep` — full parameter grid, one line per variation plus the best

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use diplab_core::data::{load_snapshot, BarSource, CsvSource, MarketSnapshot, SyntheticSource};
use diplab_runner::{
    write_trades_csv, GridSearch, RunRequest, RunResult, SweepOutcome,
};

#[derive(Parser)]
#[command(name = "diplab", about = "DipLab CLI — dip-buying backtest engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the first grid combination as a single configuration.
    Run {
        /// Path to a TOML run request.
        #[arg(long)]
        config: PathBuf,

        /// Directory of SYMBOL.csv bar files. Omit to use synthetic bars.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Seed for the synthetic bar source.
        #[arg(long, default_value_t = 7)]
        seed: u64,

        /// Output directory for result JSON and trades CSV.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep the full parameter grid from a TOML request file.
    Sweep {
        /// Path to a TOML run request.
        #[arg(long)]
        config: PathBuf,

        /// Directory of SYMBOL.csv bar files. Omit to use synthetic bars.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Seed for the synthetic bar source.
        #[arg(long, default_value_t = 7)]
        seed: u64,

        /// Output directory for the sweep JSON.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Run variations sequentially instead of across all cores.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data_dir,
            seed,
            output_dir,
        } => cmd_run(&config, data_dir.as_deref(), seed, &output_dir),
        Commands::Sweep {
            config,
            data_dir,
            seed,
            output_dir,
            sequential,
        } => cmd_sweep(&config, data_dir.as_deref(), seed, &output_dir, sequential),
    }
}

fn cmd_run(
    config_path: &Path,
    data_dir: Option<&Path>,
    seed: u64,
    output_dir: &Path,
) -> Result<()> {
    let request = load_request(config_path)?;
    let sim = request.to_sim_config();
    let snapshot = load_market_data(&request, data_dir, seed)?;

    let result = diplab_runner::run_single_backtest(&sim, &snapshot, &[], 0);
    print_result(&result);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let run_id = request.run_id();
    let stem = &run_id[..16];

    let json_path = output_dir.join(format!("{stem}.json"));
    fs::write(&json_path, serde_json::to_string_pretty(&result)?)?;
    let csv_path = output_dir.join(format!("{stem}_trades.csv"));
    write_trades_csv(&csv_path, &result.trades)?;

    println!("\nWrote {} and {}", json_path.display(), csv_path.display());
    Ok(())
}

fn cmd_sweep(
    config_path: &Path,
    data_dir: Option<&Path>,
    seed: u64,
    output_dir: &Path,
    sequential: bool,
) -> Result<()> {
    let request = load_request(config_path)?;
    let sim = request.to_sim_config();
    let snapshot = load_market_data(&request, data_dir, seed)?;

    println!(
        "Sweeping {} combinations over {} symbols...",
        request.grid.size(),
        request.symbols.len()
    );

    let outcome = GridSearch::new(request.grid.clone())
        .with_parallelism(!sequential)
        .sweep_with_progress(&sim, &snapshot, &[], |index, total, result| {
            let p = &result.params;
            println!(
                "  [{}/{}] dip={:.3} tp={:.3} hold={} sl={:.3} size={:.2} -> sharpe {:.2} ({} trades)",
                index + 1,
                total,
                p.dip_threshold,
                p.take_profit,
                p.hold_days,
                p.stop_loss,
                p.position_size,
                result.sharpe(),
                result.trades.len(),
            );
        })?;

    print_best(&outcome);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let run_id = request.run_id();
    let stem = &run_id[..16];
    let json_path = output_dir.join(format!("{stem}_sweep.json"));
    fs::write(&json_path, serde_json::to_string_pretty(&outcome)?)?;
    println!("\nWrote {}", json_path.display());
    Ok(())
}

fn load_request(path: &Path) -> Result<RunRequest> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let request: RunRequest =
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    if request.symbols.is_empty() {
        bail!("run request has no symbols");
    }
    if request.end_date < request.start_date {
        bail!("end_date precedes start_date");
    }
    Ok(request)
}

fn load_market_data(
    request: &RunRequest,
    data_dir: Option<&Path>,
    seed: u64,
) -> Result<MarketSnapshot> {
    let source: Box<dyn BarSource> = match data_dir {
        Some(dir) => Box::new(CsvSource::new(dir)),
        None => Box::new(SyntheticSource::new(seed)),
    };
    let sim = request.to_sim_config();
    let snapshot = load_snapshot(
        source.as_ref(),
        &request.symbols,
        sim.start,
        sim.end,
        request.interval,
        request.intraday_exit,
    )
    .with_context(|| format!("loading bars from {}", source.name()))?;
    Ok(snapshot)
}

fn print_result(result: &RunResult) {
    if let Some(error) = &result.error {
        println!("Run produced no result: {error}");
        return;
    }
    let m = &result.metrics;
    println!("Backtest summary");
    println!("  trades:            {}", m.total_trades);
    println!(
        "  wins / losses:     {} / {}",
        m.winning_trades, m.losing_trades
    );
    println!("  win rate:          {:.1}%", m.win_rate);
    println!("  total return:      {:.2}%", m.total_return);
    println!("  total pnl:         ${:.2}", m.total_pnl);
    println!("  annualized return: {:.2}%", m.annualized_return);
    println!("  max drawdown:      {:.2}%", m.max_drawdown);
    println!("  sharpe ratio:      {:.2}", m.sharpe_ratio);
}

fn print_best(outcome: &SweepOutcome) {
    match outcome.best() {
        Some(best) => {
            let p = &best.params;
            println!(
                "\nBest variation #{}: dip={:.3} tp={:.3} hold={} sl={:.3} size={:.2}",
                best.variation_index,
                p.dip_threshold,
                p.take_profit,
                p.hold_days,
                p.stop_loss,
                p.position_size,
            );
            print_result(best);
        }
        None => println!("\nNo variations were run."),
    }
}
