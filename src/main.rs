//! Paulownia CLI - agro-forestry scheme simulator.
//!
//! Runs a scenario through growth, processing, end-of-life and economics,
//! and writes the yearly results table.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

use paulownia::export::{export_run, load_scenario, save_scenario, TableOptions};
use paulownia::pipeline::{Pipeline, SimulationResult, StageId};
use paulownia::scenario::Scenario;
use paulownia::sensitivity::{compare, one_way, SensitivityParameter};

/// Deterministic agro-forestry scheme simulator.
#[derive(Parser)]
#[command(name = "paulownia")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a preset scenario document to disk.
    Init {
        /// Preset to start from.
        #[arg(short, long, default_value = "wood_harvest")]
        preset: String,

        /// Output path for the scenario JSON.
        #[arg(short, long, default_value = "scenario.json")]
        output: PathBuf,
    },

    /// Check a scenario document without running it.
    Validate {
        /// Scenario JSON to check.
        scenario: PathBuf,
    },

    /// Run the full simulation and export the results.
    Run {
        /// Scenario JSON file or preset name.
        #[arg(short, long, default_value = "wood_harvest")]
        scenario: String,

        /// Output directory for result tables.
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Base name for output files.
        #[arg(short, long, default_value = "run")]
        name: String,

        /// Field delimiter for result tables.
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Override the discount rate.
        #[arg(long)]
        discount_rate: Option<f64>,

        /// Print per-year cash flow.
        #[arg(long)]
        yearly: bool,
    },

    /// Sweep one parameter around its baseline value.
    Sensitivity {
        /// Scenario JSON file or preset name.
        #[arg(short, long, default_value = "wood_harvest")]
        scenario: String,

        /// Parameter to vary (e.g. plate_price, survival_rate).
        #[arg(short, long, default_value = "plate_price")]
        parameter: SensitivityParameter,

        /// Multipliers applied to the baseline value.
        #[arg(short, long, value_delimiter = ',', default_value = "0.8,0.9,1.0,1.1,1.2")]
        factors: Vec<f64>,
    },

    /// Compare two scenarios side by side.
    Compare {
        /// Scenario A (JSON file or preset name).
        a: String,
        /// Scenario B (JSON file or preset name).
        b: String,
    },

    /// Display presets, stage order and a scenario's fingerprint.
    Info {
        /// Scenario JSON file or preset name.
        #[arg(short, long, default_value = "wood_harvest")]
        scenario: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { preset, output } => run_init(&preset, &output),
        Commands::Validate { scenario } => run_validate(&scenario),
        Commands::Run {
            scenario,
            output,
            name,
            delimiter,
            discount_rate,
            yearly,
        } => run_simulation(&scenario, &output, &name, delimiter, discount_rate, yearly),
        Commands::Sensitivity {
            scenario,
            parameter,
            factors,
        } => run_sensitivity(&scenario, parameter, &factors),
        Commands::Compare { a, b } => run_compare(&a, &b),
        Commands::Info { scenario } => run_info(&scenario),
    }
}

/// Loads `source` as a file if it exists, otherwise as a preset name.
fn resolve_scenario(source: &str) -> Scenario {
    let path = Path::new(source);
    if path.exists() {
        return load_scenario(path).unwrap_or_else(|e| {
            eprintln!("Error loading scenario {}: {}", path.display(), e);
            std::process::exit(1);
        });
    }
    Scenario::preset(source).unwrap_or_else(|e| {
        eprintln!(
            "Error: '{}' is neither a scenario file nor a valid preset ({}): {}",
            source,
            Scenario::PRESETS.join(", "),
            e
        );
        std::process::exit(1);
    })
}

fn run_init(preset: &str, output: &Path) {
    let scenario = Scenario::preset(preset).unwrap_or_else(|e| {
        eprintln!("Error: {} ({})", e, Scenario::PRESETS.join(", "));
        std::process::exit(1);
    });
    save_scenario(&scenario, output).unwrap_or_else(|e| {
        eprintln!("Error writing scenario: {}", e);
        std::process::exit(1);
    });
    println!("Wrote preset '{}' to {}", preset, output.display());
}

fn run_validate(path: &Path) {
    match load_scenario(path) {
        Ok(scenario) => {
            println!("{}: OK (scenario '{}')", path.display(), scenario.name());
        }
        Err(e) => {
            eprintln!("{}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn run_simulation(
    source: &str,
    output: &Path,
    name: &str,
    delimiter: char,
    discount_rate: Option<f64>,
    yearly: bool,
) {
    let mut scenario = resolve_scenario(source);
    if let Some(rate) = discount_rate {
        let mut params = scenario.into_params();
        params.economics.discount_rate = rate;
        scenario = Scenario::new(params).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
    }
    let p = scenario.params();

    println!("Paulownia - Agro-forestry Scheme Simulator");
    println!("==========================================");
    println!("Scenario: {}", scenario.name());
    println!("Planting: {}  Harvest: {}", p.growth.planting_year, p.growth.harvest_year);
    println!("Trees: {}  Area: {:.1} ha", p.growth.initial_trees, p.growth.planted_area_ha());
    println!("Discount rate: {:.2}%", p.economics.discount_rate * 100.0);
    println!("Output: {}", output.display());

    println!("\nRunning pipeline...");
    let start = Instant::now();
    let result = Pipeline::new(&scenario).run_with_callbacks(
        |name, i, total| {
            println!("  [{}/{}] Starting: {}", i + 1, total, name);
        },
        |name, i, total| {
            println!("  [{}/{}] Completed: {}", i + 1, total, name);
        },
    );
    println!("Pipeline completed in {:.2?}", start.elapsed());

    print_summary(&result);
    if yearly {
        print_yearly(&result);
    }

    let options = TableOptions { delimiter };
    let written = export_run(&result, output, name, &options).unwrap_or_else(|e| {
        eprintln!("Error exporting results: {}", e);
        std::process::exit(1);
    });
    println!("\nExported:");
    for path in written {
        println!("  {}", path.display());
    }
}

fn print_summary(result: &SimulationResult) {
    let kpis = result.dataset.final_kpis();
    let econ = &result.economics;

    println!("\nResults:");
    println!("  Years:                {:>14}", result.dataset.len());
    println!("  Plates produced:      {:>14.0}", result.plates_produced());
    println!("  Total revenue:        {:>14.2}", result.dataset.total(|r| r.kpis.total_revenue));
    println!("  Total cost:           {:>14.2}", kpis.cumulative_cost);
    println!("  Net cash flow:        {:>14.2}", econ.total_net_cash_flow);
    println!("  NPV @ {:>5.2}%:         {:>14.2}", econ.discount_rate * 100.0, econ.npv);
    println!("  IRR:                  {:>14}", econ.irr.describe());
    match econ.payback_year {
        Some(year) => println!("  Payback year:         {:>14}", year),
        None => println!("  Payback year:         {:>14}", "never"),
    }
    println!("  CO2e in soil (final): {:>14.2} t", kpis.co2e_sequestered_t);
    println!("  Emissions:            {:>14.2} t", result.dataset.total(|r| r.kpis.total_emissions_t));

    let d = &econ.distribution;
    println!("\nProfit distribution (pool {:.2}):", d.pool);
    println!("  Farmers:   {:>14.2}", d.farmers);
    println!("  Employees: {:>14.2}", d.employees);
    println!("  Company:   {:>14.2}", d.company);
    println!("  Investors: {:>14.2}", d.investors);

    let c = &econ.coinvestor;
    println!("\nCo-investors:");
    println!("  Contribution:  {:>14.2}", c.contribution);
    println!("  Yearly payout: {:>14.2}", c.yearly_payout);
    println!("  IRR:           {:>14}", c.irr.describe());
    println!("  MoIC:          {:>14.2}", c.moic);

    let plates = result.plates.rows();
    let manual = plates.iter().map(|p| p.jobs_dev_mid).fold(0.0, f64::max);
    let automated = plates.iter().map(|p| p.jobs_min_automation).fold(0.0, f64::max);
    println!("\nJobs while running: {:.1} (manual, mid) / {:.0} (automated)", manual, automated);
}

fn print_yearly(result: &SimulationResult) {
    println!("\n  Year        Revenue           Cost      Cash flow     Cumulative");
    for (year, row) in result.dataset.rows().iter() {
        let k = &row.kpis;
        println!(
            "  {:>4} {:>14.2} {:>14.2} {:>14.2} {:>14.2}",
            year, k.total_revenue, k.total_cost, k.net_cash_flow, k.cumulative_net_cash_flow
        );
    }
}

fn run_sensitivity(source: &str, parameter: SensitivityParameter, factors: &[f64]) {
    let scenario = resolve_scenario(source);
    let baseline = parameter.get(scenario.params());

    println!("Paulownia - One-way Sensitivity");
    println!("===============================");
    println!("Scenario:  {}", scenario.name());
    println!("Parameter: {} (baseline {})", parameter, baseline);
    println!();
    println!("  {:>8} {:>14} {:>16} {:>14}", "factor", "value", "NPV", "IRR");

    for (factor, point) in factors.iter().zip(one_way(&scenario, parameter, factors)) {
        match point {
            Ok(p) => println!(
                "  {:>8.3} {:>14.4} {:>16.2} {:>14}",
                p.factor,
                p.value,
                p.npv,
                p.irr.describe()
            ),
            Err(e) => println!("  {:>8.3} invalid: {}", factor, e),
        }
    }
}

fn run_compare(a: &str, b: &str) {
    let scenario_a = resolve_scenario(a);
    let scenario_b = resolve_scenario(b);
    let result_a = Pipeline::new(&scenario_a).run();
    let result_b = Pipeline::new(&scenario_b).run();

    println!("Paulownia - Scenario Comparison");
    println!("===============================");
    println!("A: {}", scenario_a.name());
    println!("B: {}", scenario_b.name());
    println!();
    println!("  {:<26} {:>16} {:>16} {:>16}", "kpi", "A", "B", "B - A");
    for row in compare(&result_a, &result_b) {
        println!("  {:<26} {:>16.4} {:>16.4} {:>16.4}", row.kpi, row.a, row.b, row.delta());
    }
}

fn run_info(source: &str) {
    let scenario = resolve_scenario(source);
    let p = scenario.params();

    println!("Paulownia - Scenario Info");
    println!("=========================");
    println!();
    println!("Presets: {}", Scenario::PRESETS.join(", "));
    println!();
    println!("Stage order:");
    for stage in StageId::ORDER {
        println!("  {}. {}", stage.index() + 1, stage.name());
    }
    println!();
    println!("Scenario: {}", scenario.name());
    match scenario.fingerprint() {
        Ok(fp) => println!("Fingerprint: {}", fp),
        Err(e) => println!("Fingerprint: unavailable ({})", e),
    }
    println!(
        "Years: {}..={} (+{} monitoring)",
        p.growth.planting_year, p.growth.harvest_year, p.eol.monitoring_years
    );
    println!("Planted area: {:.2} ha", p.growth.planted_area_ha());
    println!(
        "End use: {:.0}% sold, {:.0}% compost, {:.0}% discard",
        p.plates.end_use.wood_sale * 100.0,
        p.plates.end_use.compost * 100.0,
        p.plates.end_use.discard * 100.0
    );
    println!();
    println!("Sensitivity parameters:");
    for parameter in SensitivityParameter::ALL {
        println!("  {:<22} {}", parameter.name(), parameter.get(p));
    }
}
