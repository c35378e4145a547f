//! Depreciation Engine CLI
//!
//! Projects capital stock and tax deductions for a baseline or reformed
//! depreciation policy and writes the results as CSV.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use depreciation_engine::data::{loader::DEFAULT_DATA_PATH, ModelData};
use depreciation_engine::policy::{load_reform, loader::load_reclassification_from_reader};
use depreciation_engine::{CapitalPath, Haircut, ProjectionConfig, Regime, ScenarioRunner};

#[derive(Debug, Parser)]
#[command(name = "ccr", about = "Tax depreciation and capital-stock projection")]
struct Cli {
    /// Directory holding the asset, economic and policy tables
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data_dir: PathBuf,

    /// Reform JSON: {parameter: {year: value}}
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Reclassification JSON replacing the baseline rules: {"gds": {...}, "ads": {...}}
    #[arg(long)]
    reclass: Option<PathBuf>,

    /// Fraction of remaining deductions on earlier investment disallowed
    #[arg(long, default_value_t = 0.0)]
    haircut: f64,

    /// First year the haircut applies
    #[arg(long)]
    haircut_year: Option<i32>,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Fail on the first numeric anomaly
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    println!("Depreciation Engine v{}", env!("CARGO_PKG_VERSION"));
    println!("=========================\n");

    let data = ModelData::from_csv_path(&cli.data_dir)
        .with_context(|| format!("loading data from {}", cli.data_dir.display()))?;
    let config = ProjectionConfig { strict: cli.strict };
    let runner = ScenarioRunner::new(data, config).context("initializing calibration")?;

    println!("Calibration factors:");
    println!("  Corporate:    {:.6}", runner.calibration().corporate);
    println!("  Noncorporate: {:.6}", runner.calibration().noncorporate);
    println!();

    let mut scenario = match &cli.policy {
        Some(path) => {
            let reform = load_reform(path).with_context(|| format!("reading reform {}", path.display()))?;
            runner.reform("reform", &reform)?
        }
        None => runner.baseline(),
    };
    if let Some(path) = &cli.reclass {
        let (gds, ads) = load_reclassification_from_reader(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )?;
        scenario.policy.reclassify_gds_life = gds;
        scenario.policy.reclassify_ads_life = ads;
    }
    if let Some(year) = cli.haircut_year {
        scenario = scenario.with_haircut(Haircut::new(cli.haircut, year)?);
    } else if cli.haircut != 0.0 {
        anyhow::bail!("--haircut needs --haircut-year");
    }

    let result = runner.run(&scenario).with_context(|| format!("running scenario '{}'", scenario.name))?;

    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    for (regime, suffix) in [(Regime::Corporate, "corp"), (Regime::Noncorporate, "noncorp")] {
        let path = result.path(regime);
        write_summary(path, &cli.output_dir.join(format!("capital_{}.csv", suffix)))?;
        write_stock(path, runner.data(), &cli.output_dir.join(format!("kstock_{}.csv", suffix)))?;
        print_summary(path);
    }

    println!("Output written to {}", cli.output_dir.display());
    Ok(())
}

fn write_summary(path: &CapitalPath, file: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(file).with_context(|| format!("creating {}", file.display()))?;
    for row in &path.summary {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_stock(path: &CapitalPath, data: &ModelData, file: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(file).with_context(|| format!("creating {}", file.display()))?;

    let mut header = vec!["asset".to_string(), "code".to_string()];
    header.extend(path.stock_years().map(|y| y.to_string()));
    writer.write_record(&header)?;

    for (asset, row) in data.assets.iter().zip(&path.stock) {
        let mut record = vec![asset.index.to_string(), asset.code.clone()];
        record.extend(row.iter().map(|k| k.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(path: &CapitalPath) {
    println!("{} capital path:", path.regime);
    println!(
        "{:>6} {:>14} {:>14} {:>12} {:>12} {:>12} {:>12}",
        "Year", "Kstock", "K_fixed", "Investment", "I_fixed", "trueDep", "taxDep"
    );
    println!("{}", "-".repeat(90));
    for row in &path.summary {
        println!(
            "{:>6} {:>14.2} {:>14.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
            row.year, row.kstock, row.fixed_k, row.investment, row.fixed_inv, row.true_dep, row.tax_dep
        );
    }
    if !path.anomalies.is_empty() {
        println!("  {} anomalies recorded", path.anomalies.len());
    }
    println!();
}
