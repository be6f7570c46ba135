use anyhow::Context;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use higher_ed_import::config::Config;
use higher_ed_import::constants::DEFAULT_CONFIG_PATH;
use higher_ed_import::db;
use higher_ed_import::domain::EntityKind;
use higher_ed_import::error::ImportError;
use higher_ed_import::infra::NominatimGeocoder;
use higher_ed_import::logging;
use higher_ed_import::pipeline::processing::enrich::GeoEnricher;
use higher_ed_import::pipeline::processing::validate::ValidationReport;
use higher_ed_import::pipeline::{self, ImportOptions, ImportReport, Importer, RunTracker, TransactionPolicy};

#[derive(Parser)]
#[command(name = "higher-ed-import")]
#[command(about = "Import the higher-education establishments feed into the catalog database")]
#[command(version)]
struct Cli {
    /// Feed file (JSON array of establishments)
    file: Option<PathBuf>,

    /// Only check the feed structure; writes nothing
    #[arg(long, conflicts_with_all = ["dry_run", "no_geo"])]
    validate: bool,

    /// Run the whole import, then roll it back
    #[arg(long)]
    dry_run: bool,

    /// Skip geocoding of establishments without coordinates
    #[arg(long)]
    no_geo: bool,

    /// Transaction layout for the run
    #[arg(long, value_enum, default_value_t = TransactionPolicy::Isolated)]
    policy: TransactionPolicy,

    /// Ignore the departments of each establishment
    #[arg(long)]
    no_departments: bool,

    /// Ignore the affiliations of each establishment
    #[arg(long)]
    no_affiliations: bool,

    /// SQLite database path (overrides config and environment)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Run failed: {:#}", e);
            println!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let input = cli.file.clone().unwrap_or_else(|| config.input.default_path.clone());
    let mut tracker = RunTracker::new();

    if cli.validate {
        println!("🔍 Validating {}...", input.display());
        let report = pipeline::run_validation(&input, &mut tracker)?;
        print_validation(&report);
        if !report.is_valid() {
            return Err(ImportError::ValidationFailed {
                records: report.invalid_records(),
            }
            .into());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let database = cli.database.clone().unwrap_or_else(|| config.database.path.clone());

    let mut options = ImportOptions::new(Local::now().date_naive());
    options.policy = cli.policy;
    options.dry_run = cli.dry_run;
    options.resolve.departments = !cli.no_departments;
    options.resolve.affiliations = !cli.no_affiliations;

    let enricher = if cli.no_geo {
        info!("geocoding disabled");
        None
    } else {
        let geocoder = NominatimGeocoder::new(&config.geocoder)?;
        Some(GeoEnricher::new(Arc::new(geocoder), &config.geocoder))
    };

    if cli.dry_run {
        println!("🧪 Dry run: nothing will be persisted");
    }
    println!("📥 Importing {} into {}...", input.display(), database.display());

    let importer = Importer::new(options, enricher);
    let (report, conn) = pipeline::import_file(&input, &database, &importer, &mut tracker)
        .await
        .with_context(|| format!("importing {}", input.display()))?;
    print_report(&report);

    println!("\n📚 Catalog totals:");
    for kind in EntityKind::ALL {
        println!("   {:<16} {}", kind.label(), db::count(&conn, kind)?);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_validation(report: &ValidationReport) {
    if report.is_valid() {
        println!("✅ {} records, no issues found", report.total_records);
        return;
    }
    warn!(invalid = report.invalid_records(), "feed has structural issues");
    println!(
        "\n⚠️  {} of {} records have issues ({} total):",
        report.invalid_records(),
        report.total_records,
        report.issue_count()
    );
    for record in &report.records {
        println!("   [{}] {}", record.index, record.label);
        for issue in &record.issues {
            println!("      - {}", issue);
        }
    }
}

fn print_report(report: &ImportReport) {
    println!("\n📊 Import Results ({}):", report.state);
    println!("   Records: {}", report.records_total);
    println!("   Imported: {}", report.records_imported);
    println!("   Dropped (incomplete): {}", report.records_dropped);
    for line in report.stats.summary_lines() {
        println!("   {}", line);
    }

    if !report.failures.is_empty() {
        println!("\n⚠️  Records skipped after errors:");
        for failure in &report.failures {
            println!("   - {}", failure);
        }
    }

    if report.dry_run {
        println!("\n🧪 Dry run complete, all changes rolled back");
    } else {
        println!("\n✅ Import committed");
    }
}
