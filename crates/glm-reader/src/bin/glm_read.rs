//! Command-line reader for GLM LCFA files.
//!
//! Reads a file struct-major or column-major, prints record counts and
//! optionally times repeated reads.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glm_reader::{
    ColumnTables, DanglingPolicy, DimensionTable, Family, GlmReader, LinkReport, QueryResult,
    ReaderConfig, RecordTables, ScalarSet,
};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// GOES-17 sample covering 2019-09-26 23:59:40 to 2019-09-27 00:00:00 UTC.
const DEFAULT_FILE: &str =
    "OR_GLM-L2-LCFA_G17_s20192692359400_e20192700000000_c20192700000028.nc";

#[derive(Parser, Debug)]
#[command(name = "glm-read")]
#[command(about = "Read GOES GLM L2 LCFA lightning files")]
struct Args {
    /// GLM NetCDF file to read
    #[arg(default_value = DEFAULT_FILE)]
    path: PathBuf,

    /// Read column-major instead of one struct per record
    #[arg(long)]
    arrays: bool,

    /// Record family to read (repeatable; default: all)
    #[arg(short, long = "family")]
    families: Vec<Family>,

    /// Handling of dangling parent ids: fail, drop or null
    #[arg(long)]
    policy: Option<DanglingPolicy>,

    /// Print the first records of each family
    #[arg(short, long)]
    verbose: bool,

    /// Print dimensions, scalars and linkage as JSON
    #[arg(long)]
    json: bool,

    /// Repeat the read and report timings
    #[arg(short, long, default_value_t = 1)]
    trials: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

/// Records printed per family with `--verbose`.
const PREVIEW: usize = 3;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let mut config = ReaderConfig::from_env().context("invalid GLM_* environment")?;
    if let Some(policy) = args.policy {
        config.dangling_policy = policy;
    }
    if args.trials == 0 {
        anyhow::bail!("--trials must be at least 1");
    }

    info!(
        path = %args.path.display(),
        arrays = args.arrays,
        policy = %config.dangling_policy,
        "Reading GLM file"
    );
    let reader = GlmReader::new(config);

    let mut timings = Vec::with_capacity(args.trials as usize);
    if args.arrays {
        let mut last = None;
        for _ in 0..args.trials {
            let start = Instant::now();
            let result = reader
                .read_file_arrays(&args.path, &args.families)
                .with_context(|| format!("reading {}", args.path.display()))?;
            timings.push(start.elapsed().as_micros());
            last = Some(result);
        }
        if let Some(result) = last {
            report_arrays(&result, &args)?;
        }
    } else {
        let mut last = None;
        for _ in 0..args.trials {
            let start = Instant::now();
            let result = reader
                .read_file(&args.path, &args.families)
                .with_context(|| format!("reading {}", args.path.display()))?;
            timings.push(start.elapsed().as_micros());
            last = Some(result);
        }
        if let Some(result) = last {
            report_structs(&result, &args)?;
        }
    }

    if args.trials > 1 {
        print_timings(&timings);
    }

    Ok(())
}

#[derive(Serialize)]
struct Summary<'a> {
    path: &'a Path,
    product_time: Option<String>,
    dimensions: &'a DimensionTable,
    scalars: &'a ScalarSet,
    links: &'a LinkReport,
}

fn print_header<T>(result: &QueryResult<T>, json: bool) -> Result<()> {
    if json {
        let summary = Summary {
            path: &result.path,
            product_time: result.scalars.product_time_utc().map(|t| t.to_rfc3339()),
            dimensions: &result.dimensions,
            scalars: &result.scalars,
            links: &result.links,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("file: {}", result.path.display());
    if let Some(start) = result.scalars.product_time_utc() {
        println!("product time: {}", start.to_rfc3339());
    }
    println!(
        "events: {}  groups: {}  flashes: {}",
        result.dimensions.events(),
        result.dimensions.groups(),
        result.dimensions.flashes()
    );
    for link in result.links.iter() {
        println!(
            "{} -> {}: {} orphans ({}, {} dropped)",
            link.child, link.parent, link.orphans, link.policy, link.dropped
        );
    }
    Ok(())
}

fn report_structs(result: &QueryResult<RecordTables>, args: &Args) -> Result<()> {
    print_header(result, args.json)?;
    if !args.verbose {
        return Ok(());
    }
    if let Some(events) = &result.tables.events {
        println!("read {} events", events.len());
        for linked in events.iter().take(PREVIEW) {
            println!("  {:?} parent={:?}", linked.record, linked.parent);
        }
    }
    if let Some(groups) = &result.tables.groups {
        println!("read {} groups", groups.len());
        for linked in groups.iter().take(PREVIEW) {
            println!("  {:?} parent={:?}", linked.record, linked.parent);
        }
    }
    if let Some(flashes) = &result.tables.flashes {
        println!("read {} flashes", flashes.len());
        for flash in flashes.iter().take(PREVIEW) {
            println!("  {:?}", flash);
        }
    }
    Ok(())
}

fn report_arrays(result: &QueryResult<ColumnTables>, args: &Args) -> Result<()> {
    print_header(result, args.json)?;
    if !args.verbose {
        return Ok(());
    }
    let tables = [
        (Family::Event, result.tables.events.as_ref().map(|t| &t.columns)),
        (Family::Group, result.tables.groups.as_ref().map(|t| &t.columns)),
        (Family::Flash, result.tables.flashes.as_ref()),
    ];
    for (family, columns) in tables {
        let Some(columns) = columns else { continue };
        println!("read {} {} records", columns.len(), family);
        for (name, column) in columns.iter() {
            let preview: Vec<String> = (0..columns.len().min(PREVIEW))
                .filter_map(|i| column.get(i))
                .map(|v| format!("{}", v.as_f64()))
                .collect();
            println!("  {}: [{}]", name, preview.join(", "));
        }
    }
    Ok(())
}

fn print_timings(timings: &[u128]) {
    let min = timings.iter().copied().min().unwrap_or_default();
    let max = timings.iter().copied().max().unwrap_or_default();
    let avg = timings.iter().sum::<u128>() / timings.len().max(1) as u128;
    println!(
        "{} trials: min {} us, max {} us, avg {} us",
        timings.len(),
        min,
        max,
        avg
    );
}
