//! `postfill run`, `check` and `dims`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use postfill_io::{can_fill_in_place, read_grid, write_atomic, write_filled_template, write_grid};
use postfill_recon::config::{DimensionPolicy, FillConfig, SheetRef};
use postfill_recon::dimensions::{build_resolver, Dimensions};
use postfill_recon::{generate_output, FillSummary, Grid, SourceGrids};

use crate::{CliError, RunArgs};

/// Load the config file, or the built-in defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<FillConfig, CliError> {
    let Some(path) = path else {
        tracing::debug!("no config file, using defaults");
        return Ok(FillConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::config(format!("cannot read config '{}': {e}", path.display())))?;
    FillConfig::from_toml(&text).map_err(|e| CliError::recon(e).with_hint(format!("config file: {}", path.display())))
}

fn read_input(path: &Path, sheet: &SheetRef) -> Result<Grid, CliError> {
    read_grid(path, sheet).map_err(CliError::io)
}

/// Paths that name the same file, whether or not it exists yet.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// JSON run report (`--json`, `--report`).
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    status: &'static str,
    run_at: String,
    output: String,
    output_sheet: String,
    /// Whether the output is a filled copy of the template workbook.
    from_template: bool,
    dimension_policy: DimensionPolicy,
    inputs: ReportInputs,
    summary: &'a FillSummary,
}

#[derive(Debug, Serialize)]
struct ReportInputs {
    orders: String,
    postal: String,
    template: String,
    volumetric: Option<String>,
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let inputs = [Some(&args.orders), Some(&args.postal), Some(&args.template), args.volumetric.as_ref()];
    if let Some(clash) = inputs.iter().flatten().find(|p| same_file(p, &args.output)) {
        return Err(CliError::usage(format!(
            "output '{}' would overwrite input '{}'",
            args.output.display(),
            clash.display()
        )));
    }

    let volumetric = match (&args.volumetric, config.dimensions.policy) {
        (Some(path), DimensionPolicy::Tiered) => Some(read_input(path, &config.dimensions.sheet)?),
        (Some(path), DimensionPolicy::Threshold) => {
            tracing::warn!(path = %path.display(), "threshold policy ignores the volumetric workbook");
            None
        }
        (None, _) => None,
    };

    let sources = SourceGrids {
        orders: read_input(&args.orders, &config.orders.sheet)?,
        postal: read_input(&args.postal, &config.postal.sheet)?,
        template: read_input(&args.template, &config.template.sheet)?,
        dimensions: volumetric,
    };

    let output = generate_output(&config, &sources).map_err(CliError::recon)?;

    let from_template = config.output.from_template && can_fill_in_place(&args.template, &args.output);
    let output_sheet = if from_template {
        write_filled_template(&args.template, &config.template.sheet, &args.output, &output.grid)
            .map_err(CliError::io)?
    } else {
        if config.output.from_template {
            tracing::info!("template or output is not .xlsx; writing a plain workbook");
        }
        write_grid(&args.output, &config.output.sheet, &output.grid).map_err(CliError::io)?;
        config.output.sheet.clone()
    };

    let report = RunReport {
        status: "ok",
        run_at: chrono::Utc::now().to_rfc3339(),
        output: args.output.display().to_string(),
        output_sheet,
        from_template,
        dimension_policy: config.dimensions.policy,
        inputs: ReportInputs {
            orders: args.orders.display().to_string(),
            postal: args.postal.display().to_string(),
            template: args.template.display().to_string(),
            volumetric: args.volumetric.as_ref().map(|p| p.display().to_string()),
        },
        summary: &output.summary,
    };

    if args.json || args.report.is_some() {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::config(format!("JSON serialization error: {e}")))?;
        if let Some(path) = &args.report {
            write_atomic(path, json_str.as_bytes()).map_err(|e| {
                CliError::io(e).with_hint(format!("{} was written; only the report is missing", args.output.display()))
            })?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
            return Ok(());
        }
    }

    print_summary(&args.output, &output.summary);
    Ok(())
}

fn print_summary(output: &Path, s: &FillSummary) {
    println!("wrote {} ({} records)", output.display(), s.records);
    println!(
        "postal rows: {}, excluded (pincode): {}",
        s.postal_rows, s.excluded_pincode
    );
    println!(
        "orders: {} rows, {} duplicate booking numbers ignored",
        s.order_rows, s.duplicate_orders
    );
    println!("joined: {} matched, {} unmatched (default state)", s.matched, s.unmatched);
    if s.dimensions_unavailable > 0 {
        println!("no dimensions: {} records", s.dimensions_unavailable);
    }
    println!("fingerprint: {}", s.fingerprint);
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

pub fn cmd_check(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let toml = config.to_toml().map_err(CliError::recon)?;
    match &config_path {
        Some(path) => eprintln!("{}: ok", path.display()),
        None => eprintln!("no config file given; showing defaults"),
    }
    print!("{toml}");
    Ok(())
}

// ---------------------------------------------------------------------------
// dims
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct DimsReport<'a> {
    policy: DimensionPolicy,
    category: Option<&'a str>,
    quantity: u32,
    dimensions: Option<Dimensions>,
}

pub fn cmd_dims(
    quantity: u32,
    category: Option<String>,
    volumetric: Option<PathBuf>,
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let grid = volumetric
        .as_deref()
        .map(|p| read_input(p, &config.dimensions.sheet))
        .transpose()?;
    let resolver = build_resolver(&config.dimensions, grid.as_ref()).map_err(CliError::recon)?;

    let quantity = quantity.max(1);
    let category = category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let dimensions = resolver.resolve(category, quantity);

    if json {
        let report = DimsReport {
            policy: config.dimensions.policy,
            category,
            quantity,
            dimensions,
        };
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::config(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    match dimensions {
        Some(d) => println!("{} x {} x {}", d.length, d.breadth, d.height),
        None => println!("unavailable"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_file_for_missing_paths_compares_literally() {
        assert!(same_file(Path::new("/no/such/out.xlsx"), Path::new("/no/such/out.xlsx")));
        assert!(!same_file(Path::new("/no/such/a.xlsx"), Path::new("/no/such/b.xlsx")));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let err = load_config(Some(Path::new("/no/such/postfill.toml"))).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_CONFIG);
    }

    #[test]
    fn no_config_means_defaults() {
        assert_eq!(load_config(None).unwrap(), FillConfig::default());
    }
}
