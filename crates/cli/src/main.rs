// postfill CLI - fill a courier intake template from a postal manifest and
// an orders report

mod commands;
mod exit_codes;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};

use postfill_io::IoError;
use postfill_recon::ReconError;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_CONFIG, EXIT_SUCCESS, EXIT_USAGE};

/// Output file name used when `--output` is not given.
pub const DEFAULT_OUTPUT: &str = "TTD_Postal_Output.xlsx";

#[derive(Parser)]
#[command(name = "postfill")]
#[command(about = "Reconcile a postal manifest with an orders report and fill the courier template")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log more (-v: stage counts, -vv: per-record detail). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the filled template from the input workbooks
    #[command(after_help = "\
Examples:
  postfill run --orders orders.xlsx --postal postal.xlsx --template template.xlsx --volumetric volumetric.xlsx
  postfill run --orders orders.xlsx --postal postal.xlsx --template template.xlsx --config threshold.toml -o out.xlsx
  postfill run ... --json --report run.json")]
    Run(RunArgs),

    /// Validate a config file and print the effective configuration
    #[command(after_help = "\
Examples:
  postfill check
  postfill check --config postfill.toml")]
    Check {
        /// TOML config file (defaults apply when omitted)
        #[arg(long, short = 'c', env = "POSTFILL_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Resolve the box dimensions for one parcel
    #[command(after_help = "\
Examples:
  postfill dims --quantity 3 --category \"Big Diary\" --volumetric volumetric.xlsx
  postfill dims --quantity 6 --config threshold.toml --json")]
    Dims {
        /// Parcel quantity (values below 1 count as 1)
        #[arg(long, short = 'q')]
        quantity: u32,

        /// Product category, as it appears in the orders report
        #[arg(long)]
        category: Option<String>,

        /// Volumetric measurement workbook (tiered policy)
        #[arg(long)]
        volumetric: Option<PathBuf>,

        /// TOML config file (defaults apply when omitted)
        #[arg(long, short = 'c', env = "POSTFILL_CONFIG")]
        config: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Orders report workbook
    #[arg(long)]
    pub orders: PathBuf,

    /// Postal manifest workbook
    #[arg(long)]
    pub postal: PathBuf,

    /// Output template workbook (labels row, defaults row)
    #[arg(long)]
    pub template: PathBuf,

    /// Volumetric measurement workbook (required by the tiered policy)
    #[arg(long)]
    pub volumetric: Option<PathBuf>,

    /// TOML config file (defaults apply when omitted)
    #[arg(long, short = 'c', env = "POSTFILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output file (.xlsx or .csv)
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Print the JSON run report to stdout instead of the text summary
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  postfill-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => commands::cmd_run(args),
        Commands::Check { config } => commands::cmd_check(config),
        Commands::Dims {
            quantity,
            category,
            volumetric,
            config,
            json,
        } => commands::cmd_dims(quantity, category, volumetric, config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::DimensionSourceRequired => {
                Some("pass --volumetric, or set [dimensions] policy = \"threshold\"".to_string())
            }
            ReconError::MissingColumn { input, .. } => {
                Some(format!("check the [{input}] column names in the config"))
            }
            ReconError::MissingHeaderRow { input, .. } => {
                Some(format!("check [{input}] header_row and sheet in the config"))
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn io(err: IoError) -> Self {
        let hint = match &err {
            IoError::SheetNotFound { .. } => Some("set the sheet name or index in the config".to_string()),
            IoError::Write { .. } => Some("no output file was written".to_string()),
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
