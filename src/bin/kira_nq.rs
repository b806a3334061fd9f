use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_nmr_quant::config::AttributeSet;
use kira_nmr_quant::dataset::{LoadOptions, TargetedDataset};
use kira_nmr_quant::domain::{FileType, LimsFormat};
use kira_nmr_quant::error::NmrError;
use kira_nmr_quant::output::{DatasetSummary, JsonOutput};

#[derive(Parser)]
#[command(name = "kira-nq")]
#[command(about = "Harmonise quantitative NMR reports into a targeted dataset")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load a directory of quantification reports and print a summary")]
    Load(LoadArgs),
    #[command(about = "List built-in SOP profiles")]
    Sops,
}

#[derive(Args)]
struct LoadArgs {
    source: Utf8PathBuf,

    #[arg(long, default_value = "Bruker Quantification")]
    file_type: String,

    #[arg(long, default_value = "Generic")]
    sop: String,

    #[arg(long)]
    sop_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    pattern: Option<String>,

    #[arg(long)]
    pdata: Option<u32>,

    #[arg(long)]
    unit: Option<String>,

    #[arg(long)]
    lims: Option<Utf8PathBuf>,

    #[arg(long, default_value = "NPC LIMS")]
    lims_format: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<NmrError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &NmrError) -> u8 {
    match error {
        NmrError::NotImplemented(_)
        | NmrError::InvalidParameterType { .. }
        | NmrError::InvalidParameters(_)
        | NmrError::InvalidPattern { .. }
        | NmrError::UnknownSop(_) => 2,
        NmrError::UnitNotFound { .. } => 3,
        NmrError::Filesystem(_)
        | NmrError::ReportParse { .. }
        | NmrError::WorklistRead { .. }
        | NmrError::WorklistColumn { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => run_load(args),
        Commands::Sops => {
            for name in AttributeSet::builtin_names() {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn run_load(args: LoadArgs) -> miette::Result<()> {
    let file_type: FileType = args.file_type.parse()?;
    let mut options = LoadOptions::new(file_type, args.source).sop(args.sop);
    if let Some(dir) = args.sop_dir {
        options = options.sop_dir(dir);
    }
    if let Some(pattern) = args.pattern {
        options = options.file_name_pattern(pattern);
    }
    if let Some(pdata) = args.pdata {
        options = options.pdata(pdata);
    }
    if let Some(unit) = args.unit {
        options = options.unit(unit);
    }

    let mut outcome = TargetedDataset::load_with(options)?;
    for notice in &outcome.notices {
        eprintln!("warning: {notice}");
    }
    if let Some(worklist) = args.lims {
        let format: LimsFormat = args.lims_format.parse()?;
        outcome.dataset.merge_lims(&worklist, format)?;
    }

    let summary = DatasetSummary::from_outcome(&outcome)?;
    JsonOutput::print_summary(&summary).into_diagnostic()?;
    Ok(())
}
