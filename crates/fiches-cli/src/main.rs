mod commands;
mod crawl;
mod error;
mod output;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fiches",
    version,
    about = "Extract investment project records from regional investment centre fact sheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProfileArgs {
    /// Built-in source profile: benimallal, fesmeknes
    #[arg(short, long, default_value = "benimallal")]
    profile: String,

    /// Custom JSON profile file (overrides --profile)
    #[arg(long = "profile-file", value_name = "FILE")]
    profile_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the projects of a single PDF (ids start at 1)
    Extract {
        /// Path to PDF file
        input_file: PathBuf,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Write records to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Download a source's PDFs and merge its projects into the dataset
    Run {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Directory holding the source's PDFs (default: pdfs/<profile>)
        #[arg(short, long, value_name = "DIR")]
        docs: Option<PathBuf>,

        /// Dataset CSV to refresh
        #[arg(long, value_name = "CSV", default_value = "output_projects.csv")]
        output: PathBuf,

        /// Worker threads (default: available cores, at most 6)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Never crawl, even when the document directory is empty
        #[arg(long)]
        no_crawl: bool,
    },
    /// Inspect and validate source profiles
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List built-in profiles
    List,
    /// Describe a built-in profile
    Show {
        /// Preset name (e.g., "benimallal")
        preset: String,
    },
    /// Validate a custom profile file
    Validate {
        /// Path to JSON profile file
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input_file,
            profile,
            output,
            out,
        } => commands::resolve_profile(&profile.profile, profile.profile_file.as_deref())
            .map_err(Into::into)
            .and_then(|p| commands::extract::run(input_file, &p, &output, out)),
        Commands::Run {
            profile,
            docs,
            output,
            workers,
            no_crawl,
        } => commands::resolve_profile(&profile.profile, profile.profile_file.as_deref())
            .map_err(Into::into)
            .and_then(|p| commands::run::run(&p, docs, &output, workers, no_crawl)),
        Commands::Profiles { action } => match action {
            ProfilesAction::List => commands::profiles::list(),
            ProfilesAction::Show { preset } => commands::profiles::show(&preset),
            ProfilesAction::Validate { file } => commands::profiles::validate(&file),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
