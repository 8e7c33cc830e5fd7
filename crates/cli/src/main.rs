use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use symcheck::commands::{
    check_command, extract_command, list_libraries_command, parse_command, print_report,
    stub_command, CheckOptions, ExtractorOptions,
};
use tracing_subscriber::EnvFilter;

/// Checks hand-written bindings against the C function surface of native libraries.
///
/// This CLI is a thin wrapper around `symcheck-core` (exposed in code as `symcheck_core`).
#[derive(Parser, Debug)]
#[command(name = "symcheck", version, about = "Check binding coverage of native C APIs", long_about = None)]
struct Cli {
    /// Log extractor invocations and registrations to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct ExtractorArgs {
    /// JSON or YAML config file.
    #[arg(long)]
    config: Option<String>,

    /// castxml binary to run (overrides config and CASTXML_BIN).
    #[arg(long)]
    castxml: Option<String>,

    /// Kill the extractor after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory for temporary C stubs.
    #[arg(long)]
    scratch_dir: Option<String>,
}

impl From<ExtractorArgs> for ExtractorOptions {
    fn from(args: ExtractorArgs) -> Self {
        Self {
            config: args.config,
            castxml: args.castxml,
            timeout_secs: args.timeout_secs,
            scratch_dir: args.scratch_dir,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported libraries and their symbol prefixes.
    Libraries {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the C stub handed to the extractor for a library.
    Stub {
        /// Library key (cephfs, rados, rbd).
        #[arg(long)]
        library: String,
    },

    /// Run castxml over a library's stub and list the C functions it declares.
    Extract {
        /// Library key (cephfs, rados, rbd).
        #[arg(long)]
        library: String,

        #[command(flatten)]
        extractor: ExtractorArgs,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Decode a saved castxml XML dump and list its C functions.
    Parse {
        /// Path to the XML dump.
        #[arg(long)]
        file: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compare a library's C functions with the symbols a binding implements.
    Check {
        /// Library key (cephfs, rados, rbd).
        #[arg(long)]
        library: String,

        /// File listing implemented C symbols, one per line.
        #[arg(long)]
        implemented: String,

        /// Use a saved castxml dump instead of running the extractor.
        #[arg(long)]
        xml: Option<String>,

        #[command(flatten)]
        extractor: ExtractorArgs,

        /// Exit with an error if any expected function is missing.
        #[arg(long, default_value_t = false)]
        fail_on_missing: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Libraries { json } => list_libraries_command(json)?,
        Command::Stub { library } => stub_command(&library)?,
        Command::Extract { library, extractor, json } => {
            extract_command(&library, &extractor.into(), json)?
        }
        Command::Parse { file, json } => parse_command(&file, json)?,
        Command::Check { library, implemented, xml, extractor, fail_on_missing, json } => {
            let opts = CheckOptions { library, implemented, xml, extractor: extractor.into() };
            let report = check_command(&opts)?;
            print_report(&report, json)?;
            if fail_on_missing && !report.is_complete() {
                bail!("{} expected function(s) missing for {}", report.missing.len(), report.prefix);
            }
        }
    }

    Ok(())
}
