use clap::{Parser, Subcommand};
use graphics_packer::settings::{self, ErrorPolicy, ProcessingConfig, Settings};
use graphics_packer::{output, process};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graphics-packer")]
#[command(about = "Packages source artwork into game graphics folders")]
#[command(long_about = "\
Packages source artwork into game graphics folders

Every directory under the source folder may hold a _config.json rule file.
Rules cascade from the source root down: deeper files win, and within one
file a rule for a single image wins over a rule for the whole folder.

  artwork/
  ├── _config.json                 # { \".\": { \"include\": [\"logos/{folder}\"] } }
  └── clubs/
      ├── _config.json             # { \"arsenal\": { \"save_as\": \"1\" } }
      └── england/
          └── arsenal.png          # → graphics/logos/england/1.png

Rule keys:
  \".\" or \"dir/\"    folder rule (applies to the whole subtree)
  \"name\"           file rule (image path without extension)

Rule fields:
  ignore, crop_anchor, crop_anchor_x, crop_anchor_y, save_as, folder,
  duplicates, override, include, exclude

Run 'graphics-packer gen-settings' to generate a documented settings.json.")]
#[command(version)]
struct Cli {
    /// Settings document
    #[arg(long, default_value = "settings.json", global = true)]
    settings: PathBuf,

    /// Maximum parallel workers (defaults to processing.max_processes, then all cores)
    #[arg(long, short = 'j', global = true)]
    jobs: Option<usize>,

    /// Skip images that fail to load or save instead of aborting the run
    #[arg(long, global = true)]
    keep_going: bool,

    /// Log rule application and planned outputs
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan, resolve, and write every output (the default)
    Build,
    /// Validate settings and rules and print the planned outputs without writing
    Check,
    /// Print a stock settings.json showing every option
    GenSettings,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    match cli.command.unwrap_or(Command::Build) {
        Command::GenSettings => {
            print!("{}", settings::stock_settings_json());
        }
        Command::Check => {
            let settings = Settings::load(&cli.settings)?;
            println!("==> Checking {}", settings.source_folder.display());
            let plan = process::check(&settings)?;
            output::print_plan(&plan, &settings.source_folder, &settings.graphics_folder);
            println!("==> Rules are valid");
        }
        Command::Build => {
            let mut settings = Settings::load(&cli.settings)?;
            if cli.jobs.is_some() {
                settings.processing.max_processes = cli.jobs;
            }
            if cli.keep_going {
                settings.processing.on_error = ErrorPolicy::Continue;
            }
            init_thread_pool(&settings.processing);

            println!(
                "==> Packing {} → {}",
                settings.source_folder.display(),
                settings.graphics_folder.display()
            );
            let source_root = settings.source_folder.clone();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event, &source_root) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::build(&settings, settings.processing.on_error, Some(tx));
            printer.join().ok();
            let result = result?;

            output::print_build_summary(&result);
            if !result.failures.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
            println!("==> Build complete");
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Install the fmt subscriber. `RUST_LOG` wins; `--verbose` raises the default to debug.
fn init_tracing(verbose: bool) {
    let default = if verbose { "graphics_packer=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &ProcessingConfig) {
    let threads = settings::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
