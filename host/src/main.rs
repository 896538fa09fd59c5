use std::path::PathBuf;

use clap::Parser;
use pythonnet_setup::{check, provision, Host, Outcome, Platform, Settings, SystemRunner};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PYTHONNET_SETUP_TARGET"),
    ")"
);

/// Set up Python support in Lean with pythonnet
#[derive(Parser, Debug)]
#[command(name = "pythonnet-setup", version, long_version = LONG_VERSION, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./pythonnet-setup.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Python interpreter to provision
    #[arg(long)]
    python: Option<PathBuf>,

    /// Directory searched for Python.Runtime.dll
    #[arg(long)]
    packages_dir: Option<PathBuf>,

    /// Only check prerequisites; install and modify nothing
    #[arg(long)]
    check: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn settings(cli: &Cli) -> Result<Settings, pythonnet_setup::SetupError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut settings = Settings::discover(cli.config.as_deref(), &cwd)?;
    if let Some(python) = &cli.python {
        settings.python_executable = Some(python.clone());
    }
    if let Some(dir) = &cli.packages_dir {
        settings.packages_dir = dir.clone();
    }
    Ok(settings)
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Success => {}
        Outcome::FollowUp(message) => println!("{message}"),
        Outcome::Failure(err) => eprintln!("{err}"),
    }
}

fn run(cli: &Cli) -> Outcome {
    let settings = match settings(cli) {
        Ok(settings) => settings,
        Err(err) => return Outcome::Failure(err),
    };

    if cli.print_config {
        return match settings.to_toml() {
            Ok(text) => {
                print!("{text}");
                Outcome::Success
            }
            Err(err) => Outcome::Failure(err),
        };
    }

    let platform = Platform::current();
    pythonnet_setup::platform::log_host_details(platform);
    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            return Outcome::Failure(pythonnet_setup::SetupError::Io {
                operation: "resolve working directory",
                path: PathBuf::from("."),
                source: e,
            })
        }
    };

    let runner = SystemRunner;

    #[cfg(feature = "embedded-python")]
    let probe = {
        let explicit = settings.python_executable.as_deref();
        if let Err(err) = pythonnet_setup::reject_interpreter_override(explicit) {
            return Outcome::Failure(err);
        }
        pythonnet_setup::EmbeddedProbe
    };

    #[cfg(not(feature = "embedded-python"))]
    let probe = match pythonnet_setup::find_python(&runner, settings.python_executable.as_deref()) {
        Ok(python) => pythonnet_setup::SubprocessProbe::new(python, &runner),
        Err(err) => return Outcome::Failure(err),
    };
    debug!(?platform, "starting");

    let host = Host {
        platform,
        runner: &runner,
        locator: &runner,
        probe: &probe,
    };
    if cli.check {
        check(host, &settings)
    } else {
        provision(host, &settings, &cwd)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = ctrlc::set_handler(|| {
        warn!("interrupted; the package tree may hold a partially copied artifact");
        std::process::exit(130);
    }) {
        warn!("could not install Ctrl-C handler: {e}");
    }

    let outcome = run(&cli);
    report(&outcome);
    std::process::exit(outcome.exit_code());
}
