mod commands;
mod terminal;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::create::JailArgs;
use commands::update::UpdateTarget;
use commands::{exit_code_for, EXIT_FAILURE};
use jmgr_core::{install_signal_handler, DestroyOptions, Engine, Registry, Transition};
use jmgr_runtime::SystemGateway;
use std::path::PathBuf;
use std::process::ExitCode;
use terminal::TerminalOperator;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "jmgr",
    version,
    about = "Manage FreeBSD thick jails on ZFS datasets or plain directories"
)]
struct Cli {
    /// Output results as structured JSON (jails, runs, show, config, doctor).
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List all jails (the default).
    Jails,
    /// List running jails.
    Runs,
    /// Show everything known about one jail.
    Show { name: String },
    /// Show the resolved settings and configuration problems.
    Config,
    /// Start a jail at boot.
    Enable { name: String },
    /// Stop starting a jail at boot.
    Disable { name: String },
    /// Log in to a running jail.
    Enter {
        name: String,
        /// User to log in as (defaults to `jail_user` from the settings).
        user: Option<String>,
    },
    /// Start jails.
    Start {
        /// Start every top-level jail.
        #[arg(long, default_value_t = false, conflicts_with = "names")]
        all: bool,
        names: Vec<String>,
    },
    /// Stop jails.
    Stop {
        /// Stop every top-level jail.
        #[arg(long, default_value_t = false, conflicts_with = "names")]
        all: bool,
        names: Vec<String>,
    },
    /// Restart jails.
    Restart {
        /// Restart every top-level jail.
        #[arg(long, default_value_t = false, conflicts_with = "names")]
        all: bool,
        names: Vec<String>,
    },
    /// Create a jail from a FreeBSD release.
    Create {
        /// Do not ask for confirmation.
        #[arg(short, long, default_value_t = false)]
        force: bool,
        /// Release to install, e.g. 14.1-RELEASE (defaults to the host release).
        #[arg(short = 'v', long = "version")]
        release: Option<String>,
        name: String,
        /// IPv4 address; without one the jail inherits the host addresses.
        ip: Option<String>,
        /// Network interface for the address.
        interface: Option<String>,
    },
    /// Copy a jail into a new jail.
    Clone {
        /// Do not ask for confirmation.
        #[arg(short, long, default_value_t = false)]
        force: bool,
        source: String,
        name: String,
        ip: Option<String>,
        interface: Option<String>,
    },
    /// Snapshot a dataset-backed jail.
    Snapshot { name: String },
    /// Roll a jail back to its latest snapshot.
    Rollback {
        #[arg(short, long, default_value_t = false)]
        force: bool,
        name: String,
        /// Snapshot identifier (`<dataset>@<tag>`) or just the tag.
        snapshot: String,
    },
    /// Destroy jails or snapshots.
    Destroy {
        #[arg(short, long, default_value_t = false)]
        force: bool,
        /// Also destroy the dataset's snapshots.
        #[arg(short, long, default_value_t = false)]
        recursive: bool,
        /// Jail names or `<dataset>@<tag>` snapshot identifiers.
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Patch, upgrade or update packages in a jail.
    Update {
        #[arg(short, long, default_value_t = false)]
        force: bool,
        /// Release to upgrade to (with `rel`).
        #[arg(short = 'v', long = "version")]
        release: Option<String>,
        #[arg(value_enum)]
        target: UpdateTarget,
        name: String,
    },
    /// Run diagnostic checks on the host and settings.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

impl Commands {
    /// Commands that change the host and so need the jail tools.
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Commands::Jails
                | Commands::Runs
                | Commands::Show { .. }
                | Commands::Config
                | Commands::Doctor
                | Commands::Completions { .. }
                | Commands::ManPages { .. }
        )
    }
}

#[allow(clippy::too_many_lines)]
fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("JMGR_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    install_signal_handler();

    let command = cli.command.unwrap_or(Commands::Jails);
    let json = cli.json;

    // Neither needs the host.
    match &command {
        Commands::Completions { shell } => return exit(commands::completions::run::<Cli>(*shell)),
        Commands::ManPages { dir } => return exit(commands::man_pages::run::<Cli>(dir)),
        _ => {}
    }

    let gw = SystemGateway::new();
    let registry = Registry::load(&gw);
    debug!(
        "settings from {}, {} jails",
        registry.settings_path.display(),
        registry.jails().len()
    );

    if command.mutates() && std::env::var("JMGR_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = jmgr_runtime::check_jail_prereqs(registry.use_volumes);
        if !missing.is_empty() {
            eprintln!("error: {}", jmgr_runtime::format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let operator = TerminalOperator::new();
    let mut engine = Engine::new(registry, &gw, &operator);

    let result = match command {
        Commands::Jails => commands::list::run(engine.registry(), false, json),
        Commands::Runs => commands::list::run(engine.registry(), true, json),
        Commands::Show { name } => commands::show::run(engine.registry(), &name, json),
        Commands::Config => commands::config::run(engine.registry(), json),
        Commands::Doctor => commands::doctor::run(engine.registry(), &gw, json),
        Commands::Enable { name } => commands::boot::enable(&mut engine, &name),
        Commands::Disable { name } => commands::boot::disable(&mut engine, &name),
        Commands::Enter { name, user } => {
            commands::enter::run(&engine, &name, user.as_deref())
        }
        Commands::Start { all, names } => {
            commands::transition::run(&mut engine, Transition::Start, &names, all)
        }
        Commands::Stop { all, names } => {
            commands::transition::run(&mut engine, Transition::Stop, &names, all)
        }
        Commands::Restart { all, names } => {
            commands::transition::run(&mut engine, Transition::Restart, &names, all)
        }
        Commands::Create {
            force,
            release,
            name,
            ip,
            interface,
        } => commands::create::create(
            &mut engine,
            &JailArgs {
                name: &name,
                ip: ip.as_deref(),
                interface: interface.as_deref(),
                force,
            },
            release.as_deref(),
        ),
        Commands::Clone {
            force,
            source,
            name,
            ip,
            interface,
        } => commands::create::clone(
            &mut engine,
            &source,
            &JailArgs {
                name: &name,
                ip: ip.as_deref(),
                interface: interface.as_deref(),
                force,
            },
        ),
        Commands::Snapshot { name } => commands::snapshot::take(&mut engine, &name),
        Commands::Rollback {
            force,
            name,
            snapshot,
        } => commands::snapshot::rollback(&mut engine, &name, &snapshot, force),
        Commands::Destroy {
            force,
            recursive,
            targets,
        } => commands::destroy::run(&mut engine, &targets, DestroyOptions { force, recursive }),
        Commands::Update {
            force,
            release,
            target,
            name,
        } => commands::update::run(&mut engine, target, &name, release.as_deref(), force),
        Commands::Completions { .. } | Commands::ManPages { .. } => Ok(commands::EXIT_SUCCESS),
    };

    if result.is_err() {
        operator.fail();
    }
    exit(result)
}

fn exit(result: Result<u8, String>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
