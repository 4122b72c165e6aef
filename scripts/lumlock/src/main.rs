use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lumen::data::{LumenConfig, LumenCtx};
use lumen::library::{BatchStatus, LockOptions, Locker, LockerConfig};
use lumen::registry::ComponentRegistry;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Lock and compare photonic components against the reference GDS library"
)]
pub struct Args {
    /// Path to a lumen.toml configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// The reference library directory (overrides the config file).
    #[arg(long)]
    library: Option<PathBuf>,
    /// The scratch directory for test builds (overrides the config file).
    #[arg(long)]
    test_dir: Option<PathBuf>,
    /// Write a geometry overlay GDS for every mismatch.
    #[arg(long)]
    overlay: bool,
    /// Skip the best-effort `git pull` of the library directory.
    #[arg(long)]
    no_pull: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build one component and lock it into the reference library.
    Lock {
        /// The registered component-type name.
        component_type: String,
    },
    /// Re-lock every component whose geometry hash changed.
    LockChanged,
    /// Report which components changed, without touching the library.
    Report,
    /// Fail if any component differs from the locked reference.
    Assert,
}

fn run(args: Args) -> lumen::error::Result<bool> {
    let config = match &args.config {
        Some(path) => LockerConfig::load(path)?,
        None => LockerConfig::discover()?,
    };
    let path_library = args.library.clone().unwrap_or(config.gdslib);
    let path_test = args.test_dir.clone().unwrap_or(config.gdslib_test);

    let mut builder = LumenConfig::builder();
    if let Some(technology) = &config.technology {
        builder.technology(technology.to_technology());
    }
    let ctx = LumenCtx::from_config(builder.build())?;
    let registry = ComponentRegistry::standard()?;
    let locker = Locker::new(registry, path_library, path_test).with_options(LockOptions {
        write_overlay: args.overlay,
        ..Default::default()
    });

    match args.command {
        Command::Lock { component_type } => {
            locker.lock(&ctx, &component_type)?;
            println!("locked {component_type}");
            Ok(true)
        }
        Command::LockChanged => {
            if !args.no_pull {
                locker.pull_library();
            }
            let records = locker.lock_changed(&ctx);
            print_records(&records);
            Ok(records
                .iter()
                .all(|r| !matches!(r.status, BatchStatus::Failed(_))))
        }
        Command::Report => {
            if !args.no_pull {
                locker.pull_library();
            }
            let records = locker.report_changed(&ctx);
            print_records(&records);
            Ok(records
                .iter()
                .all(|r| !matches!(r.status, BatchStatus::Failed(_))))
        }
        Command::Assert => {
            if !args.no_pull {
                locker.pull_library();
            }
            locker.assert_unchanged(&ctx)?;
            println!("all components match the reference library");
            Ok(true)
        }
    }
}

fn print_records(records: &[lumen::library::BatchRecord]) {
    for record in records {
        match &record.status {
            BatchStatus::Unchanged => println!("[ok]      {}", record.component_type),
            BatchStatus::New => println!("[new]     {}", record.component_type),
            BatchStatus::Changed { diff } => {
                println!("[changed] {}", record.component_type);
                if !diff.is_empty() {
                    for line in diff.to_string().lines() {
                        println!("          {line}");
                    }
                }
            }
            BatchStatus::Failed(message) => {
                println!("[failed]  {}: {}", record.component_type, message)
            }
        }
    }
}

pub fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
