use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use db_infra::config::db::RuntimeEnv;
use db_infra::infra::db::orchestrate_migration;
use migration::MigrationCommand;

const DEFAULT_MIGRATIONS_DIR: &str = "./internal/migrations";

#[derive(Clone, ValueEnum)]
enum Env {
    Prod,
    Test,
}

#[derive(Parser)]
#[command(name = "migration-cli")]
#[command(about = "Readit database migration tool")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Runtime environment
    #[arg(short, long, value_enum, default_value = "prod")]
    env: Env,

    /// Migrations directory (falls back to READIT_MIGRATIONS_DIR)
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a new <version>_<name>.up.sql / .down.sql pair
    Create { name: String },
    /// Apply all pending migrations
    Up,
    /// Revert the most recently applied migrations
    Down {
        #[arg(default_value_t = 1)]
        steps: u64,
    },
    /// Migrate up or down to a specific version
    Goto { version: i64 },
    /// Set the recorded version without running scripts (-1 resets to nil)
    Force {
        #[arg(allow_hyphen_values = true)]
        version: i64,
    },
    /// Print the current version and dirty flag
    Version,
}

fn migrations_dir(args: &Args) -> PathBuf {
    args.dir
        .clone()
        .or_else(|| std::env::var_os("READIT_MIGRATIONS_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MIGRATIONS_DIR))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter("migration=info,db_infra=info,sqlx=warn")
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let dir = migrations_dir(&args);

    // Create only touches the filesystem; no database connection needed.
    if let Command::Create { name } = &args.command {
        match migration::create_migration(&dir, name) {
            Ok(created) => {
                println!("{}", created.up.display());
                println!("{}", created.down.display());
            }
            Err(e) => {
                eprintln!("Create failed: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let command = match args.command {
        Command::Up => MigrationCommand::Up,
        Command::Down { steps } => MigrationCommand::Down { steps },
        Command::Goto { version } => MigrationCommand::Goto { version },
        Command::Force { version } => MigrationCommand::Force { version },
        Command::Version => MigrationCommand::Version,
        Command::Create { .. } => unreachable!("create handled above"),
    };

    let env = match args.env {
        Env::Prod => RuntimeEnv::Prod,
        Env::Test => RuntimeEnv::Test,
    };

    if let Err(e) = orchestrate_migration(env, &dir, command).await {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}
