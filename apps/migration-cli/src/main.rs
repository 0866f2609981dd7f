use clap::{Parser, ValueEnum};
use migration::{migrate, MigrationCommand};
use sea_orm::{ConnectOptions, Database};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Command {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
}

impl From<Command> for MigrationCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Up => MigrationCommand::Up,
            Command::Down => MigrationCommand::Down,
            Command::Fresh => MigrationCommand::Fresh,
            Command::Reset => MigrationCommand::Reset,
            Command::Refresh => MigrationCommand::Refresh,
            Command::Status => MigrationCommand::Status,
        }
    }
}

#[derive(Parser)]
#[command(name = "migration-cli")]
#[command(about = "Gamehall ledger database migration tool")]
struct Args {
    /// Migration command to run
    #[arg(value_enum)]
    command: Command,

    /// Postgres or file-backed SQLite URL, e.g. `sqlite://./gamehall.db?mode=rwc`
    #[arg(short, long, env = "DATABASE_URL")]
    url: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_env_filter("migration=info,sqlx=warn")
        .init();

    let args = Args::parse();

    // Each connection to an in-memory database is a fresh, empty database.
    if args.url.starts_with("sqlite::memory:") || args.url.contains("mode=memory") {
        eprintln!("❌ In-memory SQLite is not supported: the schema would vanish on exit.");
        std::process::exit(2);
    }

    let mut options = ConnectOptions::new(args.url);
    options.sqlx_logging(false);
    let conn = match Database::connect(options).await {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("❌ Could not connect: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = migrate(&conn, args.command.into()).await {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}
