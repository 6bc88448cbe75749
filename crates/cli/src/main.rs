mod error_presentation;

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use error_presentation::{CliError, CliResult, render_runtime_error};
use sqlregress_core::{
    ConnectionConfig, DependencyPolicy, Engine, FailureMode, Harness, HarnessConfig, TestReport,
};
use sqlregress_testkit::{
    ReportFile, compare_reports, load_reports_from_dir, registry_from_dir,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_FILTER_ENV: &str = "RUST_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "sqlregress", version, about = "Run SQL regression fixtures against a database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run fixtures against a PostgreSQL-compatible server.
    #[cfg(feature = "postgres")]
    Postgres(PostgresArgs),
    /// Run fixtures against a SQLite database file (or `:memory:`).
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteArgs),
    /// Compare two report directories and print a markdown summary.
    Compare(CompareArgs),
}

#[cfg(feature = "postgres")]
#[derive(Debug, Args)]
struct PostgresArgs {
    database: String,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Unix socket directory; takes precedence over --host.
    #[arg(long)]
    socket: Option<String>,
    #[command(flatten)]
    run: RunArgs,
}

#[cfg(feature = "sqlite")]
#[derive(Debug, Args)]
struct SqliteArgs {
    database: String,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Directory of `*.yaml` fixture files.
    #[arg(long)]
    fixtures: PathBuf,
    /// Fixture to run; repeatable. Defaults to every fixture not marked skip.
    #[arg(long = "target", value_name = "NAME")]
    targets: Vec<String>,
    #[arg(long)]
    fail_fast: bool,
    /// Run dependencies for their side effects only, ignoring their results.
    #[arg(long)]
    dependencies_side_effects_only: bool,
    /// Initial session variable, as NAME=VALUE; repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_variable)]
    variables: Vec<(String, String)>,
    /// Write one report file per target into this directory.
    #[arg(long)]
    report_dir: Option<PathBuf>,
    /// Give every target its own session, running disjoint targets in parallel.
    #[arg(long)]
    isolated: bool,
}

#[derive(Debug, Args)]
struct CompareArgs {
    from: PathBuf,
    to: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{}", render_runtime_error(error));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> CliResult<bool> {
    match cli.command {
        #[cfg(feature = "postgres")]
        Command::Postgres(args) => {
            let connection = ConnectionConfig {
                host: args.host,
                port: args.port,
                user: args.user,
                password: args.password,
                socket: args.socket,
                ..ConnectionConfig::for_database(args.database)
            };
            run_fixtures(&sqlregress_postgres::PostgresEngine, connection, args.run)
        }
        #[cfg(feature = "sqlite")]
        Command::Sqlite(args) => run_fixtures(
            &sqlregress_sqlite::SqliteEngine,
            ConnectionConfig::for_database(args.database),
            args.run,
        ),
        Command::Compare(args) => compare(&args),
    }
}

fn run_fixtures(engine: &dyn Engine, connection: ConnectionConfig, args: RunArgs) -> CliResult<bool> {
    let registry = registry_from_dir(&args.fixtures).map_err(|source| CliError::LoadFixtures {
        dir: args.fixtures.clone(),
        source,
    })?;

    let targets = if args.targets.is_empty() {
        registry
            .fixtures()
            .filter(|fixture| fixture.skip.is_none())
            .map(|fixture| fixture.name.to_string())
            .collect()
    } else {
        args.targets
    };

    let mut config = HarnessConfig::new(connection);
    config.variables.extend(args.variables);
    if args.fail_fast {
        config.failure_mode = FailureMode::FailFast;
    }
    if args.dependencies_side_effects_only {
        config.dependency_policy = DependencyPolicy::SideEffectsOnly;
    }

    info!(engine = engine.name(), targets = targets.len(), "starting run");
    let harness = Harness::new(&registry, engine, config);
    let reports = if args.isolated {
        harness.run_isolated(&targets)?
    } else {
        harness.run_fixtures(&targets)?
    };

    for report in &reports {
        println!("{report}");
    }
    if let Some(dir) = &args.report_dir {
        write_reports(dir, &reports)?;
    }

    Ok(reports.iter().all(TestReport::passed))
}

fn write_reports(dir: &std::path::Path, reports: &[TestReport]) -> CliResult<()> {
    for report in reports {
        ReportFile::from_report(report)
            .save(dir)
            .map_err(|source| CliError::WriteReports {
                dir: dir.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

fn compare(args: &CompareArgs) -> CliResult<bool> {
    let read = |dir: &PathBuf| {
        load_reports_from_dir(dir).map_err(|source| CliError::ReadReports {
            dir: dir.clone(),
            source,
        })
    };
    let from = read(&args.from)?;
    let to = read(&args.to)?;

    print!("{}", compare_reports(&from, &to).render_markdown());
    Ok(true)
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}
