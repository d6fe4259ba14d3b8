//! `pgm`: exact inference over discrete graphical models.
//!
//! - `query`: conditional distribution of variables given evidence
//! - `mpe`: most probable explanation given evidence
//! - `order`: elimination order chosen by a heuristic
//! - `config show`: effective engine configuration
//! - `completions`: shell completion scripts

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use pgm_common::{format_error_human, Assignment, Error, OutputFormat, StructuredError, Value};
use pgm_config::{load_config, ConfigPath, EngineConfig, HeuristicKind};
use pgm_core::exit_codes::ExitCode;
use pgm_core::inference::{factor_neighbors, EliminationStep, QueryEngine};
use pgm_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, Stage,
};
use pgm_core::Model;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{error, info};

/// Exact inference for discrete probabilistic graphical models
#[derive(Parser)]
#[command(name = "pgm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Engine config file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log level (overrides PGM_LOG and RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format (overrides PGM_LOG_FORMAT)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Conditional distribution of query variables given evidence
    Query(QueryArgs),

    /// Most probable explanation given evidence
    Mpe(MpeArgs),

    /// Show the elimination order a heuristic picks
    Order(OrderArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Query(_) => "query",
            Commands::Mpe(_) => "mpe",
            Commands::Order(_) => "order",
            Commands::Config(_) => "config",
            Commands::Completions(_) => "completions",
        }
    }
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Model file (JSON)
    model: PathBuf,

    /// Query variable ids
    #[arg(required = true)]
    vars: Vec<String>,

    /// Observed values as id=value (repeatable or comma separated)
    #[arg(long, short = 'e', value_delimiter = ',')]
    evidence: Vec<String>,
}

#[derive(Args, Debug)]
struct MpeArgs {
    /// Model file (JSON)
    model: PathBuf,

    /// Elimination order; defaults to the configured heuristic over all
    /// variables
    #[arg(long, value_delimiter = ',')]
    order: Option<Vec<String>>,

    /// Observed values as id=value (repeatable or comma separated)
    #[arg(long, short = 'e', value_delimiter = ',')]
    evidence: Vec<String>,
}

#[derive(Args, Debug)]
struct OrderArgs {
    /// Model file (JSON)
    model: PathBuf,

    /// Heuristic; defaults to the configured one
    #[arg(long, value_enum)]
    heuristic: Option<HeuristicKind>,

    /// Variables to rank; defaults to every scope variable
    #[arg(long, value_delimiter = ',')]
    vars: Option<Vec<String>>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration and where it came from
    Show,
}

#[derive(Args, Debug)]
struct CompletionsArgs {
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid evidence '{0}': expected id=value")]
    Evidence(String),

    #[error(transparent)]
    Engine(#[from] Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Evidence(_) => ExitCode::ArgsError,
            CliError::Engine(e) => ExitCode::for_error(e),
        }
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::from_env(cli_log_level(&cli.global), cli.global.log_format);
    init_logging(&log_config);

    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id);
    let _guard = span.enter();
    info!(
        target: event_names::RUN_STARTED,
        stage = %Stage::Init,
        command = cli.command.name(),
        "run started"
    );

    let exit_code = match dispatch(&cli, &run_id) {
        Ok(()) => ExitCode::Ok,
        Err(e) => {
            let code = e.exit_code();
            error!(target: event_names::QUERY_FAILED, exit_code = code.as_i32(), error = %e, "command failed");
            output_error(&cli.global, &e, code);
            code
        }
    };

    info!(
        target: event_names::RUN_FINISHED,
        stage = %Stage::Report,
        exit_code = exit_code.as_i32(),
        "run finished"
    );
    std::process::exit(exit_code.as_i32());
}

/// CLI flags to a log level; `None` leaves the environment in charge.
fn cli_log_level(global: &GlobalOpts) -> Option<LogLevel> {
    if let Some(level) = global.log_level {
        return Some(level);
    }
    if global.quiet {
        return Some(LogLevel::Error);
    }
    if global.verbose == 0 {
        return None;
    }
    let mut level = LogLevel::Warn;
    for _ in 0..global.verbose {
        level = level.louder();
    }
    Some(level)
}

fn dispatch(cli: &Cli, run_id: &str) -> CliResult<()> {
    match &cli.command {
        Commands::Query(args) => run_query(&cli.global, args, run_id),
        Commands::Mpe(args) => run_mpe(&cli.global, args, run_id),
        Commands::Order(args) => run_order(&cli.global, args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(&cli.global),
        },
        Commands::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "pgm", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn engine_config(global: &GlobalOpts) -> CliResult<(EngineConfig, ConfigPath)> {
    let (config, path) =
        load_config(global.config.as_deref()).map_err(|e| Error::Config(e.to_string()))?;
    info!(
        target: event_names::CONFIG_LOADED,
        stage = %Stage::Init,
        source = %path.source,
        heuristic = %config.heuristic,
        "config loaded"
    );
    Ok((config, path))
}

fn load_model(path: &std::path::Path) -> CliResult<Model> {
    let model = Model::from_file(path)?;
    info!(
        target: event_names::MODEL_LOADED,
        stage = %Stage::Load,
        variables = model.variable_ids().len(),
        "model ready"
    );
    Ok(model)
}

/// Parse `id=value` pairs.
fn parse_evidence(raw: &[String]) -> CliResult<Assignment> {
    let mut evidence = Assignment::new();
    for item in raw {
        let (id, value) = item
            .split_once('=')
            .ok_or_else(|| CliError::Evidence(item.clone()))?;
        let id = id.trim();
        if id.is_empty() || evidence.contains(id) {
            return Err(CliError::Evidence(item.clone()));
        }
        let value: Value = value.parse().map_err(|_| CliError::Evidence(item.clone()))?;
        evidence.insert(id.to_string(), value);
    }
    Ok(evidence)
}

#[derive(Serialize)]
struct DistributionRow {
    assignment: Assignment,
    unnormalized: f64,
    probability: f64,
}

#[derive(Serialize)]
struct QueryReport<'a> {
    run_id: &'a str,
    command: &'static str,
    query: &'a [String],
    evidence: &'a Assignment,
    /// Evidence ids no factor mentions.
    unused_evidence: &'a Assignment,
    alpha: f64,
    log_alpha: f64,
    distribution: Vec<DistributionRow>,
    steps: &'a [EliminationStep],
}

fn run_query(global: &GlobalOpts, args: &QueryArgs, run_id: &str) -> CliResult<()> {
    let (config, _) = engine_config(global)?;
    let model = load_model(&args.model)?;
    let evidence = parse_evidence(&args.evidence)?;
    let engine = QueryEngine::new(config.clone());

    let marginal = engine.conditional(model.factors().to_vec(), &args.vars, &evidence)?;
    let distribution: Vec<DistributionRow> = marginal
        .rows()
        .into_iter()
        .map(|(assignment, unnormalized, probability)| DistributionRow {
            assignment,
            unnormalized,
            probability,
        })
        .collect();

    info!(stage = %Stage::Report, rows = distribution.len(), "rendering query result");
    match global.format {
        OutputFormat::Json => {
            let report = QueryReport {
                run_id,
                command: "query",
                query: &args.vars,
                evidence: &evidence,
                unused_evidence: &marginal.evidence.unused,
                alpha: marginal.alpha,
                log_alpha: marginal.log_alpha,
                distribution,
                steps: &marginal.steps,
            };
            print_json(&report)?;
        }
        OutputFormat::Human => {
            let p = config.precision;
            let given = if evidence.is_empty() {
                String::new()
            } else {
                format!(" | {}", evidence)
            };
            println!("P({}{})  alpha = {:.p$}", args.vars.join(", "), given, marginal.alpha);
            for row in &distribution {
                println!("  {:<24} {:.p$}", row.assignment.to_string(), row.probability);
            }
            print_unused_evidence(&marginal.evidence.unused);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct MpeReport<'a> {
    run_id: &'a str,
    command: &'static str,
    evidence: &'a Assignment,
    unused_evidence: &'a Assignment,
    order: &'a [String],
    assignment: &'a Assignment,
    probability: f64,
    log_probability: f64,
    steps: &'a [EliminationStep],
}

fn run_mpe(global: &GlobalOpts, args: &MpeArgs, run_id: &str) -> CliResult<()> {
    let (config, _) = engine_config(global)?;
    let model = load_model(&args.model)?;
    let evidence = parse_evidence(&args.evidence)?;
    let engine = QueryEngine::new(config.clone());

    let mpe = match &args.order {
        Some(order) => engine.mpe(model.factors().to_vec(), order, &evidence)?,
        None => engine.mpe_auto(model.factors().to_vec(), &evidence)?,
    };
    let order: Vec<String> = mpe.steps.iter().map(|s| s.variable.clone()).collect();

    info!(stage = %Stage::Report, probability = mpe.probability, "rendering mpe result");
    match global.format {
        OutputFormat::Json => print_json(&MpeReport {
            run_id,
            command: "mpe",
            evidence: &evidence,
            unused_evidence: &mpe.evidence.unused,
            order: &order,
            assignment: &mpe.assignment,
            probability: mpe.probability,
            log_probability: mpe.log_probability,
            steps: &mpe.steps,
        })?,
        OutputFormat::Human => {
            let p = config.precision;
            println!("MPE  p = {:.p$}", mpe.probability);
            for (id, value) in mpe.assignment.iter() {
                println!("  {:<16} {}", id, value);
            }
            print_unused_evidence(&mpe.evidence.unused);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct OrderReport<'a> {
    command: &'static str,
    heuristic: &'static str,
    order: &'a [String],
}

fn run_order(global: &GlobalOpts, args: &OrderArgs) -> CliResult<()> {
    let (mut config, _) = engine_config(global)?;
    if let Some(h) = args.heuristic {
        config.heuristic = h;
    }
    let model = load_model(&args.model)?;
    let variables = match &args.vars {
        Some(vs) => vs.clone(),
        None => model.variable_ids(),
    };
    let engine = QueryEngine::new(config.clone());
    let neighbors = factor_neighbors(model.factors());
    let order = engine.order_for(&variables, &neighbors)?.sequence();

    match global.format {
        OutputFormat::Json => print_json(&OrderReport {
            command: "order",
            heuristic: config.heuristic.as_str(),
            order: &order,
        })?,
        OutputFormat::Human => {
            for (rank, id) in order.iter().enumerate() {
                println!("{:>3}  {}", rank, id);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    source: String,
    path: Option<String>,
    config: &'a EngineConfig,
}

fn run_config_show(global: &GlobalOpts) -> CliResult<()> {
    let (config, path) = engine_config(global)?;
    match global.format {
        OutputFormat::Json => print_json(&ConfigReport {
            source: path.source.to_string(),
            path: path.path.as_ref().map(|p| p.display().to_string()),
            config: &config,
        })?,
        OutputFormat::Human => {
            let rendered = config.to_toml().map_err(|e| Error::Config(e.to_string()))?;
            match &path.path {
                Some(p) => println!("# source: {} ({})", path.source, p.display()),
                None => println!("# source: {}", path.source),
            }
            print!("{}", rendered);
        }
    }
    Ok(())
}

fn print_unused_evidence(unused: &Assignment) {
    if !unused.is_empty() {
        println!("  (ignored evidence: {})", unused);
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(Error::from)?;
    println!("{}", text);
    Ok(())
}

fn output_error(global: &GlobalOpts, err: &CliError, code: ExitCode) {
    match global.format {
        OutputFormat::Json => {
            let payload = match err {
                CliError::Engine(e) => serde_json::json!({
                    "exit_code": code.code_name(),
                    "error": StructuredError::from(e),
                }),
                CliError::Evidence(_) => serde_json::json!({
                    "exit_code": code.code_name(),
                    "error": { "message": err.to_string() },
                }),
            };
            println!("{}", payload);
        }
        OutputFormat::Human => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            match err {
                CliError::Engine(e) => eprintln!("{}", format_error_human(e, use_color)),
                CliError::Evidence(_) => eprintln!("✗ {}", err),
            }
        }
    }
}
