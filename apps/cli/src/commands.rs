//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};

use coursepath_audit::{AssembleOptions, parse_audit, render_audit};
use coursepath_catalog::{CourseIndex, load_course_index, load_schema};
use coursepath_core::{PipelineOptions, ProgramSelection, run as run_pipeline};
use coursepath_shared::{
    AppConfig, CoursePathError, ParsedAudit, Term, init_config, load_config,
};

use crate::output;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CoursePath: check a degree audit and plan the remaining courses.
#[derive(Parser)]
#[command(
    name = "coursepath",
    version,
    about = "Check a degree audit against program requirements and plan remaining courses.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn from_config(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(eyre!("unknown output format '{other}' in config: expected 'text' or 'json'")),
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse an audit and print its structure.
    Parse {
        /// Audit text file, or `-` for stdin.
        audit: String,

        /// Only show the section with this name (case-insensitive).
        #[arg(long)]
        section: Option<String>,

        /// Output format (defaults to config, then text).
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// Check an audit against its program and list remaining courses.
    Check(CheckArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `check`.
#[derive(clap::Args)]
pub(crate) struct CheckArgs {
    /// Audit text file, or `-` for stdin.
    pub audit: String,

    /// Requirement schema file (.json or .toml).
    #[arg(long, env = "COURSEPATH_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Course offerings index file (.json or .toml).
    #[arg(long, env = "COURSEPATH_INDEX")]
    pub index: Option<PathBuf>,

    /// Major to check (defaults to the one named in the audit).
    #[arg(long)]
    pub major: Option<String>,

    /// Subplan to check (defaults to the one named in the audit).
    #[arg(long)]
    pub subplan: Option<String>,

    /// Ignore offerings before this term, e.g. "Winter 2026".
    #[arg(long)]
    pub from_term: Option<String>,

    /// Limit candidates listed per requirement.
    #[arg(long)]
    pub max_candidates: Option<usize>,

    /// Output format (defaults to config, then text).
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "coursepath=info",
        1 => "coursepath=debug",
        _ => "coursepath=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Reports go to stdout; keep logs on stderr.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse {
            audit,
            section,
            format,
        } => cmd_parse(&audit, section.as_deref(), format),
        Command::Check(args) => cmd_check(&args),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_parse(source: &str, section: Option<&str>, format: Option<OutputFormat>) -> Result<()> {
    let config = load_config()?;
    let format = resolve_format(format, &config)?;
    let text = read_audit(source)?;

    let options = AssembleOptions {
        retake_policy: config.matching.retake_policy,
    };
    let mut audit = parse_audit(&text, &options)?;

    for line in &audit.diagnostics.unparsed_lines {
        warn!(line = line.line_number, text = %line.text, "Unparsed course line");
    }
    for warning in &audit.diagnostics.warnings {
        warn!("{warning}");
    }
    if let Some(name) = section {
        keep_section(&mut audit, name)?;
    }

    match format {
        OutputFormat::Text => print!("{}", render_audit(&audit)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&audit)?),
    }
    Ok(())
}

fn cmd_check(args: &CheckArgs) -> Result<()> {
    let config = load_config()?;
    let format = resolve_format(args.format, &config)?;
    let options = check_options(args, &config)?;

    let schema_path = args
        .schema
        .clone()
        .or_else(|| config.defaults.schema_path.as_ref().map(PathBuf::from))
        .ok_or_else(|| eyre!("no requirement schema: pass --schema or set defaults.schema_path"))?;
    let schema = load_schema(&schema_path)?;

    let index_path = args
        .index
        .clone()
        .or_else(|| config.defaults.index_path.as_ref().map(PathBuf::from));
    let index = index_path.as_deref().and_then(load_index);

    let text = read_audit(&args.audit)?;
    let output = run_pipeline(&text, &schema, index.as_ref(), &options)?;

    match format {
        OutputFormat::Text => print!("{}", output::render_check(&output)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Flags override config, which overrides defaults.
fn check_options(args: &CheckArgs, config: &AppConfig) -> Result<PipelineOptions> {
    let mut options = PipelineOptions::from(config);
    options.selection = ProgramSelection {
        major: args.major.clone(),
        subplan: args.subplan.clone(),
    };
    if let Some(label) = &args.from_term {
        let term = Term::parse(label)
            .ok_or_else(|| eyre!("unrecognized term '{label}': expected e.g. 'Winter 2026'"))?;
        options.planning.not_before = Some(term);
    }
    if args.max_candidates.is_some() {
        options.planning.max_candidates_per_slot = args.max_candidates;
    }
    Ok(options)
}

/// Narrow an audit to one named section.
fn keep_section(audit: &mut ParsedAudit, name: &str) -> Result<()> {
    let found = audit
        .section(name)
        .cloned()
        .ok_or_else(|| eyre!("no section named '{name}' in audit"))?;
    audit.sections = vec![found];
    Ok(())
}

fn resolve_format(flag: Option<OutputFormat>, config: &AppConfig) -> Result<OutputFormat> {
    match flag {
        Some(format) => Ok(format),
        None => OutputFormat::from_config(&config.defaults.format),
    }
}

/// A missing or unreadable index degrades planning instead of failing the run.
fn load_index(path: &Path) -> Option<CourseIndex> {
    match load_course_index(path) {
        Ok(index) => {
            info!(courses = index.len(), "Loaded course index");
            Some(index)
        }
        Err(err @ CoursePathError::CourseIndexUnavailable { .. }) => {
            warn!(%err, "Continuing without course index");
            None
        }
        Err(err) => {
            warn!(%err, "Unexpected error loading course index");
            None
        }
    }
}

fn read_audit(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(source).map_err(|e| eyre!("cannot read audit '{source}': {e}"))
}
