//! Rule tracer CLI.
//!
//! Provides the `ruletrace` binary:
//! - `trace` evaluates an expression against a JSON environment and prints
//!   the trace as JSON
//! - `atoms` lists the atoms of an expression with their fingerprints, for
//!   authoring spec files
//! - `fingerprint` prints the fingerprint of a canonical string
//! - `validate` checks a spec file
//! - `playground` traces a built-in demo rule
//!
//! Tracer options come from `--config` (a JSON [`TracerConfig`]), then the
//! `RULETRACE_MODE` environment variable, then explicit flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::Level;

use ruletrace_tracer::{
    fingerprint, validate_specs, validate_specs_strict, ConditionSpec, Env, SpecMap, TraceError,
    TraceMode, Tracer, TracerConfig, Value,
};

/// Environment variable naming the default trace mode.
const MODE_VAR: &str = "RULETRACE_MODE";

/// Explainable rule evaluation.
#[derive(Parser)]
#[command(name = "ruletrace", about = "Explainable rule evaluation")]
struct Cli {
    /// Log debug events to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Trace an expression.
    Trace {
        /// Expression source.
        #[arg(short, long)]
        expr: String,

        #[command(flatten)]
        inputs: TraceInputs,
    },

    /// List the atoms of an expression with canonical text and fingerprint.
    Atoms {
        #[arg(short, long)]
        expr: String,
    },

    /// Print the fingerprint of a canonical string.
    Fingerprint { text: String },

    /// Validate a spec file.
    Validate {
        /// Path to a JSON object mapping fingerprints to specs.
        #[arg(short, long)]
        specs: PathBuf,

        /// Also reject IDs shared by more than one fingerprint.
        #[arg(long)]
        strict: bool,
    },

    /// Trace the built-in demo rule.
    Playground {
        #[command(flatten)]
        inputs: TraceInputs,
    },
}

#[derive(clap::Args)]
struct TraceInputs {
    /// Path to a JSON object used as the environment.
    #[arg(long)]
    env: Option<PathBuf>,

    /// Path to a JSON object mapping fingerprints to specs.
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Path to a JSON tracer config.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trace mode: none, coarse, atomic, atomic_failures_only.
    #[arg(short, long)]
    mode: Option<TraceMode>,

    /// Evaluate every operand instead of simulating short-circuits.
    #[arg(long)]
    no_short_circuit: bool,

    /// Do not instrument spec'd atoms.
    #[arg(long)]
    no_cond: bool,

    /// Exit with an error when the expression does not compile.
    #[arg(long)]
    strict: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let exit_code = match cli.command {
        Commands::Trace { expr, inputs } => run_trace(&expr, &inputs, None),
        Commands::Atoms { expr } => run_atoms(&expr),
        Commands::Fingerprint { text } => {
            println!("{}", fingerprint(&text));
            0
        }
        Commands::Validate { specs, strict } => run_validate(&specs, strict),
        Commands::Playground { inputs } => {
            let (env, specs) = playground();
            run_trace(PLAYGROUND_RULE, &inputs, Some((env, specs)))
        }
    };
    process::exit(exit_code);
}

/// Execute the trace subcommand.
///
/// Returns exit code: 0 = success, 1 = bad input or strict compile failure,
/// 3 = I/O error.
fn run_trace(expr: &str, inputs: &TraceInputs, defaults: Option<(Env, SpecMap)>) -> i32 {
    let config = match resolve_config(inputs) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let (default_env, default_specs) = defaults.unwrap_or_default();

    let env = match &inputs.env {
        Some(path) => match read_json::<serde_json::Value>(path).map(Value::env_from_json) {
            Ok(Some(env)) => env,
            Ok(None) => {
                eprintln!("Error: environment '{}' must be a JSON object", path.display());
                return 1;
            }
            Err(code) => return code,
        },
        None => default_env,
    };
    let specs = match &inputs.specs {
        Some(path) => match load_specs(path) {
            Ok(specs) => specs,
            Err(code) => return code,
        },
        None => default_specs,
    };
    if let Err(e) = validate_specs(&specs) {
        eprintln!("Error: {}", e);
        return 1;
    }

    let tracer = Tracer::new(env).with_config(config);
    if inputs.strict {
        match tracer.trace_strict(expr, &specs) {
            Ok(result) => print_json(&result),
            Err(e @ TraceError::Compile { .. }) => {
                print_json(e.partial());
                eprintln!("Error: {}", e);
                1
            }
        }
    } else {
        print_json(&tracer.trace(expr, &specs))
    }
}

/// Config file, then `RULETRACE_MODE`, then flags.
fn resolve_config(inputs: &TraceInputs) -> Result<TracerConfig, i32> {
    let mut config = match &inputs.config {
        Some(path) => read_json::<TracerConfig>(path)?,
        None => TracerConfig::default(),
    };
    if let Ok(mode) = std::env::var(MODE_VAR) {
        config.mode = mode.parse().map_err(|e| {
            eprintln!("Error: {}: {}", MODE_VAR, e);
            1
        })?;
    }
    if let Some(mode) = inputs.mode {
        config.mode = mode;
    }
    if inputs.no_short_circuit {
        config.short_circuit = false;
    }
    if inputs.no_cond {
        config.enable_cond = false;
    }
    Ok(config)
}

fn run_atoms(expr: &str) -> i32 {
    match Tracer::new(Env::new()).atoms(expr) {
        Ok(atoms) => print_json(&atoms),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn run_validate(path: &Path, strict: bool) -> i32 {
    let specs = match load_specs(path) {
        Ok(specs) => specs,
        Err(code) => return code,
    };
    let checked = if strict {
        validate_specs_strict(&specs)
    } else {
        validate_specs(&specs)
    };
    match checked {
        Ok(()) => {
            println!("{} spec(s) ok", specs.len());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn load_specs(path: &Path) -> Result<SpecMap, i32> {
    read_json(path)
}

/// Reads and deserializes a JSON file. I/O failures exit with 3, malformed
/// content with 1.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })?;
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("Error: invalid JSON in '{}': {}", path.display(), e);
        1
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize result: {}", e);
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Playground
// ---------------------------------------------------------------------------

const PLAYGROUND_RULE: &str = r#"user.Group in ["admin", "moderator"] || user.Id == comment.UserId || len(tweets) > 1 || user.Name == "John Doe""#;

/// Demo environment and specs for [`PLAYGROUND_RULE`].
fn playground() -> (Env, SpecMap) {
    let env = Value::env_from_json(json!({
        "user": {"Group": "admin", "Id": 1, "Name": "John Doe"},
        "comment": {"UserId": 1},
        "tweets": ["t1", "t2", "t3"],
    }))
    .unwrap_or_default();

    let specs = [
        (r#"user.Group in ["admin", "moderator"]"#, "c_group", "GROUP_ALLOWED", "GROUP_NOT_ALLOWED"),
        ("user.Id == comment.UserId", "c_owner", "IS_OWNER", "NOT_OWNER"),
        ("len(tweets) > 1", "c_tweets", "HAS_TWEETS", "NO_TWEETS"),
        (r#"user.Name == "John Doe""#, "c_name", "NAME_MATCH", "NAME_MISMATCH"),
    ]
    .into_iter()
    .map(|(expr, id, t, f)| (fingerprint(expr), ConditionSpec::new(id, t, f)))
    .collect();

    (env, specs)
}
