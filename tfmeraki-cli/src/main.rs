use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use log::{debug, info};

use tfmeraki_core::diagnostics::{Diagnostic, Diagnostics, Severity};
use tfmeraki_core::matcher::{
    Comparison, DuplicatePolicy, MatchField, RecordMatcher, require_string,
};
use tfmeraki_core::merge::{Precedence, try_merge};
use tfmeraki_core::resource::{ResourceId, Value};
use tfmeraki_core::selector::{PresenceSignature, select_index};
use tfmeraki_provider::{DashboardClient, MerakiProvider, ProviderSettings};
use tfmeraki_state::{LocalBackend, LockInfo, StateBackend};

#[derive(Parser)]
#[command(name = "tfmeraki")]
#[command(version)]
#[command(about = "Reconciliation tools for Dashboard API resources", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the most specific operation whose identifying attributes are all set
    Select {
        /// Presence signature of one candidate, e.g. "true,false" (repeat in order)
        #[arg(long = "signature", short = 's', required = true)]
        signatures: Vec<String>,
    },
    /// Find a record in a JSON list response by an identifying field
    Match {
        /// Path to the JSON response (a list, or an object wrapping one)
        file: PathBuf,

        /// Field to compare
        #[arg(long, default_value = "name")]
        field: MatchField,

        /// Value to look for
        #[arg(long)]
        value: String,

        #[arg(long, value_enum, default_value = "exact")]
        comparison: ComparisonArg,

        /// Fail when more than one record matches
        #[arg(long)]
        reject_duplicates: bool,

        /// Print only this string field of the match instead of the whole record
        #[arg(long)]
        id_field: Option<MatchField>,
    },
    /// Merge a desired JSON object with the object the API returned
    Merge {
        /// Path to the desired object
        desired: PathBuf,

        /// Path to the observed object
        observed: PathBuf,

        /// Which reconciliation to perform
        #[arg(long, value_enum, default_value = "write")]
        mode: MergeMode,
    },
    /// List the resource types the provider manages
    Resources,
    /// Refresh tracked resources from the Dashboard API
    Refresh {
        /// Path to the state file
        #[arg(long, default_value = LocalBackend::DEFAULT_STATE_FILE)]
        state: PathBuf,

        /// Dashboard API base URL (defaults to MERAKI_BASE_URL, then the public API)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// State management commands
    State {
        /// Path to the state file
        #[arg(long, default_value = LocalBackend::DEFAULT_STATE_FILE)]
        state: PathBuf,

        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List tracked resources
    List,
    /// Show the stored attributes of a resource
    Show {
        /// Resource address (type.name)
        address: String,
    },
    /// Stop tracking a resource without touching the remote object
    Rm {
        /// Resource address (type.name)
        address: String,
    },
    /// Remove a lock left behind by an interrupted run
    ForceUnlock {
        /// Lock ID
        lock_id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ComparisonArg {
    Exact,
    CaseInsensitive,
    Trimmed,
}

impl From<ComparisonArg> for Comparison {
    fn from(arg: ComparisonArg) -> Self {
        match arg {
            ComparisonArg::Exact => Comparison::Exact,
            ComparisonArg::CaseInsensitive => Comparison::CaseInsensitive,
            ComparisonArg::Trimmed => Comparison::Trimmed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MergeMode {
    /// After create or update
    Write,
    /// After a read
    Read,
}

impl From<MergeMode> for Precedence {
    fn from(mode: MergeMode) -> Self {
        match mode {
            MergeMode::Write => Precedence::PreferObserved,
            MergeMode::Read => Precedence::PreferObservedKeepDesiredExtras,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();
    debug!("tfmeraki v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Select { signatures } => run_select(&signatures),
        Commands::Match {
            file,
            field,
            value,
            comparison,
            reject_duplicates,
            id_field,
        } => run_match(
            &file,
            field,
            &value,
            comparison.into(),
            reject_duplicates,
            id_field,
        ),
        Commands::Merge {
            desired,
            observed,
            mode,
        } => run_merge(&desired, &observed, mode.into()),
        Commands::Resources => run_resources(),
        Commands::Refresh { state, base_url } => run_refresh(&state, base_url).await,
        Commands::State { state, command } => run_state_command(&state, command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_signature(raw: &str) -> Result<PresenceSignature, String> {
    raw.split(',')
        .map(|part| match part.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(format!(
                "invalid presence flag '{}' in signature '{}', expected true/false",
                other, raw
            )),
        })
        .collect()
}

fn run_select(raw: &[String]) -> Result<(), String> {
    let signatures = raw
        .iter()
        .map(|s| parse_signature(s))
        .collect::<Result<Vec<_>, _>>()?;

    match select_index(&signatures) {
        Some(index) => {
            println!("{}", index);
            Ok(())
        }
        None => Err(format!(
            "no applicable operation among {} candidates",
            signatures.len()
        )),
    }
}

fn read_json(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    Ok(Value::from_json(&json))
}

fn print_json(value: &Value) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(&value.to_json())
        .map_err(|e| format!("Failed to render JSON: {}", e))?;
    println!("{}", rendered);
    Ok(())
}

fn run_match(
    file: &Path,
    field: MatchField,
    value: &str,
    comparison: Comparison,
    reject_duplicates: bool,
    id_field: Option<MatchField>,
) -> Result<(), String> {
    let haystack = read_json(file)?;
    let duplicates = if reject_duplicates {
        DuplicatePolicy::Reject
    } else {
        DuplicatePolicy::FirstMatch
    };
    let matcher = RecordMatcher::new(field)
        .with_comparator(comparison)
        .with_duplicates(duplicates);

    let Some(record) = matcher.find(&haystack, value).map_err(|e| e.to_string())? else {
        println!(
            "{}",
            format!("No record has {} matching '{}'.", field, value).yellow()
        );
        return Ok(());
    };

    match id_field {
        Some(id_field) => {
            let id = require_string(record, id_field).map_err(|e| e.to_string())?;
            println!("{}", id);
            Ok(())
        }
        None => print_json(&Value::Record(record.clone())),
    }
}

fn run_merge(desired: &Path, observed: &Path, precedence: Precedence) -> Result<(), String> {
    let desired = read_json(desired)?;
    let observed = read_json(observed)?;
    if desired.as_record().is_none() || observed.as_record().is_none() {
        return Err("both inputs must be JSON objects".to_string());
    }

    let merged = try_merge(&desired, &observed, precedence).map_err(|e| e.to_string())?;
    print_json(&merged)
}

fn run_resources() -> Result<(), String> {
    for resource_type in tfmeraki_provider::resource_types() {
        println!(
            "  {} {}",
            resource_type.name().cyan(),
            resource_type.description()
        );
    }
    Ok(())
}

async fn run_refresh(path: &Path, base_url: Option<String>) -> Result<(), String> {
    let mut settings = ProviderSettings::new();
    if let Some(base_url) = base_url {
        settings = settings.with_base_url(base_url);
    }
    let provider = MerakiProvider::connect(settings).map_err(|e| e.to_string())?;

    let backend = LocalBackend::with_path(path.to_path_buf());
    let lock = backend
        .acquire_lock(LockInfo::new("refresh"))
        .await
        .map_err(|e| e.to_string())?;

    let result = refresh_state(&backend, &provider).await;

    if let Err(e) = backend.release_lock(&lock).await {
        eprintln!("{} failed to release lock {}: {}", "Warning:".yellow().bold(), lock.id, e);
    }

    let diagnostics = result?;
    print_diagnostics(&diagnostics);
    if diagnostics.has_errors() {
        return Err("refresh finished with errors".to_string());
    }
    Ok(())
}

async fn refresh_state(
    backend: &LocalBackend,
    provider: &MerakiProvider<DashboardClient>,
) -> Result<Diagnostics, String> {
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no state found at {}", backend.state_path().display()))?;

    println!("{}", "Refreshing state...".cyan());
    let mut diagnostics = Diagnostics::new();
    let ids: Vec<ResourceId> = state.resources.iter().map(|r| r.id()).collect();

    for id in ids {
        let Some(stored) = state.find_resource(&id).map(|r| r.to_record()) else {
            continue;
        };
        match provider.read_record(&id.resource_type, &stored).await {
            Ok(refreshed) => {
                if state.apply_read(&id, refreshed.as_ref()) {
                    println!("  {} {}", "✓".green(), id);
                } else {
                    println!("  {} {} (removed)", "-".yellow(), id);
                    diagnostics.push(Diagnostic::warning(
                        "Resource removed from state",
                        format!("{} no longer exists remotely", id),
                    ));
                }
            }
            Err(e) => {
                println!("  {} {} - {}", "✗".red(), id, e);
                diagnostics.add_error(&e);
            }
        }
    }

    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| e.to_string())?;
    info!("wrote refreshed state (serial {})", state.serial);
    Ok(diagnostics)
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        match diagnostic.severity {
            Severity::Error => eprintln!("{} {}", "Error:".red().bold(), diagnostic),
            Severity::Warning => eprintln!("{} {}", "Warning:".yellow().bold(), diagnostic),
        }
    }
}

fn parse_address(address: &str) -> Result<ResourceId, String> {
    match address.split_once('.') {
        Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
            Ok(ResourceId::new(resource_type, name))
        }
        _ => Err(format!(
            "invalid resource address '{}', expected type.name",
            address
        )),
    }
}

async fn run_state_command(path: &Path, command: StateCommands) -> Result<(), String> {
    let backend = LocalBackend::with_path(path.to_path_buf());
    match command {
        StateCommands::List => run_state_list(&backend).await,
        StateCommands::Show { address } => run_state_show(&backend, &address).await,
        StateCommands::Rm { address } => run_state_rm(&backend, &address).await,
        StateCommands::ForceUnlock { lock_id } => {
            backend
                .force_unlock(&lock_id)
                .await
                .map_err(|e| e.to_string())?;
            println!("{} {}", "Unlocked".green(), lock_id);
            Ok(())
        }
    }
}

async fn run_state_list(backend: &LocalBackend) -> Result<(), String> {
    let state = backend.read_state().await.map_err(|e| e.to_string())?;
    match state {
        Some(state) if !state.resources.is_empty() => {
            for resource in &state.resources {
                println!("{}", resource.id());
            }
        }
        _ => println!("{}", "No resources in state.".yellow()),
    }
    Ok(())
}

async fn run_state_show(backend: &LocalBackend, address: &str) -> Result<(), String> {
    let id = parse_address(address)?;
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no state found at {}", backend.state_path().display()))?;
    let resource = state
        .find_resource(&id)
        .ok_or_else(|| format!("{} is not in state", id))?;

    print_json(&Value::Record(resource.to_record()))
}

async fn run_state_rm(backend: &LocalBackend, address: &str) -> Result<(), String> {
    let id = parse_address(address)?;
    let lock = backend
        .acquire_lock(LockInfo::new("state rm").with_target(id.to_string()))
        .await
        .map_err(|e| e.to_string())?;

    let result = remove_from_state(backend, &id).await;

    if let Err(e) = backend.release_lock(&lock).await {
        eprintln!("{} failed to release lock {}: {}", "Warning:".yellow().bold(), lock.id, e);
    }

    result?;
    println!("  {} Removed {}", "✓".green(), id);
    Ok(())
}

async fn remove_from_state(backend: &LocalBackend, id: &ResourceId) -> Result<(), String> {
    let mut state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("no state found at {}", backend.state_path().display()))?;

    if state.remove_resource(id).is_none() {
        return Err(format!("{} is not in state", id));
    }

    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| e.to_string())?;
    info!("removed {} (serial {})", id, state.serial);
    Ok(())
}
