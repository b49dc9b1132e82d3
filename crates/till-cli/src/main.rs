use anyhow::Result;
use clap::{Parser, Subcommand};
use till_config::{ClosureSettings, LoadedConfig, UnusedKeyPolicy};
use tracing::{debug, warn};

mod commands;

#[derive(Parser)]
#[command(name = "till")]
#[command(about = "Cash-register closing reconciliation", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> site -> local)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a raw closure submission and print the canonical record
    Build {
        /// Raw submission: JSON object of label -> value
        #[arg(long)]
        input: String,

        /// Employee name used when the submission has none (overrides config)
        #[arg(long = "default-employee")]
        default_employee: Option<String>,

        /// Print the presented record (adds drawerCashExpected)
        #[arg(long, default_value_t = false)]
        present: bool,
    },

    /// Present a stored canonical record
    Present {
        /// Stored record JSON
        #[arg(long)]
        record: String,
    },

    /// Lenient live preview of the derived amounts from a partial submission
    Preview {
        /// Raw (possibly incomplete) submission JSON
        #[arg(long)]
        input: String,
    },

    /// Diff two stored records; optionally append a CLOSURE_EDITED audit event
    Diff {
        /// Record before the edit
        #[arg(long)]
        before: String,

        /// Record after the edit
        #[arg(long)]
        after: String,

        /// Closure id; when given, a non-empty diff is written to the audit log
        #[arg(long = "closure-id")]
        closure_id: Option<String>,

        /// Audit log path (overrides config)
        #[arg(long = "audit-log", requires = "closure_id")]
        audit_log: Option<String>,
    },

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of an audit log
    Verify {
        #[arg(long)]
        log: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = if cli.config_paths.is_empty() {
        LoadedConfig::empty()?
    } else {
        let path_refs: Vec<&str> = cli.config_paths.iter().map(|s| s.as_str()).collect();
        till_config::load_layered_yaml(&path_refs)?
    };
    let settings = ClosureSettings::from_config_json(&loaded.config_json)?;

    init_tracing(&settings.log_filter);
    debug!(config_hash = %loaded.config_hash, "config loaded");

    let report = till_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "unused config key");
    }

    match cli.cmd {
        Commands::Build {
            input,
            default_employee,
            present,
        } => {
            let default_employee = default_employee.or(settings.default_employee_name.clone());
            commands::closure::build(&input, default_employee, present)?;
        }

        Commands::Present { record } => commands::closure::present(&record)?,

        Commands::Preview { input } => commands::closure::preview(&input)?,

        Commands::Diff {
            before,
            after,
            closure_id,
            audit_log,
        } => {
            let audit = closure_id.map(|id| commands::audit::AuditTarget {
                closure_id: id,
                log_path: audit_log.unwrap_or_else(|| settings.audit_log_path.clone()),
                hash_chain: settings.audit_hash_chain,
            });
            commands::audit::diff(&before, &after, audit)?;
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { log } => commands::audit::verify(&log)?,
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = till_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// RUST_LOG wins over the configured filter. Logs go to stderr; stdout
/// carries command output only.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
