mod commands;
mod console;
mod interrupt;
mod logging;

use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{CleanArgs, Cli, Commands};
use console::ConsoleSink;
use dotenv::dotenv;
use orphan_sweep_core::index::build_uuid_index;
use orphan_sweep_core::report::{self, format_size};
use orphan_sweep_core::{AppConfig, CleanEngine, CleanOptions, DirectoryRole, ScanScope};
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match orphan_sweep_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Clean(clean_args)) => run_clean(config, &clean_args),
        Some(Commands::MakeDirs) => run_make_dirs(config),
        Some(Commands::CountUuids) => run_count_uuids(config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            Cli::command().print_long_help()?;
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn run_clean(config: AppConfig, args: &CleanArgs) -> anyhow::Result<()> {
    let scope: ScanScope = args.target.parse()?;
    if args.delete
        && !args.yes
        && !confirm_delete(scope, &config, &mut io::stdin().lock(), &mut io::stdout())?
    {
        info!("Nothing deleted");
        return Ok(());
    }

    let engine = CleanEngine::new(config);
    interrupt::watch_ctrl_c(engine.cancel_token())?;
    let options = CleanOptions {
        delete: args.delete,
        human: !args.raw,
        parallel: args.parallel,
    };
    let summary = engine.clean(&args.target, options, &ConsoleSink)?;

    if let Some(path) = &args.csv {
        let rows = report::write_csv(path, &summary.directories)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("{} orphan rows written to {}", rows, path.display());
    }

    let bytes = format_size(summary.result.bytes, options.human);
    if args.delete {
        info!(
            "{} deleted, {} failed, {} withheld, {} reclaimable",
            format!("{}", summary.result.deleted).green(),
            format!("{}", summary.result.fails).red(),
            format!("{}", summary.result.skipped).yellow(),
            bytes.cyan(),
        );
    } else {
        info!(
            "Dry run: {} orphaned files, {} reclaimable (use --delete to remove)",
            format!("{}", summary.result.count).red(),
            bytes.cyan(),
        );
    }

    if summary.cancelled {
        warn!("Run interrupted, remaining orphans were left in place");
        bail!("clean of '{}' was cancelled", scope);
    }

    Ok(())
}

fn run_make_dirs(config: AppConfig) -> anyhow::Result<()> {
    let created = CleanEngine::new(config).make_directories()?;
    if created.is_empty() {
        println!("All directories already exist");
    }
    for path in created {
        println!("{} {}", "created".green(), path.display());
    }
    Ok(())
}

fn run_count_uuids(config: AppConfig) -> anyhow::Result<()> {
    let engine = CleanEngine::new(config);
    let db = engine.open_database()?;
    let (records, uuids) = build_uuid_index(&db, &engine.cancel_token())?;
    println!(
        "{} records, {} unique identifiers",
        format!("{}", records).cyan(),
        format!("{}", uuids.len()).cyan()
    );
    Ok(())
}

/// List every directory the run will touch, then ask for a plain yes.
fn confirm_delete(
    scope: ScanScope,
    config: &AppConfig,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> io::Result<bool> {
    writeln!(
        out,
        "{}",
        format!("Deleting orphans for scope '{}':", scope).bold()
    )?;
    for role in scope.resolve() {
        let handling = if role.is_backup_eligible() {
            "archived first".green()
        } else {
            "no backup".yellow()
        };
        writeln!(
            out,
            "  {:<10} {}  {}",
            role,
            config.directories.path(role),
            handling
        )?;
    }
    writeln!(
        out,
        "  archives go to {}",
        config.directories.path(DirectoryRole::Backup)
    )?;

    write!(out, "Proceed? [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use orphan_sweep_core::DirectoryRoleConfig;

    fn config() -> AppConfig {
        AppConfig {
            database_path: None,
            directories: DirectoryRoleConfig {
                downloads: "/srv/uuid".to_string(),
                emulator: "/srv/emu".to_string(),
                backup: "/srv/backup".to_string(),
                preview: "/srv/img000".to_string(),
                thumbnail: "/srv/img400".to_string(),
            },
        }
    }

    fn ask(scope: ScanScope, answer: &str) -> (bool, String) {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let confirmed =
            confirm_delete(scope, &config(), &mut answer.as_bytes(), &mut out).unwrap();
        (confirmed, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_confirm_lists_roles_of_scope() {
        let (_, text) = ask(ScanScope::Image, "n\n");
        assert!(text.contains("scope 'image'"));
        assert!(text.contains("preview    /srv/img000  archived first"));
        assert!(text.contains("thumbnail  /srv/img400  archived first"));
        assert!(!text.contains("/srv/emu"));
        assert!(text.contains("archives go to /srv/backup"));

        let (_, text) = ask(ScanScope::Emulation, "\n");
        assert!(text.contains("emulator   /srv/emu  no backup"));
    }

    #[test]
    fn test_confirm_defaults_to_no() {
        assert!(ask(ScanScope::All, "y\n").0);
        assert!(ask(ScanScope::All, "YES\n").0);
        assert!(!ask(ScanScope::All, "\n").0);
        assert!(!ask(ScanScope::All, "").0);
        assert!(!ask(ScanScope::All, "maybe\n").0);
    }
}
