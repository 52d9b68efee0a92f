use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use cfgvault_sdk::{FileBlobStore, StoreConfig, StoreManager, SystemClock, VersionRecord};
use colored::Colorize;
use tracing::debug;

use crate::cli::*;

/// Config file looked up in the store directory when `--config` is absent.
pub const CONFIG_FILE: &str = "cfgvault.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let manager = open_manager(&cli, config)?;
    let format = cli.format;
    match cli.command {
        Command::Save(args) => cmd_save(&manager, args, format),
        Command::Restore(args) => cmd_restore(&manager, args, format),
        Command::Show(args) => write_stdout(&manager.version_content(&args.id)?),
        Command::Current => cmd_current(&manager),
        Command::Log(args) => cmd_log(&manager, args, format),
        Command::History => cmd_history(&manager, format),
    }
}

/// Resolve the effective config: file (explicit or in the store root), then
/// command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => Some(cli.root.join(CONFIG_FILE)).filter(|p| p.is_file()),
    };

    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            debug!(path = %path.display(), "config loaded");
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => StoreConfig::default(),
    };

    if let Some(package) = &cli.package {
        config.package = package.clone();
    }
    Ok(config)
}

pub fn open_manager(cli: &Cli, config: StoreConfig) -> anyhow::Result<StoreManager> {
    let store = FileBlobStore::open(&cli.root)
        .with_context(|| format!("opening store at {}", cli.root.display()))?;
    let manager = StoreManager::from_config(Arc::new(store), Arc::new(SystemClock), config)?;
    manager.init()?;
    Ok(manager)
}

fn cmd_save(manager: &StoreManager, args: SaveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let content = read_input(&args.file)?;
    let record = manager.save(&content, args.description.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => {
            println!("{} Saved version {}", "✓".green().bold(), record.id().yellow());
            println!("  Key: {}", record.key());
            println!("  Size: {} bytes", content.len());
            if let Some(description) = record.description() {
                println!("  Description: {description}");
            }
        }
    }
    Ok(())
}

fn cmd_restore(manager: &StoreManager, args: RestoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let content = manager.restore(&args.id)?;
    if let Some(path) = &args.output {
        fs::write(path, &content).with_context(|| format!("writing {}", path.display()))?;
    }
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "restored": args.id, "size": content.len() })
        ),
        OutputFormat::Text => {
            println!("{} Restored version {}", "✓".green().bold(), args.id.yellow());
            if let Some(path) = &args.output {
                println!("  Written to {}", path.display());
            }
        }
    }
    Ok(())
}

fn cmd_current(manager: &StoreManager) -> anyhow::Result<()> {
    match manager.current_version_content()? {
        Some(content) => write_stdout(&content),
        None => bail!("no version saved yet for package {}", manager.package()),
    }
}

fn cmd_log(manager: &StoreManager, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let current = manager.current_version_id()?;
    if args.all {
        if format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&manager.all_versions()?)?);
            return Ok(());
        }
        let keys = manager.keys()?;
        if keys.is_empty() {
            println!("No versions.");
        }
        for key in &keys {
            println!("{}", key.bold());
            for version in &manager.versions(key)? {
                print_version(version, current.as_deref(), true);
            }
        }
        return Ok(());
    }

    let key = args.key.unwrap_or_else(|| manager.current_key().to_string());
    let versions = manager.versions(&key)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&versions)?),
        OutputFormat::Text => {
            if versions.is_empty() {
                println!("No versions of {}.", key.bold());
            }
            for version in &versions {
                print_version(version, current.as_deref(), true);
            }
        }
    }
    Ok(())
}

fn cmd_history(manager: &StoreManager, format: OutputFormat) -> anyhow::Result<()> {
    let history = manager.history()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
        OutputFormat::Text => {
            let current = manager.current_version_id()?;
            for record in &history {
                print_version(record, current.as_deref(), false);
            }
            println!("{} saves recorded", history.len().to_string().bold());
        }
    }
    Ok(())
}

fn print_version(version: &VersionRecord, current: Option<&str>, consolidated: bool) {
    let marker = if current == Some(version.id()) {
        "*".green().bold()
    } else {
        " ".normal()
    };
    println!(
        "{marker} {}  {}",
        version.id().yellow(),
        version.modified().unwrap_or("-").dimmed()
    );
    let descriptions = if consolidated {
        version.descriptions()
    } else {
        version.description().map(str::to_string).into_iter().collect()
    };
    for description in descriptions {
        println!("    {description}");
    }
}

fn read_input(file: &str) -> anyhow::Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }
    let path = PathBuf::from(file);
    fs::read(&path).with_context(|| format!("reading {}", path.display()))
}

fn write_stdout(content: &[u8]) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(content)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgvault_sdk::DebounceAnchor;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cfgvault").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let config = load_config(&parse(&["--root", root, "history"])).unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[test]
    fn config_file_in_root_then_flag_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "package = \"network\"\nauto_save_interval_ms = 1000\ndebounce_anchor = \"latest-save\"\n",
        )
        .unwrap();
        let root = dir.path().to_str().unwrap();

        let config = load_config(&parse(&["--root", root, "history"])).unwrap();
        assert_eq!(config.package, "network");
        assert_eq!(config.auto_save_interval_ms, 1000);
        assert_eq!(config.debounce_anchor, DebounceAnchor::LatestSave);

        let overridden = load_config(&parse(&["--root", root, "-p", "router", "history"])).unwrap();
        assert_eq!(overridden.package, "router");
        assert_eq!(overridden.auto_save_interval_ms, 1000);
    }

    #[test]
    fn explicit_config_must_exist_and_parse() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(&parse(&["--config", missing.to_str().unwrap(), "history"])).is_err());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "auto_save_interval_ms = \"soon\"").unwrap();
        assert!(load_config(&parse(&["--config", broken.to_str().unwrap(), "history"])).is_err());
    }

    #[test]
    fn manager_opens_store_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let cli = parse(&["--root", root.to_str().unwrap(), "-p", "network", "history"]);
        let manager = open_manager(&cli, load_config(&cli).unwrap()).unwrap();

        let record = manager.save(b"{\"mtu\":1500}", Some("initial")).unwrap();
        assert!(root.join("network/current.json").is_file());
        assert!(root.join(format!("network/backups/{}.json", record.id())).is_file());

        let reopened = open_manager(&cli, load_config(&cli).unwrap()).unwrap();
        assert_eq!(reopened.current_version_id().unwrap().as_deref(), Some(record.id()));
    }

    #[test]
    fn read_input_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = read_input(missing.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
