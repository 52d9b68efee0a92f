use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cfgvault",
    about = "cfgvault: versioned configuration documents with consolidated history",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store directory
    #[arg(long, global = true, default_value = ".cfgvault")]
    pub root: PathBuf,

    /// Package to operate on (overrides the config file)
    #[arg(short, long, global = true)]
    pub package: Option<String>,

    /// Config file (default: cfgvault.toml in the store directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Save a document as the current version
    Save(SaveArgs),
    /// Make an earlier version current again
    Restore(RestoreArgs),
    /// Print the content of a version
    Show(ShowArgs),
    /// Print the current document
    Current,
    /// List consolidated versions
    Log(LogArgs),
    /// List every recorded save
    History,
}

#[derive(Args)]
pub struct SaveArgs {
    /// File to save, or `-` for stdin
    pub file: String,
    #[arg(short = 'm', long = "message")]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct RestoreArgs {
    pub id: String,
    /// Also write the restored content to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct LogArgs {
    /// Key to list (default: the package's current document)
    #[arg(long, conflicts_with = "all")]
    pub key: Option<String>,
    /// List every key in the history
    #[arg(long)]
    pub all: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_save() {
        let cli = Cli::try_parse_from(["cfgvault", "save", "net.json", "-m", "jumbo"]).unwrap();
        if let Command::Save(args) = cli.command {
            assert_eq!(args.file, "net.json");
            assert_eq!(args.description, Some("jumbo".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_save_stdin() {
        let cli = Cli::try_parse_from(["cfgvault", "save", "-"]).unwrap();
        if let Command::Save(args) = cli.command {
            assert_eq!(args.file, "-");
            assert!(args.description.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_restore_with_output() {
        let cli = Cli::try_parse_from(["cfgvault", "restore", "20170501010000000", "-o", "out.json"]).unwrap();
        if let Command::Restore(args) = cli.command {
            assert_eq!(args.id, "20170501010000000");
            assert_eq!(args.output, Some(PathBuf::from("out.json")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cfgvault", "log", "--all", "--root", "/srv/cfg", "-p", "network", "--format", "json", "-v",
        ])
        .unwrap();
        assert_eq!(cli.root, PathBuf::from("/srv/cfg"));
        assert_eq!(cli.package.as_deref(), Some("network"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        if let Command::Log(args) = cli.command {
            assert!(args.all);
            assert!(args.key.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cfgvault", "current"]).unwrap();
        assert_eq!(cli.root, PathBuf::from(".cfgvault"));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Command::Current));
    }

    #[test]
    fn log_key_conflicts_with_all() {
        assert!(Cli::try_parse_from(["cfgvault", "log", "--all", "--key", "a.current"]).is_err());
    }

    #[test]
    fn show_requires_id() {
        assert!(Cli::try_parse_from(["cfgvault", "show"]).is_err());
    }
}
