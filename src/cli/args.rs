//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[derive(Parser)]
#[command(name = "dirwatch")]
#[command(version)]
#[command(about = "Track files matching a pattern in a directory")]
#[command(styles = clap_cargo_style())]
pub struct Cli {
    /// Path to a settings file (default: nearest .dirwatch/settings.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .dirwatch/settings.toml in the current directory
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,

    /// Watch a directory and print `+ name` / `- name` as files come and go,
    /// then `= name` for each file still tracked on exit
    Watch {
        /// Directory to watch (overrides config)
        #[arg(short, long, env = "DIRWATCH_DIR")]
        dir: Option<PathBuf>,

        /// Filename pattern, a regex anchored at the start (overrides config)
        #[arg(short, long, env = "DIRWATCH_PATTERN")]
        pattern: Option<String>,

        /// Print the files tracked after the initial scan
        #[arg(long)]
        list: bool,
    },
}
