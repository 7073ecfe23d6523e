mod align;
mod shared;
mod support;
mod utils;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use simple_error::{SimpleResult, bail};

use self::align::validate_and_fix_align_settings;
pub use self::align::{AlignSettings, write_align_settings};
use self::shared::validate_and_fix_shared_settings;
pub use self::shared::SharedSettings;
use self::support::validate_and_fix_support_settings;
pub use self::support::{SupportSettings, write_support_settings};

#[derive(Subcommand)]
pub enum Commands {
    /// Align reads to the gap flank sequences, then sort and index the alignments
    Align(AlignSettings),

    /// Find reads supporting each gap from the flank alignments, and write out the bridging read
    /// sequence for each supported gap
    Support(SupportSettings),
}

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(propagate_version = true, rename_all = "kebab_case")]
pub struct Settings {
    #[command(flatten)]
    pub shared: SharedSettings,

    #[command(subcommand)]
    pub command: Commands,
}

impl Settings {
    pub fn get_output_dir(&self) -> &Utf8Path {
        match &self.command {
            Commands::Align(x) => &x.output_dir,
            Commands::Support(x) => &x.output_dir,
        }
    }
}

/// Checks if a directory does not exist
///
pub fn check_novel_dirname(dirname: &Utf8Path, label: &str) -> SimpleResult<()> {
    if dirname.exists() {
        bail!("{} already exists: \"{}\"", label, dirname);
    }
    Ok(())
}

/// Validate settings and update parameters that can't be processed by clap
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.shared = validate_and_fix_shared_settings(settings.shared)?;

    settings.command = match settings.command {
        Commands::Align(x) => {
            let x = validate_and_fix_align_settings(x)?;
            Commands::Align(x)
        }
        Commands::Support(x) => {
            let x = validate_and_fix_support_settings(x)?;
            Commands::Support(x)
        }
    };

    Ok(settings)
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
