mod align;
mod cli;
mod errors;
mod external_tools;
mod filenames;
mod flank_alignment;
mod gap_index;
mod gap_support;
mod genome_ref_utils;
mod globals;
mod log_utils;
mod logger;
mod os_utils;
mod result_writer;
mod run_stats;
mod support;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::align::run_align;
use crate::cli::Commands;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;
use crate::support::run_support;

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Align(x) => {
            run_align(&settings.shared, x)?;
        }
        Commands::Support(x) => {
            run_support(x)?;
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        log::error!("{err}");
        process::exit(2);
    }
}
