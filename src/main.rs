//! claude-stitch: reconstructing sessions and projects from fragmented logs.
//!
//! Ingests a logs root of JSONL session files, merges split sessions back
//! together, resolves workspace projects behind their encoded directory
//! names, and replays conversation timelines.

use std::process::ExitCode;

use claude_stitch::cli;

fn main() -> ExitCode {
    // Run the CLI (logging is initialized by cli::run based on --log-level and --log-format)
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Print error message
            eprintln!("Error: {e}");

            // Print cause chain in debug mode
            if std::env::var("RUST_BACKTRACE").is_ok() {
                if let Some(source) = std::error::Error::source(&e) {
                    eprintln!("Caused by: {source}");
                }
            }

            // Return appropriate exit code
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
