//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `giftbook_core` linkage.
//! - With a data directory argument, print people in birthday order.
//! - With `GIFTBOOK_LOG_DIR` set, write core logs there at the build's
//!   default level.

use giftbook_core::{default_log_level, init_logging, LoadOutcome, StoreConfig};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "GIFTBOOK_LOG_DIR";

fn main() -> ExitCode {
    println!("giftbook_core ping={}", giftbook_core::ping());
    println!("giftbook_core version={}", giftbook_core::core_version());

    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let Some(data_dir) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let (store, outcome) = match StoreConfig::from_data_dir(&data_dir).open() {
        Ok(opened) => opened,
        Err(err) => {
            eprintln!("failed to open `{data_dir}`: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let LoadOutcome::Recovered { reason } = outcome {
        eprintln!("stored collection unreadable, showing empty list: {reason}");
    }

    for person in store.get_sorted_people() {
        println!(
            "{}  {}  ideas={}  id={}",
            person.dob,
            person.name,
            person.ideas.len(),
            person.id
        );
    }
    ExitCode::SUCCESS
}
