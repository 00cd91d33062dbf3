mod entry;
mod logger;
mod shutdown_handlers;

use std::process::ExitCode;

fn main() -> ExitCode {
    entry::run()
}
