//! sprtheme - Command-line tool for recoloring indexed battle sprites

use std::process::ExitCode;

use sprtheme::cli;

fn main() -> ExitCode {
    cli::run()
}
