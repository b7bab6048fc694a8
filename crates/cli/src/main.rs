use std::process::ExitCode;

fn main() -> ExitCode {
    watchfinder_cli::run()
}
