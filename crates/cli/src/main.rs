use std::process::ExitCode;

fn main() -> ExitCode {
    qualcel_cli::run()
}
