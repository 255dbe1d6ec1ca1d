use std::process::ExitCode;

fn main() -> ExitCode {
    cofoundry_cli::run()
}
