use std::process::ExitCode;

fn main() -> ExitCode {
    smashbot_cli::run()
}
