use std::process::ExitCode;

fn main() -> ExitCode {
    match jailpolld::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("jailpolld: {error}");
            ExitCode::FAILURE
        }
    }
}
