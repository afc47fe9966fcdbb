use std::process::ExitCode;

fn main() -> ExitCode {
    csv_highlights_lib::run()
}
