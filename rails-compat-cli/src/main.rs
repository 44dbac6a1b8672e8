#![forbid(unsafe_code)]

use std::process::ExitCode;

mod app;
mod exporters;

use app::{
    options::{from_command_line, Options},
    runtime::Config,
};

fn main() -> ExitCode {
    // Get args from command line
    let args = from_command_line();
    // Create application options
    let options = match Options::from_args(&args) {
        Ok(options) => options,
        Err(why) => {
            eprintln!("{why}");
            return ExitCode::FAILURE;
        }
    };

    // Create app state and start
    let app = Config::new(options);
    match app.start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            eprintln!("Unable to decode: {why}");
            ExitCode::FAILURE
        }
    }
}
