#![forbid(unsafe_code)]

//! rrp: registry retention policy CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = match cli_app::Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Usage errors exit 1 like every other failure; help and version exit 0.
            let code = i32::from(e.use_stderr());
            let _ = e.print();
            std::process::exit(code);
        }
    };
    if let Err(e) = cli_app::run(&args) {
        eprintln!("rrp: {e}");
        std::process::exit(1);
    }
}
