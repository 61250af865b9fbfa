//! appliance-deploy
//!
//! Usage:
//!   appliance-deploy --params controller.yml
//!   appliance-deploy --params controller.json --state absent --check

use anyhow::Result;
use clap::Parser;

use app_lib::cli::Cli;
use app_lib::output::{render_failure, render_success};

fn main() -> Result<()> {
    let cli = Cli::parse();
    app_lib::logging::init(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    match runtime.block_on(app_lib::run(&cli)) {
        Ok(result) => {
            println!("{}", render_success(&result));
            Ok(())
        }
        Err(err) => {
            println!("{}", render_failure(&err));
            std::process::exit(1);
        }
    }
}
