use clap::Parser;
use colored::Colorize;

use keyward::cli::{Cli, Commands};
use keyward::config::{get_config, init_config};
use keyward::errors::KeywardError;
use keyward::runtime::modes;
use keyward::system::init_logging;

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<KeywardError>() {
        Some(kw) => eprintln!("{}\n  {:#}", kw.format_colored(), err),
        None => eprintln!("{} {:#}", "[ERROR]".red().bold(), err),
    }
}

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config(&cli.config);
    let config = get_config();

    let result = match cli.command_or_default() {
        Commands::Serve => match init_logging(&config.logging) {
            Ok(_guard) => modes::run_server(&config).await,
            Err(e) => Err(e),
        },
        #[cfg(feature = "cli")]
        command => modes::run_cli(command, &config).await,
        #[cfg(not(feature = "cli"))]
        _ => Err(anyhow::anyhow!("this build only supports `serve`")),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}
