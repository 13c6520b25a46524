use colored::Colorize;
use dictgen::cli::CommandLineInterface;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "dictgen=debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn main() {
    let command_line_interface = CommandLineInterface::load();
    init_tracing(command_line_interface.verbose());
    if let Err(error) = command_line_interface.run() {
        eprintln!("{}: {error:#}", "error".red().bold());
        std::process::exit(1);
    }
}
