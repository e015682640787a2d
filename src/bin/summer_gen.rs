use clap::Parser;
use summer::cli::{commands, init_tracing, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let outcome = match cli.command {
        Commands::Generate {
            manifest,
            output,
            force,
        } => commands::generate(&manifest, &output, force).map(|report| report.has_errors()),
        Commands::Lint { manifest } => commands::lint(&manifest).map(|errors| errors > 0),
    };

    match outcome {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}
