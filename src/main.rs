use clap::Parser;
use clap::Subcommand;
use prkit::commands::run::Run;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "prkit")]
#[command(about = "Commit local changes to a branch, push it and open a pull request", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run(Run),
}

fn main() {
    env_logger::init();

    let args = Cli::parse();

    let result = match args.command {
        Commands::Run(run) => run.execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
