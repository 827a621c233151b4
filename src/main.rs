use clap::Parser;
use miette::Result;
use orion::cli::{Cli, Commands};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    // -v/-q set the default; ORION_LOG overrides per target
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.global.log_level()).into())
        .with_env_var("ORION_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let global = cli.global;
    match cli.command {
        Commands::Create(args) => orion::cli::commands::create::run(args, &global),
        Commands::Revision(args) => orion::cli::commands::revision::run(args, &global),
        Commands::Display(args) => orion::cli::commands::display::run(args, &global),
        Commands::Deploy(args) => orion::cli::commands::deploy::run(args, &global),
    }
}
