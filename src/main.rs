use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use connector_kit::cli::{Cli, Commands};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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

    // Unknown commands and bad arguments exit with status 1 after printing usage
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    let global = cli.global;

    init_tracing(global.verbose);

    match cli.command {
        Some(Commands::Expand) => connector_kit::cli::commands::expand::run(&global),
        Some(Commands::Collapse) => connector_kit::cli::commands::collapse::run(&global),
        Some(Commands::Init(args)) => connector_kit::cli::commands::init::run(args, &global),
        Some(Commands::AddType) => connector_kit::cli::commands::add_type::run(),
        Some(Commands::Completions(args)) => connector_kit::cli::commands::completions::run(args),
        None => {
            eprintln!("{}", Cli::command().render_usage());
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "connector_kit=debug"
    } else {
        "connector_kit=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
