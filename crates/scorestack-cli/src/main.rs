use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "scorestack",
    about = "scorestack: order-scoring deployment graph generator",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every stack template and the manifest.
    Synth {
        /// Stage table (default: the built-in table)
        #[arg(short, long)]
        config: Option<String>,
        /// Output directory
        #[arg(short, long, default_value = "scorestack.out")]
        out: String,
    },
    /// List deployment groups and their stacks in deployment order
    List {
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Validate the stage table and the resulting graph without writing
    Validate {
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive("scorestack=info".parse()?);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    match cli.command {
        Commands::Synth { config, out } => commands::synth::synth(config.as_deref(), &out),
        Commands::List { config } => commands::list::list(config.as_deref()),
        Commands::Validate { config } => commands::validate::validate(config.as_deref()),
    }
}
