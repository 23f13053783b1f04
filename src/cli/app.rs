// ABOUTME: Main application orchestration for the flowtask CLI
// ABOUTME: Coordinates between CLI arguments, configuration, logging, and command execution

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands;
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration
    ///
    /// Logs go to stderr so stdout carries only command output.
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(!no_color)
            .with_target(false);

        let installed = match self.config.logging.format.as_str() {
            "compact" => builder.compact().try_init(),
            "json" => builder.json().try_init(),
            _ => builder.pretty().try_init(),
        };
        installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&mut self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting flowtask v{}", env!("CARGO_PKG_VERSION"));
        debug!("Configuration loaded from: {:?}", args.config);

        match &args.command {
            Commands::Run { vars, .. } | Commands::Plan { vars, .. } => {
                let params = Args::parse_variables(vars)?;
                self.config.merge_params(params);
            }
            Commands::List { .. } => {}
        }

        match args.command {
            Commands::Run {
                flow,
                tasks_dir,
                output,
                ..
            } => commands::run_flow(flow, tasks_dir, output, &self.config).await,

            Commands::Plan {
                flow, tasks_dir, ..
            } => commands::plan_flow(flow, tasks_dir, &self.config).await,

            Commands::List { tasks_dir } => commands::list_flows(tasks_dir, &self.config).await,
        }
    }

    /// Create application from parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Config::load(args.config.clone())?;
        Ok(Self::new(config))
    }
}
