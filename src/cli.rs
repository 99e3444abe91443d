use std::path::{Path, PathBuf};

mod clean;
mod links;
mod show;
mod terminal;

use clap::ArgAction;
use clean::Clean;
use links::Links;
use show::Show;
use stpa::{ComponentType, Model, Rectangle};
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The project file to work on
    #[arg(short, long, default_value = "project.json", global = true)]
    project: PathBuf,

    /// The configuration file
    #[arg(short, long, default_value = "stpa.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let paths = Paths {
            project: self.project,
            config: self.config,
        };
        self.command
            .unwrap_or_else(|| Command::Show(Show::default()))
            .run(&paths)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Where the project and its configuration live.
#[derive(Debug)]
pub struct Paths {
    project: PathBuf,
    config: PathBuf,
}

impl Paths {
    fn load_config(&self) -> stpa::Config {
        stpa::Config::load_or_default(&self.config)
    }

    fn load_model(&self) -> anyhow::Result<Model> {
        Model::load(&self.project, self.load_config()).map_err(|e| {
            anyhow::anyhow!("Failed to open project {}: {e}", self.project.display())
        })
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Print the control structure (default)
    Show(Show),

    /// Create a new project with an empty control structure
    Init(Init),

    /// List links, optionally of one category
    Links(Links),

    /// Discard stale causal data and dangling links
    Clean(Clean),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, paths: &Paths) -> anyhow::Result<()> {
        match self {
            Self::Show(command) => command.run(paths)?,
            Self::Init(command) => command.run(paths)?,
            Self::Links(command) => command.run(paths)?,
            Self::Clean(command) => command.run(paths)?,
            Self::Config(command) => command.run(&paths.config)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {
    /// Label of the root component
    #[arg(long, short, default_value = "Control Structure")]
    title: String,

    /// Overwrite an existing project file
    #[arg(long)]
    force: bool,
}

impl Init {
    #[instrument(skip(paths))]
    fn run(self, paths: &Paths) -> anyhow::Result<()> {
        use terminal::Colorize;

        if paths.project.exists() && !self.force {
            anyhow::bail!(
                "Project already exists at {} (use --force to overwrite)",
                paths.project.display()
            );
        }

        if !paths.config.exists() {
            stpa::Config::default()
                .save(&paths.config)
                .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", paths.config.display()))?;
            println!("  Created: {}", paths.config.display());
        }

        let mut model = Model::new(paths.load_config());
        let root = model.set_root(Rectangle::new(0, 0, 800, 600), &self.title);
        model.save(&paths.project)?;

        println!("  Created: {}", paths.project.display());
        println!(
            "{}",
            format!("Initialized project '{}' ({root})", self.title).success()
        );
        println!();
        println!("Next steps:");
        println!(
            "  Add {} components beneath the root, then run `stpa show`",
            ComponentType::Controller
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, config_path: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let mut config = if config_path.exists() {
            stpa::Config::load(config_path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            stpa::Config::default()
        };

        match self.command {
            ConfigCommand::Show => {
                println!("Configuration:");
                println!(
                    "  use_scenarios: {} ({})",
                    config.use_scenarios,
                    if config.use_scenarios {
                        "scenario analysis".dim()
                    } else {
                        "plain causal factors".dim()
                    }
                );
                println!("  trash_capacity: {}", config.trash_capacity());
                println!("  cascade_depth: {}", config.cascade_depth());
                if !config_path.exists() {
                    println!("{}", "(defaults, no configuration file)".dim());
                }
            }
            ConfigCommand::Set { key, value } => {
                match key.as_str() {
                    "use_scenarios" => {
                        config.use_scenarios = value
                            .parse::<bool>()
                            .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))?;
                    }
                    "trash_capacity" => {
                        let capacity = parse_count(&value)?;
                        if capacity == 0 {
                            println!("{}", "Trash capacity raised to 1".warning());
                        }
                        config.set_trash_capacity(capacity);
                    }
                    "cascade_depth" => config.set_cascade_depth(parse_count(&value)?),
                    _ => {
                        return Err(anyhow::anyhow!(
                            "Unknown configuration key: '{key}'\nSupported keys: use_scenarios, \
                             trash_capacity, cascade_depth",
                        ));
                    }
                }
                config
                    .save(config_path)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("{}", format!("Set {key} = {value}").success());
            }
        }

        Ok(())
    }
}

fn parse_count(value: &str) -> anyhow::Result<usize> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Value must be a non-negative integer"))
}
