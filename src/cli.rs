use std::path::{Path, PathBuf};

mod gate;
mod list;
mod terminal;
mod validate;

use catalogue::{
    Config, EditingSession, Hierarchy, JsonStore, OptionId, OptionType, PersistenceGateway,
    Resolution,
};
use clap::ArgAction;
use gate::TerminalGate;
use list::List;
use terminal::Colorize;
use tracing::instrument;
use validate::Validate;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory holding the catalogue data files
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// The catalogue to edit (defaults to the configured catalogue)
    #[arg(long = "type", value_name = "TYPE", global = true)]
    option_type: Option<OptionType>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let context = Context {
            root: self.root,
            option_type: self.option_type,
        };

        self.command
            .unwrap_or_else(|| Command::List(List::default()))
            .run(&context)
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

/// Settings shared by every command.
#[derive(Debug)]
struct Context {
    root: PathBuf,
    option_type: Option<OptionType>,
}

impl Context {
    fn config_path(&self) -> PathBuf {
        config_path(&self.root)
    }

    fn config(&self) -> Config {
        Config::load_or_default(&self.config_path())
    }

    fn option_type(&self, config: &Config) -> OptionType {
        self.option_type.unwrap_or(config.default_option_type)
    }

    fn store(&self, config: &Config) -> JsonStore {
        JsonStore::new(self.root.clone(), config.pretty)
    }

    fn open(&self, assume_yes: bool) -> anyhow::Result<EditingSession<JsonStore, TerminalGate>> {
        let config = self.config();
        let session = EditingSession::open(
            self.store(&config),
            TerminalGate::new(assume_yes),
            self.option_type(&config),
            config.sentinel_label(),
        )?;
        Ok(session)
    }
}

fn config_path(root: &Path) -> PathBuf {
    root.join(".optcat").join("config.toml")
}

/// Finds an option by id, or else by its exact label.
fn resolve(hierarchy: &Hierarchy, key: &str) -> anyhow::Result<OptionId> {
    let id = OptionId::from(key);
    if hierarchy.get(&id).is_some() {
        return Ok(id);
    }

    let matches: Vec<_> = hierarchy.find_by_label(key).collect();
    match matches.as_slice() {
        [] => anyhow::bail!("No option with id or label '{key}'"),
        [only] => Ok(only.id.clone()),
        many => {
            let ids: Vec<_> = many.iter().map(|r| r.id.as_str()).collect();
            anyhow::bail!(
                "Label '{key}' is ambiguous, use one of the ids: {}",
                ids.join(", ")
            )
        }
    }
}

/// New sub-options go directly after their category, everything else at
/// the end.
fn insertion_anchor(hierarchy: &Hierarchy, parent: Option<&OptionId>) -> usize {
    parent
        .and_then(|id| hierarchy.position(id))
        .map_or_else(|| hierarchy.len(), |position| position + 1)
}

#[derive(Debug, clap::Parser)]
enum Command {
    /// Initialize a catalogue directory
    Init(Init),

    /// Show the catalogue in canonical order (default)
    List(List),

    /// Add an option
    Add(Add),

    /// Change the label of an option
    Rename(Rename),

    /// Move an option to another category, or to the top level
    Move(Move),

    /// Remove an option
    ///
    /// Sub-options of a removed category are moved to the top level.
    Remove(Remove),

    /// Check the stored catalogue for broken references
    Validate(Validate),
}

impl Command {
    fn run(self, context: &Context) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(context)?,
            Self::List(command) => command.run(context)?,
            Self::Add(command) => command.run(context)?,
            Self::Rename(command) => command.run(context)?,
            Self::Move(command) => command.run(context)?,
            Self::Remove(command) => command.run(context)?,
            Self::Validate(command) => command.run(context)?,
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
struct Init {}

impl Init {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let config_path = context.config_path();
        let Some(config_dir) = config_path.parent() else {
            anyhow::bail!("Invalid root directory {}", context.root.display());
        };
        if config_dir.exists() {
            anyhow::bail!("Catalogue already initialized (found existing .optcat directory)");
        }

        std::fs::create_dir_all(config_dir)
            .map_err(|e| anyhow::anyhow!("Failed to create .optcat directory: {e}"))?;

        let config = Config::default();
        config
            .save(&config_path)
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        let mut store = context.store(&config);
        let mut created = Vec::new();
        for option_type in OptionType::ALL {
            let path = store.path(option_type);
            if !path.exists() {
                store.save(option_type, &[])?;
                created.push(path);
            }
        }

        println!(
            "Initialized option catalogues in {}",
            context.root.display()
        );
        println!("  Created: .optcat/config.toml");
        for path in created {
            println!("  Created: {}", path.display());
        }
        println!();
        println!("Next steps:");
        println!("  optcat add \"Sport\"");
        println!("  optcat add \"Football\" --parent \"Sport\"");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
struct Add {
    /// The label of the new option
    label: String,

    /// The category (id or label) to add the option to
    #[arg(long, short)]
    parent: Option<String>,
}

impl Add {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        if self.label.trim().is_empty() {
            anyhow::bail!("Label must not be empty");
        }

        let mut session = context.open(false)?;
        let parent = self
            .parent
            .as_deref()
            .map(|key| resolve(session.hierarchy(), key))
            .transpose()?;

        let anchor = insertion_anchor(session.hierarchy(), parent.as_ref());
        session.add_option(anchor, parent)?;

        let Some(id) = session.hierarchy().pending_focus().cloned() else {
            anyhow::bail!("Added option could not be located");
        };
        let position = session.set_label(&id, self.label.clone())?;
        session.submit()?;

        println!(
            "{}",
            format!("✅ Added '{}' ({id}) at position {}", self.label, position + 1).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
struct Rename {
    /// The option (id or label) to rename
    option: String,

    /// The new label
    label: String,
}

impl Rename {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        if self.label.trim().is_empty() {
            anyhow::bail!("Label must not be empty");
        }

        let mut session = context.open(false)?;
        let id = resolve(session.hierarchy(), &self.option)?;
        session.set_label(&id, self.label.clone())?;
        session.submit()?;

        println!(
            "{}",
            format!("✅ Renamed {id} to '{}'", self.label).success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
struct Move {
    /// The option (id or label) to move
    option: String,

    /// The new category (id or label). Omit to move to the top level.
    #[arg(long, short)]
    parent: Option<String>,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Move {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open(self.yes)?;
        let id = resolve(session.hierarchy(), &self.option)?;
        let parent = self
            .parent
            .as_deref()
            .map(|key| resolve(session.hierarchy(), key))
            .transpose()?;

        let target = parent.as_ref().map_or_else(
            || "the top level".to_string(),
            |p| format!("'{}'", session.hierarchy().get(p).map_or("", |r| r.label.as_str())),
        );

        let Resolution::Committed { position } = session.set_parent(&id, parent)? else {
            println!("Cancelled");
            std::process::exit(130);
        };

        if !session.is_dirty() {
            println!("{}", "Nothing to do".dim());
            return Ok(());
        }
        session.submit()?;

        let position = position.map_or_else(String::new, |p| format!(" (position {})", p + 1));
        println!(
            "{}",
            format!("✅ Moved {id} to {target}{position}").success()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
struct Remove {
    /// The option (id or label) to remove
    option: String,

    /// Skip confirmation prompts
    #[arg(long, short)]
    yes: bool,
}

impl Remove {
    #[instrument]
    fn run(self, context: &Context) -> anyhow::Result<()> {
        let mut session = context.open(self.yes)?;
        let id = resolve(session.hierarchy(), &self.option)?;

        let children: Vec<_> = session
            .hierarchy()
            .children(&id)
            .map(|r| r.label.clone())
            .collect();
        if !children.is_empty() && !self.yes {
            println!(
                "{}",
                format!(
                    "⚠️  {} sub-option(s) will be moved to the top level:",
                    children.len()
                )
                .warning()
            );
            for child in &children {
                println!("  • {child}");
            }
        }

        if !session.remove_option(&id)?.is_committed() {
            println!("Cancelled");
            std::process::exit(130);
        }
        session.submit()?;

        println!("{}", format!("✅ Removed {id}").success());
        if !children.is_empty() {
            println!(
                "{}",
                format!("ℹ️  {} sub-option(s) moved to the top level", children.len()).dim()
            );
        }
        Ok(())
    }
}
