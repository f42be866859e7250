use std::io::Write;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use struct_visitor_gen::{CodeGenConfig, DEFAULT_PREFIX, LintStyle, MaxArity, Preset};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the macro table header.
    Generate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Output file. Defaults to stdout.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Expand call sites against a freshly generated header.
    Expand {
        #[command(flatten)]
        config: ConfigArgs,

        /// Header with glue macro definitions to load after the generated one.
        #[arg(long = "glue")]
        glue: Option<PathBuf>,

        /// Call sites, e.g. 'STRUCT_VISITABLE(Point, x, y, z)'.
        #[arg(required = true)]
        calls: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Start from one of the known configurations. Explicit flags override it.
    #[arg(long = "preset", value_enum)]
    preset: Option<Preset>,

    /// Largest field count that gets a macro.
    #[arg(long = "max", allow_negative_numbers = true)]
    max: Option<i64>,

    /// Entry macro name, also the prefix of every other generated macro.
    #[arg(long = "prefix", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Identifier the field value expressions are accessed on.
    #[arg(long = "receiver")]
    receiver: Option<String>,

    #[arg(long = "lint", value_enum)]
    lint: Option<LintStyle>,

    #[arg(long = "include-guard")]
    include_guard: Option<String>,
}

impl ConfigArgs {
    fn into_config(self) -> anyhow::Result<CodeGenConfig> {
        let mut config = match self.preset {
            Some(preset) => CodeGenConfig::from_preset(preset),
            None => CodeGenConfig::new(),
        }
        .prefix(self.prefix);

        if let Some(max) = self.max {
            config = config.max_arity(MaxArity::try_from(max)?);
        }
        if let Some(receiver) = self.receiver {
            config = config.receiver(receiver);
        }
        if let Some(lint) = self.lint {
            config = config.lint_style(lint);
        }
        if let Some(guard) = self.include_guard {
            config = config.include_guard(guard);
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Generate { config, output } => {
            let config = config.into_config()?;
            match output {
                Some(path) => config
                    .output_file(&path)
                    .generate()
                    .with_context(|| format!("writing {}", path.display()))?,
                None => config.write_to(&mut std::io::stdout().lock())?,
            }
        }
        Command::Expand {
            config,
            glue,
            calls,
        } => {
            let config = config.into_config()?;
            let dispatch = config.context()?.dispatch_table();
            let mut pp = config.preprocessor()?;

            if let Some(glue) = glue {
                let source = std::fs::read_to_string(&glue)
                    .with_context(|| format!("reading {}", glue.display()))?;
                pp.load(&source)?;
            }

            let mut stdout = std::io::stdout().lock();
            for call in calls {
                let expansion = pp.expand(&call)?;
                writeln!(stdout, "{expansion}")?;
                expansion
                    .check_dispatch(&dispatch)
                    .with_context(|| format!("expanding {call}"))?;
            }
        }
    }

    Ok(())
}
