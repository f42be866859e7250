use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use header_audit::{AllowList, Audit, DEFAULT_CPP_DIR, DEFAULT_CPP_MARKER, Pass};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PassArg {
    C,
    Cpp,
    All,
}

impl PassArg {
    fn passes(self) -> &'static [Pass] {
        match self {
            Self::C => &[Pass::C],
            Self::Cpp => &[Pass::Cpp],
            Self::All => &[Pass::C, Pass::Cpp],
        }
    }
}

/// Prints headers under the include root that are missing from the allow-list.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SDK include directory.
    #[arg(long = "include-root")]
    include_root: PathBuf,

    /// Newline-delimited list of allowed header paths.
    #[arg(long = "allow-list")]
    allow_list: PathBuf,

    /// Path component that marks C++ headers, skipped by the C pass.
    #[arg(long = "cpp-marker", default_value = DEFAULT_CPP_MARKER)]
    cpp_marker: String,

    /// Directory under the include root that the C++ pass covers.
    #[arg(long = "cpp-dir", default_value = DEFAULT_CPP_DIR)]
    cpp_dir: PathBuf,

    #[arg(long = "pass", value_enum, default_value = "all")]
    pass: PassArg,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let allow = AllowList::load(&args.allow_list)?;
    let audit = Audit::new(args.include_root)
        .cpp_marker(args.cpp_marker)
        .cpp_dir(args.cpp_dir);

    let mut stdout = std::io::stdout().lock();
    for pass in args.pass.passes() {
        for path in audit.run(*pass, &allow)? {
            writeln!(stdout, "{path}")?;
        }
    }

    Ok(())
}
