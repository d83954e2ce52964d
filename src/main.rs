use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use entlog_core::{EntlogConfig, EntlogError, OutputFormat};
use entlog_cparse::ChangeRecord;
use entlog_history::decode::decode_blob;
use entlog_history::filter::PathFilter;
use entlog_history::status::parse_raw_line;
use entlog_history::{ChangelogBuilder, FileEntry};

/// Exit status for a change the revision layer cannot classify.
const FATAL_EXIT_CODE: i32 = 42;

#[derive(Parser)]
#[command(
    name = "entlog",
    version,
    about = "Approximate ChangeLog generator for C projects",
    long_about = "entlog lists, for every commit in a range, which files changed and which\n\
                   top-level C entities (functions, declarations, types, macros) inside them\n\
                   were added, removed or modified, and under which #if conditions.\n\n\
                   Examples:\n  \
                     entlog log glibc-2.27 glibc-2.28     ChangeLog for a release range\n  \
                     entlog diff old/dl-load.c dl-load.c  Entity diff of two files\n  \
                     entlog tree elf/rtld.c               Show the parsed scope tree\n  \
                     git log --raw | entlog raw           Classify recorded raw changes"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .entlog.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      GNU ChangeLog style (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Log debug detail to stderr
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Generate ChangeLog entries for a commit range
    #[command(long_about = "Generate ChangeLog entries for every commit in <FROM>..<TO>.\n\n\
        Commits are listed newest first. Commits touching only skipped paths\n\
        (ChangeLog files by default) are left out.\n\n\
        Examples:\n  entlog log HEAD~10 HEAD\n  entlog log v1.0 v1.1 --repo ../project --format markdown")]
    Log {
        /// Older revision (excluded)
        from: String,
        /// Newer revision (included)
        to: String,
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Compare the entities of two C files
    Diff {
        /// Old revision of the file
        old: PathBuf,
        /// New revision of the file
        new: PathBuf,
    },
    /// Print the parsed scope tree of a C file
    Tree {
        /// Source file to parse
        file: PathBuf,
    },
    /// Classify `git log --raw` change lines
    #[command(long_about = "Classify change lines in git's --raw format.\n\n\
        Reads `git log --raw` or `git show --raw` output from a file or stdin and\n\
        prints the ChangeLog header line for every changed path. An unknown\n\
        change status aborts with exit status 42.\n\n\
        Examples:\n  git log --raw HEAD~5..HEAD | entlog raw\n  entlog raw --file changes.txt")]
    Raw {
        /// Read from file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Create a default .entlog.toml configuration file
    #[command(long_about = "Create a default .entlog.toml configuration file.\n\n\
        Fails if .entlog.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# entlog configuration

[sources]
# File suffixes whose entities are diffed
extensions = ["c", "h"]
# Changed paths matching these globs are left out of the log
skip_patterns = ["*ChangeLog*"]

[decode]
# Tried in order until one succeeds
encodings = ["utf-8", "latin1"]
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(report) = run(cli) {
        if report
            .downcast_ref::<EntlogError>()
            .is_some_and(EntlogError::is_fatal)
        {
            eprintln!("{report:?}");
            std::process::exit(FATAL_EXIT_CODE);
        }
        return Err(report);
    }
    Ok(())
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EntlogConfig> {
    let config = match path {
        Some(path) => EntlogConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".entlog.toml");
            if default_path.exists() {
                EntlogConfig::from_file(default_path)?
            } else {
                EntlogConfig::default()
            }
        }
    };
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(format = %cli.format, "configuration loaded");

    match cli.command {
        Command::Log { from, to, repo } => {
            let repo = entlog_history::mining::open_repo(&repo)?;
            let changelog = ChangelogBuilder::new(&repo, &config).build(&from, &to)?;
            match cli.format {
                OutputFormat::Json => println!("{}", changelog.to_json()?),
                OutputFormat::Markdown => print!("{}", changelog.to_markdown()),
                OutputFormat::Text => print!("{changelog}"),
            }
        }
        Command::Diff { old, new } => {
            let old_text = read_source(&old, &config)?;
            let new_text = read_source(&new, &config)?;
            let records = entlog_cparse::diff_sources(&old_text, &new_text);
            print_records(&records, cli.format)?;
        }
        Command::Tree { file } => {
            let text = read_source(&file, &config)?;
            print!("{}", entlog_cparse::parse_source(&text).dump());
        }
        Command::Raw { file } => {
            let input = read_input(file.as_deref())?;
            let entries = classify_raw(&input, &PathFilter::from_config(&config.sources))?;
            match cli.format {
                OutputFormat::Json => println!("{}", to_json(&entries)?),
                OutputFormat::Markdown | OutputFormat::Text => {
                    for line in entries.iter().flat_map(FileEntry::header_lines) {
                        println!("\t{line}");
                    }
                }
            }
        }
        Command::Init => {
            let path = Path::new(".entlog.toml");
            if path.exists() {
                miette::bail!(".entlog.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .entlog.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "entlog", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn read_source(path: &Path, config: &EntlogConfig) -> Result<String> {
    if !path.exists() {
        return Err(EntlogError::FileNotFound(path.to_path_buf()).into());
    }
    let bytes = std::fs::read(path)
        .into_diagnostic()
        .wrap_err(format!("reading {}", path.display()))?;
    Ok(decode_blob(
        &bytes,
        &config.decode.encodings,
        &path.display().to_string(),
    )?)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

/// Header entries for every raw change line, attributed to the nearest
/// preceding `commit <id>` line.
fn classify_raw(input: &str, filter: &PathFilter) -> entlog_core::Result<Vec<FileEntry>> {
    let mut commit = String::from("-");
    let mut entries = Vec::new();
    for line in input.lines() {
        if let Some(id) = line.strip_prefix("commit ") {
            commit = id.split_whitespace().next().unwrap_or_default().to_owned();
            continue;
        }
        let Some(change) = parse_raw_line(line, &commit)? else {
            continue;
        };
        if filter.should_skip(&change.path) {
            tracing::debug!(path = %change.path, "skipped");
            continue;
        }
        entries.push(FileEntry::from_change(&change));
    }
    Ok(entries)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> entlog_core::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn print_records(records: &[ChangeRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", to_json(records)?);
        }
        OutputFormat::Markdown => {
            for record in records {
                println!("- `{record}`");
            }
        }
        OutputFormat::Text => {
            for record in records {
                println!("{record}");
            }
        }
    }
    Ok(())
}
