//! seqmark - terminal editor for annotated sequences
//!
//! ## Usage
//!
//! ```bash
//! seqmark                          # empty document
//! seqmark genes.json               # edit a save file
//! seqmark -f fasta reads.txt       # force the input format
//! seqmark genes.json -o - -t layout --show-hidden   # print the layout
//! seqmark genes.json -o genes.fa   # convert
//! ```
//!
//! ## Formats
//!
//! - JSON save files (.json): sequences, annotations, hidden columns
//! - FASTA (.fasta, .fa, .fna, .faa, .fas, .ffn, .frn): sequences only
//!
//! Inside the editor press `?` for keys and `:help` for commands.

#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn, LevelFilter};

use seqmark::controller::run_app;
use seqmark::document::{Document, Snapshot};
use seqmark::formats::{self, load_file_with_options, FileFormat, ParseError};
use seqmark::state::AppState;
use seqmark::ui::glyphs;
use seqmark::view::{render_text, ViewSettings, DEFAULT_COLUMNS};

/// File format specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// JSON save file
    Json,
    /// FASTA format
    Fasta,
    /// Auto-detect from extension and content
    Auto,
}

impl From<FormatArg> for Option<FileFormat> {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => Some(FileFormat::Json),
            FormatArg::Fasta => Some(FileFormat::Fasta),
            FormatArg::Auto => None,
        }
    }
}

/// Output kind in CLI mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    /// JSON save file
    Json,
    /// FASTA (names and letters only)
    Fasta,
    /// Text layout with ruler, as shown in the editor
    Layout,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

/// seqmark - a Vim-style terminal editor for annotated sequences
///
/// Without -o/--output, opens the interactive editor.
/// With -o/--output, converts the input and writes it to a file (or stdout with "-").
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document to open (JSON save file or FASTA)
    file: Option<PathBuf>,

    /// Force a specific input format (overrides auto-detection)
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    format: FormatArg,

    /// Output file (enables CLI mode). Use "-" for stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Output kind in CLI mode (default: from the output extension, else JSON)
    #[arg(short = 't', long = "to", value_enum)]
    to: Option<OutputArg>,

    /// Columns per block when wrapping
    #[arg(short = 'c', long = "columns", default_value_t = DEFAULT_COLUMNS)]
    columns: usize,

    /// Show each sequence on a single line
    #[arg(long = "no-wrap")]
    no_wrap: bool,

    /// Show hidden columns
    #[arg(long = "show-hidden")]
    show_hidden: bool,

    /// Use Unicode glyphs for the ruler and shortened names
    #[arg(long = "fancy")]
    fancy: bool,

    /// Log level (overrides RUST_LOG). The editor logs to a file in the temp directory.
    #[arg(short = 'l', long = "log-level", value_enum)]
    log_level: Option<LogLevelArg>,
}

impl Args {
    fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            wrap: !self.no_wrap,
            columns: self.columns,
            show_hidden: self.show_hidden,
        }
    }
}

fn logger(level: Option<LogLevelArg>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format_target(false);
    if let Some(level) = level {
        builder.filter_level(level.into());
    }
    builder
}

/// Sends the log to a fresh file in the temp directory, so that it does not
/// draw over the editor. Only done when logging was asked for.
fn init_editor_logging(level: Option<LogLevelArg>) -> Result<Option<PathBuf>> {
    if level.is_none() && std::env::var_os("RUST_LOG").is_none() {
        return Ok(None);
    }
    let path = std::env::temp_dir().join(format!("seqmark-{:08x}.log", rand::random::<u32>()));
    let file = File::create(&path).with_context(|| format!("Cannot create log file {}", path.display()))?;
    logger(level)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(Some(path))
}

/// Runs CLI mode: load the input and write it in the requested form.
fn run_cli_mode(args: &Args, output: &str) -> Result<()> {
    let file_path = args
        .file
        .as_ref()
        .context("An input file is required with -o/--output")?;
    let (snapshot, format) = load_file_with_options(file_path, args.format.into())?;
    info!("read {} as {}", file_path.display(), format);

    let to = args.to.unwrap_or_else(|| match formats::detect_format_from_extension(output) {
        Some(FileFormat::Fasta) => OutputArg::Fasta,
        _ if output == "-" => OutputArg::Layout,
        _ => OutputArg::Json,
    });

    if output == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_output(&mut handle, &snapshot, to, args)?;
        handle.flush()?;
    } else {
        let mut writer = BufWriter::new(File::create(output).with_context(|| format!("Cannot create {}", output))?);
        write_output(&mut writer, &snapshot, to, args)?;
        writer.flush()?;
        eprintln!("Wrote {} sequences to {}", snapshot.sequences.len(), output);
    }

    Ok(())
}

fn write_output<W: Write>(writer: &mut W, snapshot: &Snapshot, to: OutputArg, args: &Args) -> Result<()> {
    match to {
        OutputArg::Json => formats::write_document(writer, snapshot, FileFormat::Json)?,
        OutputArg::Fasta => {
            if !snapshot.annotations.is_empty() || !snapshot.hidden_columns.is_empty() {
                warn!("FASTA output drops annotations and hidden columns");
            }
            formats::write_document(writer, snapshot, FileFormat::Fasta)?
        }
        OutputArg::Layout => {
            let document = Document::from_snapshot(snapshot.clone());
            let text = render_text(&document, &args.view_settings(), &glyphs::select(args.fancy));
            writer.write_all(text.as_bytes())?;
        }
    }
    Ok(())
}

/// Loads the document for the editor. A path that does not exist yet, or an
/// empty file, gives an empty document that will be saved there.
fn load_for_editor(path: &Path, forced: Option<FileFormat>) -> Result<(Document, Option<String>)> {
    if !path.exists() {
        return Ok((Document::new(), Some(format!("New file {}", path.display()))));
    }
    match load_file_with_options(path, forced) {
        Ok((snapshot, format)) => {
            let message = format!("{} sequences ({})", snapshot.sequences.len(), format);
            Ok((Document::from_snapshot(snapshot), Some(message)))
        }
        Err(ParseError::EmptyFile) => Ok((Document::new(), Some(format!("{} is empty", path.display())))),
        Err(e) => Err(e).with_context(|| format!("Cannot open {}", path.display())),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.columns == 0 {
        anyhow::bail!("--columns must be at least 1");
    }

    // CLI mode: output to file/stdout
    if let Some(output) = args.output.clone() {
        logger(args.log_level).init();
        return run_cli_mode(&args, &output);
    }

    let log_path = init_editor_logging(args.log_level)?;
    let (document, message) = match &args.file {
        Some(path) => load_for_editor(path, args.format.into())?,
        None => (Document::new(), None),
    };

    let mut state = AppState::new(document, args.view_settings(), glyphs::select(args.fancy)).with_log_path(log_path);
    if let Some(path) = &args.file {
        state = state.with_file(path.clone());
    }
    state.status_message = message;

    run_app(state)
}
