//! Logger construction from options and named environment presets.

use crate::{
    attr::Attr,
    error::Error,
    format::{Encoder, ReplaceAttr},
    handler::ContextLogger,
    logger::{self, Logger},
};
use env_logger::Target;
use log::Level;
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const ENV_LOCAL: &str = "local";
pub const ENV_DEV: &str = "dev";
pub const ENV_PROD: &str = "prod";

/// File the `prod` preset appends to
pub const DEFAULT_LOG_FILE: &str = "log.txt";

pub const DEFAULT_LEVEL: Level = Level::Info;

/// Environment variable whose `env_logger` directives refine the configured
/// level, e.g. `RUST_LOG=warn,my_app::db=trace`
pub const DEFAULT_FILTER_ENV: &str = "RUST_LOG";

/// Parses a level name case-insensitively, falling back to `Info` for
/// anything unrecognized
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Level::Warn,
        other => other.parse().unwrap_or(DEFAULT_LEVEL),
    }
}

/// A cloneable handle to a writer shared between loggers
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<dyn Write + Send>>);

impl SharedWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self(Arc::new(Mutex::new(writer)))
    }
}

impl Write for SharedWriter {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?
            .flush()
    }
}

/// Primary destination of encoded records
#[derive(Clone)]
pub enum Output {
    Stdout,
    Stderr,
    Writer(SharedWriter),
}

impl Output {
    fn writer(&self) -> Box<dyn Write + Send> {
        match self {
            Output::Stdout => Box::new(io::stdout()),
            Output::Stderr => Box::new(io::stderr()),
            Output::Writer(writer) => Box::new(writer.clone()),
        }
    }
}

// writes every buffer to both sides, primary first
struct Tee<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}

fn open_log_file(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::OpenFile {
            path: path.to_owned(),
            source,
        })
}

#[derive(Clone)]
pub(crate) struct Config {
    pub(crate) level: Level,
    filter_env: Option<String>,
    json: bool,
    add_source: bool,
    output: Output,
    file_log: Option<PathBuf>,
    only_file: bool,
    remove_time: bool,
    replace_attr: Option<ReplaceAttr>,
    set_default: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            filter_env: Some(DEFAULT_FILTER_ENV.to_owned()),
            json: false,
            add_source: false,
            output: Output::Stdout,
            file_log: None,
            only_file: false,
            remove_time: false,
            replace_attr: None,
            set_default: true,
        }
    }
}

impl Config {
    fn target(&self) -> Result<Target, Error> {
        let file = match &self.file_log {
            Some(path) => Some(open_log_file(path)?),
            None => None,
        };
        Ok(match (file, &self.output) {
            (None, Output::Stdout) => Target::Stdout,
            (None, Output::Stderr) => Target::Stderr,
            (None, output) => Target::Pipe(output.writer()),
            (Some(file), _) if self.only_file => Target::Pipe(Box::new(file)),
            (Some(file), output) => Target::Pipe(Box::new(Tee {
                primary: output.writer(),
                secondary: file,
            })),
        })
    }

    pub(crate) fn build(self) -> Result<Logger, Error> {
        let target = self.target()?;
        Ok(self.into_logger(target))
    }

    pub(crate) fn into_logger(
        self,
        target: Target,
    ) -> Logger {
        let encoder = Encoder {
            json: self.json,
            add_source: self.add_source,
            remove_time: self.remove_time,
            replace: self.replace_attr.clone(),
        };
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.level.to_level_filter());
        // directives from the environment win over the configured level
        if let Some(var) = &self.filter_env {
            builder.parse_env(env_logger::Env::new().filter(var.as_str()));
        }
        let emitter = builder
            .target(target)
            .format(move |f, record| encoder.format(f, record))
            .build();
        Logger::from_parts(ContextLogger::new(emitter), Arc::new(self))
    }
}

/// Configures and builds a [`Logger`]
///
/// Defaults to `Info` level, human readable text on stdout, no source
/// location, and installing the result as the process default logger.
#[derive(Clone, Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for a named deployment environment
    ///
    /// * `local`: `Debug`, text, no source
    /// * `dev`: `Debug`, JSON, source
    /// * `prod`: `Info`, JSON, source, stdout plus [`DEFAULT_LOG_FILE`]
    /// * anything else: `Info`, JSON, source
    pub fn for_env(env: &str) -> Self {
        let mut config = Config {
            json: true,
            add_source: true,
            ..Config::default()
        };
        match env {
            ENV_LOCAL => {
                config.level = Level::Debug;
                config.json = false;
                config.add_source = false;
            }
            ENV_DEV => config.level = Level::Debug,
            ENV_PROD => config.file_log = Some(DEFAULT_LOG_FILE.into()),
            _ => {}
        }
        Self { config }
    }

    /// Sets the minimum level from its name, see [`parse_level`]
    pub fn level(
        &mut self,
        level: &str,
    ) -> &mut Self {
        self.filter_level(parse_level(level))
    }

    pub fn filter_level(
        &mut self,
        level: Level,
    ) -> &mut Self {
        self.config.level = level;
        self
    }

    /// Reads `env_logger` filter directives from `var` instead of
    /// [`DEFAULT_FILTER_ENV`]
    pub fn parse_env(
        &mut self,
        var: &str,
    ) -> &mut Self {
        self.config.filter_env = Some(var.to_owned());
        self
    }

    /// Filters by the configured level alone, ignoring the environment
    pub fn ignore_env(&mut self) -> &mut Self {
        self.config.filter_env = None;
        self
    }

    pub fn json(
        &mut self,
        json: bool,
    ) -> &mut Self {
        self.config.json = json;
        self
    }

    /// Adds the source file, line and module of each call site
    pub fn add_source(
        &mut self,
        add_source: bool,
    ) -> &mut Self {
        self.config.add_source = add_source;
        self
    }

    pub fn output(
        &mut self,
        output: Output,
    ) -> &mut Self {
        self.config.output = output;
        self
    }

    pub fn writer<W>(
        &mut self,
        writer: W,
    ) -> &mut Self
    where
        W: Write + Send + 'static,
    {
        self.output(Output::Writer(SharedWriter::new(writer)))
    }

    /// Also appends records to `path`. An empty path is ignored
    pub fn file_log(
        &mut self,
        path: impl AsRef<Path>,
    ) -> &mut Self {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() {
            self.config.file_log = Some(path.to_owned());
        }
        self
    }

    /// Writes only to the log file, skipping the primary output
    pub fn only_file(
        &mut self,
        only_file: bool,
    ) -> &mut Self {
        self.config.only_file = only_file;
        self
    }

    pub fn remove_time(
        &mut self,
        remove_time: bool,
    ) -> &mut Self {
        self.config.remove_time = remove_time;
        self
    }

    /// Replaces the default normalization of the built-in fields
    /// (see [`normalize`](crate::normalize))
    pub fn replace_attr<F>(
        &mut self,
        replace: F,
    ) -> &mut Self
    where
        F: Fn(Attr) -> Option<Attr> + Send + Sync + 'static,
    {
        self.config.replace_attr = Some(Arc::new(replace));
        self
    }

    /// Whether [`build`](Builder::build) installs the logger as the process
    /// default
    pub fn set_default(
        &mut self,
        set_default: bool,
    ) -> &mut Self {
        self.config.set_default = set_default;
        self
    }

    pub fn build(&self) -> Result<Logger, Error> {
        let logger = self.config.clone().build()?;
        if self.config.set_default {
            logger::set_default(logger.clone());
        }
        Ok(logger)
    }

    /// Builds the logger, makes it the process default and routes the `log`
    /// crate's macros through it
    ///
    /// Will yield an error when a `log` logger has already been installed
    pub fn try_init(&self) -> Result<Logger, Error> {
        let logger = self.config.clone().build()?;
        logger::install()?;
        logger::set_default(logger.clone());
        Ok(logger)
    }

    /// # panics
    ///
    /// Panics if a `log` logger has already been installed or the log file
    /// cannot be opened
    pub fn init(&self) -> Logger {
        self.try_init()
            .expect("Builder::init should not be called after logger initialization")
    }
}
