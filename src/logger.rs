//! The [`Logger`] front end and the process default logger.

use crate::{
    attr::{module_from_file, Attr, Fields},
    config::{parse_level, Config, DEFAULT_LEVEL},
    context::Context,
    error::Error,
    handler::ContextLogger,
};
use arc_swap::ArcSwap;
use lazy_static::lazy_static;
use log::{Level, LevelFilter};
use std::{fmt, panic::Location, sync::Arc};

const TARGET: &str = "ctx_env_logger";

lazy_static! {
    static ref DEFAULT: ArcSwap<Logger> =
        ArcSwap::from_pointee(Config::default().into_logger(env_logger::Target::Stdout));
}

/// Emits records through a [`ContextLogger`].
///
/// Cloning is cheap; clones share the same base emitter.
#[derive(Clone)]
pub struct Logger {
    handler: ContextLogger,
    context: Option<Arc<[Attr]>>,
    config: Option<Arc<Config>>,
}

impl Logger {
    /// Wraps a custom base emitter
    pub fn new<L>(inner: L) -> Self
    where
        L: log::Log + 'static,
    {
        Self {
            handler: ContextLogger::new(inner),
            context: None,
            config: None,
        }
    }

    pub(crate) fn from_parts(
        handler: ContextLogger,
        config: Arc<Config>,
    ) -> Self {
        Self {
            handler,
            context: None,
            config: Some(config),
        }
    }

    pub fn handler(&self) -> &ContextLogger {
        &self.handler
    }

    /// Returns a logger that adds `attrs` to every record, after the call
    /// site and context attributes
    pub fn with<I>(
        &self,
        attrs: I,
    ) -> Self
    where
        I: IntoIterator<Item = Attr>,
    {
        Self {
            handler: self.handler.with_attrs(attrs),
            ..self.clone()
        }
    }

    /// Returns a logger whose context-less calls (`info`, `warn`, ...) read
    /// the attributes carried by `ctx`
    pub fn with_context(
        &self,
        ctx: &Context,
    ) -> Self {
        Self {
            context: ctx.carrier(),
            ..self.clone()
        }
    }

    /// Minimum level this logger was configured with, when built by a
    /// [`Builder`](crate::Builder)
    pub fn level(&self) -> Option<Level> {
        self.config.as_ref().map(|config| config.level)
    }

    pub fn enabled(
        &self,
        level: Level,
    ) -> bool {
        self.handler.enabled(
            &log::Metadata::builder()
                .level(level)
                .target(TARGET)
                .build(),
        )
    }

    /// Emits `msg` at `level` with the attributes carried by `ctx`
    #[track_caller]
    pub fn log(
        &self,
        ctx: &Context,
        level: Level,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(ctx.attrs(), level, None, msg, attrs, Location::caller())
    }

    /// Like [`Logger::log`] with the caller's module path, which names the
    /// function in the `source` field. The [`log!`](crate::log) family of
    /// macros fills it in with `module_path!()`.
    #[track_caller]
    pub fn log_at(
        &self,
        ctx: &Context,
        level: Level,
        module_path: &'static str,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(
            ctx.attrs(),
            level,
            Some(module_path),
            msg,
            attrs,
            Location::caller(),
        )
    }

    #[track_caller]
    pub fn trace(
        &self,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(self.context(), Level::Trace, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn debug(
        &self,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(self.context(), Level::Debug, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn info(
        &self,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(self.context(), Level::Info, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn warn(
        &self,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(self.context(), Level::Warn, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn error(
        &self,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(self.context(), Level::Error, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn trace_ctx(
        &self,
        ctx: &Context,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(ctx.attrs(), Level::Trace, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn debug_ctx(
        &self,
        ctx: &Context,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(ctx.attrs(), Level::Debug, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn info_ctx(
        &self,
        ctx: &Context,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(ctx.attrs(), Level::Info, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn warn_ctx(
        &self,
        ctx: &Context,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(ctx.attrs(), Level::Warn, None, msg, attrs, Location::caller())
    }

    #[track_caller]
    pub fn error_ctx(
        &self,
        ctx: &Context,
        msg: &str,
        attrs: &[Attr],
    ) {
        self.emit(ctx.attrs(), Level::Error, None, msg, attrs, Location::caller())
    }

    fn context(&self) -> &[Attr] {
        self.context.as_deref().unwrap_or(&[])
    }

    // without an explicit module path, one is derived from the caller's file
    fn emit(
        &self,
        context: &[Attr],
        level: Level,
        module_path: Option<&'static str>,
        msg: &str,
        attrs: &[Attr],
        location: &'static Location<'static>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let derived = match module_path {
            Some(_) => None,
            None => module_from_file(location.file()),
        };
        let mut call_site = Fields::default();
        call_site.extend(attrs);
        self.handler.emit_attrs(
            context,
            &log::Record::builder()
                .args(format_args!("{}", msg))
                .level(level)
                .target(TARGET)
                .module_path(module_path.or(derived.as_deref()))
                .file_static(Some(location.file()))
                .line(Some(location.line()))
                .key_values(&call_site)
                .build(),
        );
    }
}

impl fmt::Debug for Logger {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Logger")
            .field("handler", &self.handler)
            .field("context", &self.context())
            .field("level", &self.level())
            .finish()
    }
}

/// Atomically replaces the process default logger
pub fn set_default(logger: Logger) {
    DEFAULT.store(Arc::new(logger));
}

/// The process default logger. Until one is set this is a text logger on
/// stdout at `Info`
pub fn default_logger() -> Logger {
    Logger::clone(&DEFAULT.load())
}

/// The logger carried by `ctx` (or the default logger) reading `ctx`'s
/// attributes on every call
pub fn logger_from_context(ctx: &Context) -> Logger {
    ctx.logger()
        .cloned()
        .unwrap_or_else(default_logger)
        .with_context(ctx)
}

/// Short for [`logger_from_context`]
pub fn l(ctx: &Context) -> Logger {
    logger_from_context(ctx)
}

/// The context's logger with `attrs` bound eagerly
pub fn with_attrs<I>(
    ctx: &Context,
    attrs: I,
) -> Logger
where
    I: IntoIterator<Item = Attr>,
{
    logger_from_context(ctx).with(attrs)
}

/// Rebuilds the default logger at a new level and swaps it in
///
/// The default's other options are kept. Unrecognized names fall back to
/// `Info`
pub fn set_log_level(level: &str) -> Result<Level, Error> {
    let level = parse_level(level);
    let mut config = default_logger()
        .config
        .as_deref()
        .cloned()
        .unwrap_or_default();
    config.level = level;
    set_default(config.build()?);
    Ok(level)
}

/// Level of the default logger
pub fn log_level() -> Level {
    default_logger().level().unwrap_or(DEFAULT_LEVEL)
}

// routes the `log` crate's macros to whatever logger is the default right now
struct Facade;

impl log::Log for Facade {
    fn enabled(
        &self,
        metadata: &log::Metadata,
    ) -> bool {
        DEFAULT.load().handler.enabled(metadata)
    }

    fn log(
        &self,
        record: &log::Record,
    ) {
        let logger = DEFAULT.load();
        logger.handler.emit_attrs(logger.context(), record)
    }

    fn flush(&self) {
        log::Log::flush(&DEFAULT.load().handler)
    }
}

static FACADE: Facade = Facade;

pub(crate) fn install() -> Result<(), log::SetLoggerError> {
    log::set_logger(&FACADE)?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}
