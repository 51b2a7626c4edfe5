//! `ctx_env_logger` is an extension of `env_logger` crate providing structured logs with
//! request scoped attributes.
//!
//! Attributes appended to a [`Context`] travel with it down a request's call chain and are
//! added to every record logged with that context, without call sites repeating them.
//!
//! ```
//! use ctx_env_logger::{builder, string, Context};
//!
//! let logger = builder().set_default(false).build().unwrap();
//! let ctx = Context::new().append([string("userID", "1")]);
//! logger.info_ctx(&ctx, "example1", &[]); // level=INFO msg=example1 userID=1
//! ```
//!
//! Records are written by an `env_logger` emitter, either as `key=value` text or as one JSON
//! object per line. The built-in fields pass through a normalization hook: timestamps are
//! formatted as `YYYY-MM-DD HH:MM:SS.mmm`, source locations are trimmed to a file name and an
//! empty message is dropped.
//!
//! As with `env_logger`, directives in `RUST_LOG` (`RUST_LOG=debug`,
//! `RUST_LOG=warn,my_app::db=trace`) take precedence over the configured level. See
//! [`Builder::parse_env`] and [`Builder::ignore_env`].
//!
//! With `add_source` on, the `source` field names the calling module. The [`info!`] family of
//! macros records `module_path!()` exactly; plain [`Logger`] methods derive it from the
//! caller's file.
//!
//! ```
//! use ctx_env_logger::{builder, info, int64, Context};
//!
//! let logger = builder().set_default(false).add_source(true).build().unwrap();
//! let ctx = Context::new();
//! info!(logger, &ctx, "retrying", int64("attempt", 2));
//! ```
//!
//! ## features
//!
//! * `backtrace`
//!
//! When registering a panic hook with `panic_hook` by default backtraces are omitted. You can
//! annotate your error with then by enabling the `backtrace` feature.
//!
//! ```toml
//! [dependencies]
//! ctx_env_logger = { version = "0.1", features = ["backtrace"] }
//! ```

// export to make types accessible without
// requiring adding another Cargo.toml dependency
#[doc(hidden)]
pub extern crate env_logger;

mod attr;
mod config;
mod context;
mod error;
mod format;
mod handler;
mod logger;
mod macros;
#[cfg(test)]
mod test_util;

pub use crate::{
    attr::{
        any, bool, duration, err_attr, float64, group, int, int64, string, uint64, Attr, LogValue,
        Source, Value, ERROR_KEY, LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY,
    },
    config::{
        parse_level, Builder, Output, SharedWriter, DEFAULT_FILTER_ENV, DEFAULT_LEVEL,
        DEFAULT_LOG_FILE, ENV_DEV, ENV_LOCAL, ENV_PROD,
    },
    context::{append_ctx, Context},
    error::Error,
    format::{normalize, remove_time, set_remove_time, ReplaceAttr, TIME_FORMAT},
    handler::ContextLogger,
    logger::{
        default_logger, l, log_level, logger_from_context, set_default, set_log_level,
        with_attrs, Logger,
    },
};
pub use log::Level;

use std::{panic, thread};

/// Register the default configured logger as the process default and with `log` crate.
///
/// Applications should ensure this fn gets called once and only once per application
/// lifetime
///
/// # panics
///
/// Panics of logger has already been configured
pub fn init() -> Logger {
    builder().init()
}

/// Register the default configured logger as the process default and with `log` crate
///
/// Will yield an `Error::SetLogger` when a logger has already
/// been configured
pub fn try_init() -> Result<Logger, Error> {
    builder().try_init()
}

/// Yields a builder with the default configuration: `Info`, text on stdout
pub fn builder() -> Builder {
    Builder::new()
}

/// Register a panic hook that logs panic information as a structured error record
/// through the default logger
pub fn panic_hook() {
    panic::set_hook(Box::new(|info| {
        let thread = thread::current();
        let thread = thread.name().unwrap_or("unnamed").to_owned();

        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &**s,
                None => "Box<Any>",
            },
        };

        let mut attrs = vec![string("thread", thread)];
        if let Some(location) = info.location() {
            attrs.push(string(
                "location",
                format!("{}:{}", location.file(), location.line()),
            ));
        }
        #[cfg(feature = "backtrace")]
        attrs.push(string(
            "backtrace",
            format!("{:?}", backtrace::Backtrace::new()),
        ));

        default_logger().error(&format!("panicked at '{}'", msg), &attrs);
    }));
}
