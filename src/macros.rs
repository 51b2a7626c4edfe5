//! Logging macros that record the caller's module path.
//!
//! Each takes a [`Logger`](crate::Logger), a `&Context`, a message and any
//! number of attributes:
//!
//! ```
//! use ctx_env_logger::{builder, string, warn, Context};
//!
//! let logger = builder().set_default(false).build().unwrap();
//! let ctx = Context::new().append([string("request_id", "r-1")]);
//! warn!(logger, &ctx, "slow response", string("route", "/users"));
//! ```

/// Logs at an explicit [`Level`](crate::Level)
#[macro_export]
macro_rules! log {
    ($logger:expr, $ctx:expr, $level:expr, $msg:expr $(, $attr:expr)* $(,)?) => {
        $logger.log_at($ctx, $level, module_path!(), $msg, &[$($attr),*])
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Trace, $($rest)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Debug, $($rest)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Info, $($rest)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Warn, $($rest)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $ctx:expr, $($rest:tt)+) => {
        $crate::log!($logger, $ctx, $crate::Level::Error, $($rest)+)
    };
}
