//! an example demonstrating some common features for ctx_env_logger
//! log macros are routed through the process default logger once `init` has run

// note the use of kv_log_macro. it exposes structured fields
// in log-compatible macros, the same fields the log crate accepts with `key = value;`
use kv_log_macro::{debug, error, info, trace, warn};

fn main() {
    ctx_env_logger::init();
    ctx_env_logger::panic_hook();
    trace!("I am a trace", { task_id: 567, thread_id: "12" });
    debug!("I am a debug", { foo: 1 });
    info!("I am an info");
    warn!("I am a warning");
    error!("I am an error");
    log::info!(attempt = 2; "I am an info with native key values");
}
