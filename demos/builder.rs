//! an example demonstrating the builder and the named environment presets
//! pass an environment name (local, dev, prod) as the first argument

use ctx_env_logger::{duration, err_attr, group, int64, string, Builder, ENV_LOCAL};
use std::{env, io, time::Duration};

fn main() -> Result<(), ctx_env_logger::Error> {
    let name = env::args().nth(1).unwrap_or_else(|| ENV_LOCAL.to_owned());
    if name == "prod" {
        eprintln!("the prod preset also appends to log.txt in the working directory");
    }
    let logger = Builder::for_env(&name).build()?;

    logger.debug("I am a debug", &[string("env", name.clone())]);
    logger.info(
        "request served",
        &[
            group(
                "http",
                vec![string("method", "GET"), int64("status", 200)],
            ),
            duration("took", Duration::from_millis(42)),
        ],
    );
    let err = io::Error::new(io::ErrorKind::Other, "connection reset");
    logger.error("upstream failed", &[err_attr(&err)]);
    logger.info("", &[string("note", "empty messages are dropped")]);

    let json = Builder::new().json(true).add_source(true).set_default(false).build()?;
    json.with([string("component", "billing")])
        .warn("invoice overdue", &[int64("days", 3)]);
    Ok(())
}
