//! an example demonstrating request scoped attributes
//! every record logged with a context carries the attributes appended to it

use ctx_env_logger::{
    append_ctx, default_logger, info, l, set_remove_time, string, Builder, Context,
};
use std::thread;

fn handle(
    ctx: &Context,
    user: &'static str,
) {
    let ctx = ctx.append([string("user", user)]);
    l(&ctx).info("handling request", &[]);
    audit(&ctx);
}

// the macros record this module's path as the source function
fn audit(ctx: &Context) {
    info!(default_logger(), ctx, "audit written", string("table", "events"));
}

fn main() -> Result<(), ctx_env_logger::Error> {
    set_remove_time(true);
    let logger = Builder::new().add_source(true).build()?;

    let ctx = append_ctx(&Context::new(), [string("userID", "1")]);
    logger.info_ctx(&ctx, "example1", &[]);
    let ctx = append_ctx(&ctx, [string("userID", "2")]);
    logger.info_ctx(&ctx, "example2", &[]);
    let ctx = append_ctx(&ctx, [string("metod", "GET")]);
    logger.info_ctx(&ctx, "example3", &[]);

    // sibling requests derived from one base never see each other's attributes
    let base = Context::new().append([string("service", "api")]);
    thread::scope(|s| {
        for user in ["alice", "bob"] {
            let base = &base;
            s.spawn(move || handle(base, user));
        }
    });
    Ok(())
}
