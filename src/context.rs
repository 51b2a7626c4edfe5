//! Request scoped attribute accumulation.
//!
//! A [`Context`] is an immutable handle threaded through a request's call
//! chain. Deriving a child with [`Context::append`] never touches the parent,
//! so sibling requests that share an ancestor cannot observe each other's
//! attributes.

use crate::{attr::Attr, logger::Logger};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Context {
    attrs: Option<Arc<[Attr]>>,
    logger: Option<Logger>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a child context carrying this context's attributes followed
    /// by `attrs`.
    ///
    /// An attribute whose key is already carried by this context replaces
    /// the earlier value in place; new keys are appended in order. Keys
    /// repeated within `attrs` itself are all kept. Attributes passed to a
    /// single log call or bound with [`Logger::with`] are never merged this
    /// way, only the accumulated context chain is.
    pub fn append<I>(
        &self,
        attrs: I,
    ) -> Context
    where
        I: IntoIterator<Item = Attr>,
    {
        let mut attrs = attrs.into_iter().peekable();
        if attrs.peek().is_none() {
            return self.clone();
        }
        let mut merged = self.attrs().to_vec();
        let carried = merged.len();
        // a carried slot is replaced once, later repeats are new attributes
        let mut replaced = vec![false; carried];
        for attr in attrs {
            let slot = if attr.key.is_empty() {
                None
            } else {
                merged[..carried]
                    .iter()
                    .position(|held| held.key == attr.key)
            };
            match slot {
                Some(i) if !replaced[i] => {
                    merged[i] = attr;
                    replaced[i] = true;
                }
                _ => merged.push(attr),
            }
        }
        Context {
            attrs: Some(merged.into()),
            logger: self.logger.clone(),
        }
    }

    /// The full accumulated attribute sequence, empty when nothing was
    /// appended
    pub fn attrs(&self) -> &[Attr] {
        self.attrs.as_deref().unwrap_or(&[])
    }

    pub(crate) fn carrier(&self) -> Option<Arc<[Attr]>> {
        self.attrs.clone()
    }

    /// Returns a child context that carries `logger`
    pub fn with_logger(
        &self,
        logger: Logger,
    ) -> Context {
        Context {
            attrs: self.attrs.clone(),
            logger: Some(logger),
        }
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }
}

/// Free function form of [`Context::append`]
pub fn append_ctx<I>(
    ctx: &Context,
    attrs: I,
) -> Context
where
    I: IntoIterator<Item = Attr>,
{
    ctx.append(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{int64, string};
    use std::thread;

    #[test]
    fn appends_accumulate_in_order() {
        let base = Context::new().append([string("a", "1")]);
        let child = base.append([string("b", "2")]).append([string("c", "3")]);
        assert_eq!(
            child.attrs(),
            &[string("a", "1"), string("b", "2"), string("c", "3")][..]
        );
    }

    #[test]
    fn append_leaves_parent_untouched() {
        let parent = Context::new().append([string("request_id", "r-1")]);
        let _child = parent.append([string("user", "alice")]);
        assert_eq!(parent.attrs(), &[string("request_id", "r-1")][..]);
    }

    #[test]
    fn siblings_are_independent() {
        let base = Context::new().append([string("service", "api")]);
        let (left, right) = thread::scope(|s| {
            let left = s.spawn(|| base.append([int64("x", 1)]));
            let right = s.spawn(|| base.append([int64("y", 2)]));
            (left.join().unwrap(), right.join().unwrap())
        });
        assert!(left.attrs().contains(&int64("x", 1)));
        assert!(!left.attrs().contains(&int64("y", 2)));
        assert!(right.attrs().contains(&int64("y", 2)));
        assert!(!right.attrs().contains(&int64("x", 1)));
        assert_eq!(base.attrs(), &[string("service", "api")][..]);
    }

    #[test]
    fn empty_context_has_no_attrs() {
        assert!(Context::new().attrs().is_empty());
        assert!(Context::new().logger().is_none());
    }

    #[test]
    fn appending_nothing_shares_the_carrier() {
        let ctx = Context::new().append([string("a", "1")]);
        let same = ctx.append(Vec::new());
        assert_eq!(ctx.attrs().as_ptr(), same.attrs().as_ptr());
    }

    #[test]
    fn repeated_key_replaces_in_place() {
        let ctx = append_ctx(&Context::new(), [string("userID", "1")]);
        let ctx = append_ctx(&ctx, [string("userID", "2")]);
        let ctx = append_ctx(&ctx, [string("metod", "GET")]);
        assert_eq!(
            ctx.attrs(),
            &[string("userID", "2"), string("metod", "GET")][..]
        );
    }

    #[test]
    fn repeated_key_within_one_append_is_kept() {
        let ctx = Context::new().append([string("tag", "a"), string("tag", "b")]);
        assert_eq!(ctx.attrs(), &[string("tag", "a"), string("tag", "b")][..]);

        let ctx = ctx.append([string("tag", "c"), string("tag", "d")]);
        assert_eq!(
            ctx.attrs(),
            &[
                string("tag", "c"),
                string("tag", "b"),
                string("tag", "d")
            ][..]
        );
    }
}
