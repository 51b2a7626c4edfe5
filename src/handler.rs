//! The context aware decorator around a [`log::Log`] emitter.

use crate::{
    attr::{Attr, Fields},
    context::Context,
};
use log::kv;
use std::{fmt, sync::Arc};

/// Wraps a base emitter and merges context and bound attributes into every
/// record before handing it on.
///
/// Attribute order on the forwarded record is: the record's own key/values
/// (call site), then the context's accumulated attributes, then attributes
/// bound with [`ContextLogger::with_attrs`]. Nothing is deduplicated across
/// those three groups.
#[derive(Clone)]
pub struct ContextLogger {
    inner: Arc<dyn log::Log>,
    attrs: Arc<[Attr]>,
}

impl ContextLogger {
    pub fn new<L>(inner: L) -> Self
    where
        L: log::Log + 'static,
    {
        Self {
            inner: Arc::new(inner),
            attrs: Vec::new().into(),
        }
    }

    /// Returns a decorator sharing the same emitter with `attrs` bound after
    /// any attributes bound earlier
    pub fn with_attrs<I>(
        &self,
        attrs: I,
    ) -> Self
    where
        I: IntoIterator<Item = Attr>,
    {
        let mut bound = self.attrs.to_vec();
        bound.extend(attrs);
        Self {
            inner: self.inner.clone(),
            attrs: bound.into(),
        }
    }

    pub fn bound(&self) -> &[Attr] {
        &self.attrs
    }

    pub fn enabled(
        &self,
        metadata: &log::Metadata<'_>,
    ) -> bool {
        self.inner.enabled(metadata)
    }

    /// Emits `record` with the attributes carried by `ctx`
    pub fn emit(
        &self,
        ctx: &Context,
        record: &log::Record<'_>,
    ) {
        self.emit_attrs(ctx.attrs(), record)
    }

    pub(crate) fn emit_attrs(
        &self,
        context: &[Attr],
        record: &log::Record<'_>,
    ) {
        let mut extra = Fields::default();
        extra.extend(context);
        extra.extend(&self.attrs);
        if extra.is_empty() {
            return self.inner.log(record);
        }
        let merged = Merged {
            source: record.key_values(),
            extra: &extra,
        };
        self.inner
            .log(&record.to_builder().key_values(&merged).build());
    }
}

impl fmt::Debug for ContextLogger {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ContextLogger")
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

impl log::Log for ContextLogger {
    fn enabled(
        &self,
        metadata: &log::Metadata,
    ) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(
        &self,
        record: &log::Record,
    ) {
        self.emit_attrs(&[], record)
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

struct Merged<'a> {
    source: &'a dyn kv::Source,
    extra: &'a Fields,
}

impl kv::Source for Merged<'_> {
    fn visit<'kvs>(
        &'kvs self,
        visitor: &mut dyn kv::VisitSource<'kvs>,
    ) -> Result<(), kv::Error> {
        self.source.visit(visitor)?;
        self.extra.visit(visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::{group, int64, string};
    use std::sync::Mutex;

    type Pairs = Vec<(String, serde_json::Value)>;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Pairs>>>);

    impl Recorder {
        fn records(&self) -> Vec<Pairs> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Collect(Pairs);

    impl<'kvs> kv::VisitSource<'kvs> for Collect {
        fn visit_pair(
            &mut self,
            key: kv::Key<'kvs>,
            value: kv::Value<'kvs>,
        ) -> Result<(), kv::Error> {
            let value = serde_json::to_value(&value).map_err(kv::Error::boxed)?;
            self.0.push((key.to_string(), value));
            Ok(())
        }
    }

    impl log::Log for Recorder {
        fn enabled(
            &self,
            _: &log::Metadata,
        ) -> bool {
            true
        }

        fn log(
            &self,
            record: &log::Record,
        ) {
            let mut collect = Collect(Vec::new());
            record.key_values().visit(&mut collect).unwrap();
            self.0.lock().unwrap().push(collect.0);
        }

        fn flush(&self) {}
    }

    fn pair(
        key: &str,
        value: impl Into<serde_json::Value>,
    ) -> (String, serde_json::Value) {
        (key.to_owned(), value.into())
    }

    fn emit(
        logger: &ContextLogger,
        ctx: &Context,
        call_site: &[Attr],
    ) {
        let mut fields = Fields::default();
        fields.extend(call_site);
        logger.emit(
            ctx,
            &log::Record::builder()
                .args(format_args!("hello"))
                .level(log::Level::Info)
                .key_values(&fields)
                .build(),
        );
    }

    #[test]
    fn call_site_then_context_then_bound() {
        let recorder = Recorder::default();
        let logger = ContextLogger::new(recorder.clone()).with_attrs([string("k3", "v3")]);
        let ctx = Context::new().append([string("k2", "v2")]);
        emit(&logger, &ctx, &[string("k1", "v1")]);
        assert_eq!(
            recorder.records(),
            vec![vec![pair("k1", "v1"), pair("k2", "v2"), pair("k3", "v3")]]
        );
    }

    #[test]
    fn duplicates_across_layers_are_all_forwarded() {
        let recorder = Recorder::default();
        let logger = ContextLogger::new(recorder.clone()).with_attrs([int64("userID", 3)]);
        let ctx = Context::new().append([int64("userID", 2)]);
        emit(&logger, &ctx, &[int64("userID", 1)]);
        assert_eq!(
            recorder.records(),
            vec![vec![
                pair("userID", 1),
                pair("userID", 2),
                pair("userID", 3)
            ]]
        );
    }

    #[test]
    fn bound_attrs_stack() {
        let logger = ContextLogger::new(Recorder::default())
            .with_attrs([string("a", "1")])
            .with_attrs([string("b", "2")]);
        assert_eq!(logger.bound(), &[string("a", "1"), string("b", "2")][..]);
    }

    #[test]
    fn empty_context_forwards_record_as_is() {
        let recorder = Recorder::default();
        let logger = ContextLogger::new(recorder.clone());
        emit(&logger, &Context::new(), &[string("only", "me")]);
        assert_eq!(recorder.records(), vec![vec![pair("only", "me")]]);
    }

    #[test]
    fn context_groups_are_forwarded_whole() {
        let recorder = Recorder::default();
        let logger = ContextLogger::new(recorder.clone());
        let ctx = Context::new().append([group(
            "http",
            vec![string("method", "GET"), group("empty", Vec::new())],
        )]);
        emit(&logger, &ctx, &[]);
        assert_eq!(
            recorder.records(),
            vec![vec![pair("http", serde_json::json!({"method": "GET"}))]]
        );
    }

    #[test]
    fn log_impl_applies_bound_attrs() {
        let recorder = Recorder::default();
        let logger = ContextLogger::new(recorder.clone()).with_attrs([string("svc", "api")]);
        log::Log::log(
            &logger,
            &log::Record::builder()
                .args(format_args!("plain"))
                .level(log::Level::Warn)
                .build(),
        );
        assert_eq!(recorder.records(), vec![vec![pair("svc", "api")]]);
    }
}
