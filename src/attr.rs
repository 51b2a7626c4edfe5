//! Typed key/value attributes attached to log records.
//!
//! Attributes are built with the small constructor functions in this module
//! (`string`, `int64`, `group`, ...) or with [`Attr::new`] and any type that
//! converts into a [`Value`].

use chrono::{DateTime, Local};
use log::kv::{self, ToValue};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::{borrow::Cow, fmt, path::Path, sync::Arc, time::Duration};

/// Key of the record timestamp handed to the normalization hook
pub const TIME_KEY: &str = "time";
/// Key of the record level handed to the normalization hook
pub const LEVEL_KEY: &str = "level";
/// Key of the record source location handed to the normalization hook
pub const SOURCE_KEY: &str = "source";
/// Key of the record message handed to the normalization hook
pub const MESSAGE_KEY: &str = "msg";
/// Key used by [`err_attr`]
pub const ERROR_KEY: &str = "error";

// a LogValue resolving to another LogValue more often than this is cut short
const MAX_RESOLVE: usize = 100;

/// A single key/value pair
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Attr {
    pub fn new(
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A value that renders itself lazily, at emission time.
///
/// Useful for values that are expensive to compute or that should hide
/// part of their contents (secrets, large payloads).
pub trait LogValue: Send + Sync {
    fn log_value(&self) -> Value;
}

/// The closed set of attribute value kinds.
///
/// `Time` and `Source` are what the built-in record fields carry when they
/// pass through the normalization hook.
#[derive(Clone)]
pub enum Value {
    String(Cow<'static, str>),
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Duration(Duration),
    Group(Vec<Attr>),
    Any(Arc<dyn LogValue>),
    Time(DateTime<Local>),
    Source(Source),
}

impl Value {
    /// Follows `Any` values until a concrete kind is reached
    pub fn resolve(self) -> Value {
        let mut value = self;
        for _ in 0..MAX_RESOLVE {
            match value {
                Value::Any(inner) => value = inner.log_value(),
                resolved => return resolved,
            }
        }
        Value::String("!ERROR:LogValue resolution exceeded limit".into())
    }
}

impl fmt::Debug for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int64(n) => f.debug_tuple("Int64").field(n).finish(),
            Value::Uint64(n) => f.debug_tuple("Uint64").field(n).finish(),
            Value::Float64(n) => f.debug_tuple("Float64").field(n).finish(),
            Value::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Value::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            Value::Any(_) => f.write_str("Any(..)"),
            Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Value::Source(s) => f.debug_tuple("Source").field(s).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Group(a), Value::Group(b)) => a == b,
            (Value::Any(a), Value::Any(b)) => Arc::ptr_eq(a, b),
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Source(a), Value::Source(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Uint64(n) => write!(f, "{}", n),
            Value::Float64(n) => write!(f, "{}", n),
            Value::Duration(d) => write!(f, "{:?}", d),
            Value::Group(attrs) => {
                f.write_str("[")?;
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", attr)?;
                }
                f.write_str("]")
            }
            Value::Any(inner) => write!(f, "{}", inner.log_value().resolve()),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Source(s) => write!(f, "{}", s),
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> kv::Value<'_> {
        match self {
            Value::String(s) => ToValue::to_value(&**s),
            Value::Bool(b) => b.to_value(),
            Value::Int64(n) => n.to_value(),
            Value::Uint64(n) => n.to_value(),
            Value::Float64(n) => n.to_value(),
            Value::Duration(d) => kv::Value::from_debug(d),
            Value::Group(_) | Value::Source(_) => kv::Value::from_serde(self),
            other => kv::Value::from_display(other),
        }
    }
}

/// Groups serialize as nested maps and sources as
/// `{"function", "file", "line"}` objects
impl Serialize for Value {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int64(n) => serializer.serialize_i64(*n),
            Value::Uint64(n) => serializer.serialize_u64(*n),
            Value::Float64(n) => serializer.serialize_f64(*n),
            Value::Duration(_) | Value::Time(_) => serializer.collect_str(self),
            Value::Group(attrs) => {
                let mut map = serializer.serialize_map(Some(attrs.len()))?;
                for attr in attrs {
                    map.serialize_entry(&*attr.key, &attr.value)?;
                }
                map.end()
            }
            Value::Any(_) => self.clone().resolve().serialize(serializer),
            Value::Source(source) => source.serialize(serializer),
        }
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::String(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Cow::Owned(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int64(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<Duration> for Value {
    fn from(value: Duration) -> Self {
        Value::Duration(value)
    }
}

impl From<Vec<Attr>> for Value {
    fn from(value: Vec<Attr>) -> Self {
        Value::Group(value)
    }
}

/// Where a record was emitted from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub function: Option<String>,
    pub file: String,
    pub line: u32,
}

impl Source {
    pub(crate) fn from_record(record: &log::Record<'_>) -> Option<Self> {
        record.file().map(|file| Source {
            function: record.module_path().map(str::to_owned),
            file: file.to_owned(),
            line: record.line().unwrap_or_default(),
        })
    }

    /// Reduces the file to its base name and the function to its last
    /// path segment
    pub fn trimmed(self) -> Self {
        let file = Path::new(&self.file)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(self.file);
        Source {
            function: self.function.map(|f| bare_function(&f).to_owned()),
            file,
            line: self.line,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl Serialize for Source {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(function) = &self.function {
            map.serialize_entry("function", function)?;
        }
        map.serialize_entry("file", &self.file)?;
        map.serialize_entry("line", &self.line)?;
        map.end()
    }
}

/// Derives a module path from a source file path, the way rustc lays modules
/// out on disk: `src/handlers/login.rs` is `handlers::login`.
///
/// Crate roots (`lib.rs`, `main.rs`) and `mod.rs` files name their parent
/// directory. Yields `None` for a crate root.
pub(crate) fn module_from_file(file: &str) -> Option<String> {
    let file = file.replace('\\', "/");
    let path = file.strip_suffix(".rs").unwrap_or(file.as_str());
    let path = path.rsplit_once("src/").map_or(path, |(_, rest)| rest);
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(&"lib" | &"main" | &"mod") = segments.last() {
        segments.pop();
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("::"))
    }
}

fn bare_function(path: &str) -> &str {
    let last = path.rsplit("::").next().unwrap_or(path);
    let last = last.rsplit('/').next().unwrap_or(last);
    last.rsplit('.').next().unwrap_or(last)
}

pub fn string(
    key: impl Into<Cow<'static, str>>,
    value: impl Into<Cow<'static, str>>,
) -> Attr {
    Attr::new(key, Value::String(value.into()))
}

pub fn bool(
    key: impl Into<Cow<'static, str>>,
    value: bool,
) -> Attr {
    Attr::new(key, Value::Bool(value))
}

pub fn int(
    key: impl Into<Cow<'static, str>>,
    value: isize,
) -> Attr {
    Attr::new(key, Value::Int64(value as i64))
}

pub fn int64(
    key: impl Into<Cow<'static, str>>,
    value: i64,
) -> Attr {
    Attr::new(key, Value::Int64(value))
}

pub fn uint64(
    key: impl Into<Cow<'static, str>>,
    value: u64,
) -> Attr {
    Attr::new(key, Value::Uint64(value))
}

pub fn float64(
    key: impl Into<Cow<'static, str>>,
    value: f64,
) -> Attr {
    Attr::new(key, Value::Float64(value))
}

pub fn duration(
    key: impl Into<Cow<'static, str>>,
    value: Duration,
) -> Attr {
    Attr::new(key, Value::Duration(value))
}

/// Nests `attrs` under `key`. Text output renders members as `key.member`,
/// JSON output as a nested object
pub fn group(
    key: impl Into<Cow<'static, str>>,
    attrs: Vec<Attr>,
) -> Attr {
    Attr::new(key, Value::Group(attrs))
}

pub fn any<V>(
    key: impl Into<Cow<'static, str>>,
    value: V,
) -> Attr
where
    V: LogValue + 'static,
{
    Attr::new(key, Value::Any(Arc::new(value)))
}

/// Renders an error as an attribute keyed `error`
///
/// ```
/// use ctx_env_logger::{builder, err_attr};
///
/// let logger = builder().set_default(false).build().unwrap();
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// logger.error("user msg error", &[err_attr(&err)]);
/// ```
pub fn err_attr<E>(err: &E) -> Attr
where
    E: fmt::Display + ?Sized,
{
    string(ERROR_KEY, err.to_string())
}

/// Attributes cleaned up for rendering.
///
/// `Any` values are resolved, attributes without a key are skipped and
/// empty groups dropped. A keyless group inlines its members.
#[derive(Debug, Default)]
pub(crate) struct Fields(Vec<Attr>);

impl Fields {
    pub(crate) fn extend(
        &mut self,
        attrs: &[Attr],
    ) {
        self.0.extend(clean(attrs));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn clean(attrs: &[Attr]) -> Vec<Attr> {
    let mut cleaned = Vec::with_capacity(attrs.len());
    for attr in attrs {
        match attr.value.clone().resolve() {
            Value::Group(members) => {
                let members = clean(&members);
                if members.is_empty() {
                    continue;
                }
                if attr.key.is_empty() {
                    cleaned.extend(members);
                } else {
                    cleaned.push(Attr::new(attr.key.clone(), Value::Group(members)));
                }
            }
            _ if attr.key.is_empty() => {}
            value => cleaned.push(Attr::new(attr.key.clone(), value)),
        }
    }
    cleaned
}

impl kv::Source for Fields {
    fn visit<'kvs>(
        &'kvs self,
        visitor: &mut dyn kv::VisitSource<'kvs>,
    ) -> Result<(), kv::Error> {
        for attr in &self.0 {
            visitor.visit_pair(kv::Key::from_str(&attr.key), attr.value.to_value())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Secret;

    impl LogValue for Secret {
        fn log_value(&self) -> Value {
            "REDACTED".into()
        }
    }

    fn pairs(fields: &Fields) -> Vec<(String, String)> {
        fields
            .0
            .iter()
            .map(|attr| (attr.key.to_string(), attr.value.to_string()))
            .collect()
    }

    #[test]
    fn groups_keep_their_members() {
        let mut fields = Fields::default();
        fields.extend(&[
            string("method", "GET"),
            group(
                "req",
                vec![
                    int64("size", 12),
                    group("user", vec![string("id", "7")]),
                    group("empty", Vec::new()),
                ],
            ),
        ]);
        assert_eq!(
            fields.0,
            vec![
                string("method", "GET"),
                group(
                    "req",
                    vec![int64("size", 12), group("user", vec![string("id", "7")])]
                ),
            ]
        );
    }

    #[test]
    fn groups_serialize_as_nested_maps() -> Result<(), Box<dyn std::error::Error>> {
        let value = group(
            "req",
            vec![string("method", "GET"), group("user", vec![int64("id", 7)])],
        )
        .value;
        assert_eq!(
            serde_json::to_string(&value)?,
            r#"{"method":"GET","user":{"id":7}}"#
        );
        Ok(())
    }

    #[test]
    fn empty_groups_and_keys_are_skipped() {
        let mut fields = Fields::default();
        fields.extend(&[
            group("nothing", Vec::new()),
            string("", "orphan"),
            group("", vec![bool("inlined", true)]),
        ]);
        assert_eq!(pairs(&fields), vec![("inlined".to_owned(), "true".to_owned())]);
    }

    #[test]
    fn log_values_resolve_at_flatten_time() {
        let mut fields = Fields::default();
        fields.extend(&[any("password", Secret)]);
        assert_eq!(
            pairs(&fields),
            vec![("password".to_owned(), "REDACTED".to_owned())]
        );
    }

    #[test]
    fn err_attr_uses_error_key() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such user");
        assert_eq!(err_attr(&err), string("error", "no such user"));
    }

    #[test]
    fn durations_render_humanized() {
        assert_eq!(
            duration("took", Duration::from_millis(1500)).to_string(),
            "took=1.5s"
        );
    }

    #[test]
    fn source_trims_file_and_function() {
        let source = Source {
            function: Some("app::handlers::login".to_owned()),
            file: "/home/app/src/handlers/login.rs".to_owned(),
            line: 42,
        }
        .trimmed();
        assert_eq!(source.file, "login.rs");
        assert_eq!(source.function.as_deref(), Some("login"));
        assert_eq!(source.to_string(), "login.rs:42");
        assert_eq!(bare_function("github.com/acme/pkg.Handler"), "Handler");
    }

    #[test]
    fn module_path_follows_file_layout() {
        assert_eq!(
            module_from_file("src/handlers/login.rs").as_deref(),
            Some("handlers::login")
        );
        assert_eq!(
            module_from_file("/home/app/src/db/mod.rs").as_deref(),
            Some("db")
        );
        assert_eq!(module_from_file("src/main.rs"), None);
        assert_eq!(
            module_from_file("tests/smoke.rs").as_deref(),
            Some("tests::smoke")
        );
    }
}
