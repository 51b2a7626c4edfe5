//! Record encoding for the `env_logger` base emitter.
//!
//! Every record starts with the built-in fields `time`, `level`, `source`
//! (when enabled) and `msg`. Each one passes through the normalization hook
//! before it is written, followed by the record's key/values.

use crate::attr::{Attr, Source, Value, LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY};
use chrono::Local;
use log::kv;
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Layout timestamps are rewritten to
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static REMOVE_TIME: AtomicBool = AtomicBool::new(false);

/// Hook applied to the built-in fields of every record. Returning `None`
/// drops the field.
pub type ReplaceAttr = Arc<dyn Fn(Attr) -> Option<Attr> + Send + Sync>;

/// Process wide switch dropping the timestamp from every record emitted
/// while it is on
pub fn set_remove_time(remove: bool) {
    REMOVE_TIME.store(remove, Ordering::Relaxed);
}

pub fn remove_time() -> bool {
    REMOVE_TIME.load(Ordering::Relaxed)
}

/// The default normalization hook
///
/// * timestamps are formatted as `YYYY-MM-DD HH:MM:SS.mmm`
/// * source locations keep only the file's base name and bare function name
/// * an empty message is dropped
pub fn normalize(attr: Attr) -> Option<Attr> {
    let Attr { key, value } = attr;
    let value = match (&*key, value) {
        (TIME_KEY, Value::Time(time)) => {
            Value::String(time.format(TIME_FORMAT).to_string().into())
        }
        (SOURCE_KEY, Value::Source(source)) => Value::Source(source.trimmed()),
        (MESSAGE_KEY, Value::String(msg)) if msg.is_empty() => return None,
        (_, value) => value,
    };
    Some(Attr { key, value })
}

#[derive(Clone)]
pub(crate) struct Encoder {
    pub(crate) json: bool,
    pub(crate) add_source: bool,
    pub(crate) remove_time: bool,
    pub(crate) replace: Option<ReplaceAttr>,
}

impl Encoder {
    pub(crate) fn format<W: Write>(
        &self,
        writer: &mut W,
        record: &log::Record<'_>,
    ) -> io::Result<()> {
        let mut builtins = vec![
            Attr::new(TIME_KEY, Value::Time(Local::now())),
            Attr::new(LEVEL_KEY, record.level().as_str()),
        ];
        if self.add_source {
            if let Some(source) = Source::from_record(record) {
                builtins.push(Attr::new(SOURCE_KEY, Value::Source(source)));
            }
        }
        builtins.push(Attr::new(MESSAGE_KEY, record.args().to_string()));
        let fields: Vec<Attr> = builtins
            .into_iter()
            .filter_map(|attr| self.replace(attr))
            .collect();

        if self.json {
            write_json(writer, &fields, record.key_values())
        } else {
            write_text(writer, &fields, record.key_values())
        }
    }

    fn replace(
        &self,
        attr: Attr,
    ) -> Option<Attr> {
        if attr.key == TIME_KEY && (self.remove_time || remove_time()) {
            return None;
        }
        match &self.replace {
            Some(replace) => replace(attr),
            None => normalize(attr),
        }
    }
}

fn visit_error(err: kv::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

fn write_text<W: Write>(
    writer: &mut W,
    fields: &[Attr],
    kvs: &dyn kv::Source,
) -> io::Result<()> {
    let mut visitor = TextVisitor {
        writer,
        first: true,
    };
    for attr in fields {
        visitor.pair(&attr.key, &attr.value.to_string())?;
    }
    kvs.visit(&mut visitor).map_err(visit_error)?;
    writeln!(visitor.writer)
}

struct TextVisitor<'a, W: Write> {
    writer: &'a mut W,
    first: bool,
}

impl<W: Write> TextVisitor<'_, W> {
    fn pair(
        &mut self,
        key: &str,
        value: &str,
    ) -> io::Result<()> {
        if !self.first {
            write!(self.writer, " ")?;
        }
        self.first = false;
        write!(self.writer, "{}=", key)?;
        if needs_quoting(value) {
            serde_json::to_writer(&mut *self.writer, value)?;
            Ok(())
        } else {
            write!(self.writer, "{}", value)
        }
    }

    // nested objects (groups) become dotted keys
    fn flatten(
        &mut self,
        key: &str,
        value: &serde_json::Value,
    ) -> io::Result<()> {
        match value {
            serde_json::Value::Object(members) => {
                for (member, value) in members {
                    self.flatten(&format!("{}.{}", key, member), value)?;
                }
                Ok(())
            }
            serde_json::Value::String(s) => self.pair(key, s),
            other => self.pair(key, &other.to_string()),
        }
    }
}

impl<'kvs, W: Write> kv::VisitSource<'kvs> for TextVisitor<'_, W> {
    fn visit_pair(
        &mut self,
        key: kv::Key<'kvs>,
        value: kv::Value<'kvs>,
    ) -> Result<(), kv::Error> {
        let value = serde_json::to_value(&value).map_err(kv::Error::boxed)?;
        self.flatten(key.as_str(), &value)
            .map_err(kv::Error::boxed)
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '"' || c == '=')
}

fn write_json<W: Write>(
    writer: &mut W,
    fields: &[Attr],
    kvs: &dyn kv::Source,
) -> io::Result<()> {
    write!(writer, "{{")?;
    let mut visitor = JsonVisitor {
        writer,
        first: true,
    };
    for attr in fields {
        visitor.key(&attr.key)?;
        serde_json::to_writer(&mut *visitor.writer, &attr.value)?;
    }
    kvs.visit(&mut visitor).map_err(visit_error)?;
    writeln!(visitor.writer, "}}")
}

struct JsonVisitor<'a, W: Write> {
    writer: &'a mut W,
    first: bool,
}

impl<W: Write> JsonVisitor<'_, W> {
    fn key(
        &mut self,
        key: &str,
    ) -> io::Result<()> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;
        write_json_str(self.writer, key)?;
        write!(self.writer, ":")
    }
}

impl<'kvs, W: Write> kv::VisitSource<'kvs> for JsonVisitor<'_, W> {
    fn visit_pair(
        &mut self,
        key: kv::Key<'kvs>,
        value: kv::Value<'kvs>,
    ) -> Result<(), kv::Error> {
        self.key(key.as_str()).map_err(kv::Error::boxed)?;
        serde_json::to_writer(&mut *self.writer, &value).map_err(kv::Error::boxed)
    }
}

fn write_json_str<W: io::Write>(
    writer: &mut W,
    raw: &str,
) -> std::io::Result<()> {
    serde_json::to_writer(writer, raw)?;
    Ok(())
}
