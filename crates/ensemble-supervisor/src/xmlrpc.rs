//! ---
//! ens_section: "05-external-interfaces"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Remote process supervisor client."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
//! XML-RPC document encoding and decoding.
//!
//! Only the subset of the format a supervisor emits is supported: scalar values,
//! structs, arrays, `nil`, and fault responses. The server-side helpers
//! ([`decode_call`], [`encode_response`], [`encode_fault`]) back in-process
//! supervisor doubles.

use std::fmt::Write;

use indexmap::IndexMap;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::SupervisorError;

/// Decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<int>`, `<i4>` or `<i8>`.
    Int(i64),
    /// `<boolean>`.
    Bool(bool),
    /// `<double>`.
    Double(f64),
    /// `<string>` or untyped text.
    String(String),
    /// `<dateTime.iso8601>`, kept verbatim.
    DateTime(String),
    /// `<base64>`, kept encoded.
    Base64(String),
    /// `<struct>` with members in document order.
    Struct(IndexMap<String, Value>),
    /// `<array>`.
    Array(Vec<Value>),
    /// `<nil/>`.
    Nil,
}

impl Value {
    /// Borrow the value as a string if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Struct members, if the value is a struct.
    pub fn as_struct(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Array items, if the value is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    pub fn member(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(name))
    }

    fn encode(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(v) => {
                let _ = write!(out, "<int>{v}</int>");
            }
            Value::Bool(v) => {
                let _ = write!(out, "<boolean>{}</boolean>", u8::from(*v));
            }
            Value::Double(v) => {
                let _ = write!(out, "<double>{v}</double>");
            }
            Value::String(v) => {
                let _ = write!(out, "<string>{}</string>", escape(v.as_str()));
            }
            Value::DateTime(v) => {
                let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", escape(v.as_str()));
            }
            Value::Base64(v) => {
                let _ = write!(out, "<base64>{}</base64>", escape(v.as_str()));
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                    value.encode(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.encode(out);
                }
                out.push_str("</data></array>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Encode a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        param.encode(&mut out);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Decode a `methodResponse` document into its single return value.
///
/// Fault responses are turned into [`SupervisorError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, SupervisorError> {
    let mut parser = Parser::new(xml);
    parser.expect_start("methodResponse")?;
    match parser.next_significant()? {
        Event::Start(tag) if tag.name().as_ref() == b"params" => {
            parser.expect_start("param")?;
            let value = parser.parse_value()?;
            parser.expect_end("param")?;
            parser.expect_end("params")?;
            parser.expect_end("methodResponse")?;
            Ok(value)
        }
        Event::Start(tag) if tag.name().as_ref() == b"fault" => {
            let value = parser.parse_value()?;
            let code = value
                .member("faultCode")
                .and_then(Value::as_i64)
                .ok_or_else(|| SupervisorError::protocol("fault without integer faultCode"))?;
            let message = value
                .member("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            Err(SupervisorError::Fault { code, message })
        }
        other => Err(unexpected("<params> or <fault>", &other)),
    }
}

/// Encode a successful `methodResponse` carrying `value`.
pub fn encode_response(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse><params><param>");
    value.encode(&mut out);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Encode a fault `methodResponse`.
pub fn encode_fault(code: i64, message: &str) -> String {
    let mut members = IndexMap::new();
    members.insert("faultCode".to_owned(), Value::Int(code));
    members.insert("faultString".to_owned(), Value::from(message));
    let mut out = String::from("<?xml version=\"1.0\"?>\n<methodResponse><fault>");
    Value::Struct(members).encode(&mut out);
    out.push_str("</fault></methodResponse>");
    out
}

/// Decode a `methodCall` document into its method name and parameters.
pub fn decode_call(xml: &str) -> Result<(String, Vec<Value>), SupervisorError> {
    let mut parser = Parser::new(xml);
    parser.expect_start("methodCall")?;
    parser.expect_start("methodName")?;
    let method = parser.read_text("methodName")?.trim().to_owned();
    let mut params = Vec::new();
    match parser.next_significant()? {
        Event::Empty(tag) if tag.name().as_ref() == b"params" => {}
        Event::Start(tag) if tag.name().as_ref() == b"params" => loop {
            match parser.next_significant()? {
                Event::Start(tag) if tag.name().as_ref() == b"param" => {
                    params.push(parser.parse_value()?);
                    parser.expect_end("param")?;
                }
                Event::End(tag) if tag.name().as_ref() == b"params" => break,
                other => return Err(unexpected("<param> or </params>", &other)),
            }
        },
        Event::End(tag) if tag.name().as_ref() == b"methodCall" => return Ok((method, params)),
        other => return Err(unexpected("<params>", &other)),
    }
    parser.expect_end("methodCall")?;
    Ok((method, params))
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
        }
    }

    fn next_raw(&mut self) -> Result<Event<'a>, SupervisorError> {
        self.reader
            .read_event()
            .map_err(|err| SupervisorError::protocol(err.to_string()))
    }

    /// Next event that carries structure: declarations, comments and
    /// whitespace-only text are skipped.
    fn next_significant(&mut self) -> Result<Event<'a>, SupervisorError> {
        loop {
            match self.next_raw()? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => continue,
                Event::Eof => return Err(SupervisorError::protocol("unexpected end of document")),
                event => return Ok(event),
            }
        }
    }

    fn expect_start(&mut self, name: &str) -> Result<(), SupervisorError> {
        match self.next_significant()? {
            Event::Start(tag) if tag.name().as_ref() == name.as_bytes() => Ok(()),
            other => Err(unexpected(&format!("<{name}>"), &other)),
        }
    }

    fn expect_end(&mut self, name: &str) -> Result<(), SupervisorError> {
        match self.next_significant()? {
            Event::End(tag) if tag.name().as_ref() == name.as_bytes() => Ok(()),
            other => Err(unexpected(&format!("</{name}>"), &other)),
        }
    }

    fn parse_value(&mut self) -> Result<Value, SupervisorError> {
        let event = self.next_significant()?;
        self.parse_value_from(event)
    }

    fn parse_value_from(&mut self, event: Event<'a>) -> Result<Value, SupervisorError> {
        match event {
            Event::Empty(tag) if tag.name().as_ref() == b"value" => Ok(Value::String(String::new())),
            Event::Start(tag) if tag.name().as_ref() == b"value" => self.parse_value_body(),
            other => Err(unexpected("<value>", &other)),
        }
    }

    /// Parses what follows `<value>` up to and including `</value>`.
    fn parse_value_body(&mut self) -> Result<Value, SupervisorError> {
        let mut text = String::new();
        loop {
            match self.next_raw()? {
                Event::Text(chunk) => {
                    let chunk = chunk
                        .unescape()
                        .map_err(|err| SupervisorError::protocol(err.to_string()))?;
                    text.push_str(&chunk);
                }
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::End(tag) if tag.name().as_ref() == b"value" => {
                    return Ok(Value::String(text));
                }
                Event::Start(tag) if text.trim().is_empty() => {
                    let value = self.parse_typed(&tag)?;
                    self.expect_end("value")?;
                    return Ok(value);
                }
                Event::Empty(tag) if text.trim().is_empty() => {
                    let value = empty_typed(&tag)?;
                    self.expect_end("value")?;
                    return Ok(value);
                }
                Event::Comment(_) => continue,
                other => return Err(unexpected("value content", &other)),
            }
        }
    }

    fn parse_typed(&mut self, tag: &BytesStart<'_>) -> Result<Value, SupervisorError> {
        let name = tag_name(tag);
        match name.as_str() {
            "string" => Ok(Value::String(self.read_text(&name)?)),
            "int" | "i4" | "i8" => {
                let raw = self.read_text(&name)?;
                raw.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| SupervisorError::protocol(format!("invalid integer '{raw}'")))
            }
            "boolean" => match self.read_text(&name)?.trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(SupervisorError::protocol(format!("invalid boolean '{other}'"))),
            },
            "double" => {
                let raw = self.read_text(&name)?;
                raw.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| SupervisorError::protocol(format!("invalid double '{raw}'")))
            }
            "dateTime.iso8601" => Ok(Value::DateTime(self.read_text(&name)?)),
            "base64" => Ok(Value::Base64(self.read_text(&name)?.trim().to_owned())),
            "nil" => {
                self.expect_end("nil")?;
                Ok(Value::Nil)
            }
            "struct" => self.parse_struct(),
            "array" => self.parse_array(),
            other => Err(SupervisorError::protocol(format!("unsupported value type <{other}>"))),
        }
    }

    fn parse_struct(&mut self) -> Result<Value, SupervisorError> {
        let mut members = IndexMap::new();
        loop {
            match self.next_significant()? {
                Event::Start(tag) if tag.name().as_ref() == b"member" => {
                    self.expect_start("name")?;
                    let name = self.read_text("name")?;
                    let value = self.parse_value()?;
                    self.expect_end("member")?;
                    members.insert(name, value);
                }
                Event::End(tag) if tag.name().as_ref() == b"struct" => {
                    return Ok(Value::Struct(members));
                }
                other => return Err(unexpected("<member> or </struct>", &other)),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, SupervisorError> {
        let mut items = Vec::new();
        match self.next_significant()? {
            Event::Empty(tag) if tag.name().as_ref() == b"data" => {}
            Event::Start(tag) if tag.name().as_ref() == b"data" => loop {
                match self.next_significant()? {
                    Event::End(tag) if tag.name().as_ref() == b"data" => break,
                    event => items.push(self.parse_value_from(event)?),
                }
            },
            other => return Err(unexpected("<data>", &other)),
        }
        self.expect_end("array")?;
        Ok(Value::Array(items))
    }

    fn read_text(&mut self, closing: &str) -> Result<String, SupervisorError> {
        let mut text = String::new();
        loop {
            match self.next_raw()? {
                Event::Text(chunk) => {
                    let chunk = chunk
                        .unescape()
                        .map_err(|err| SupervisorError::protocol(err.to_string()))?;
                    text.push_str(&chunk);
                }
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::End(tag) if tag.name().as_ref() == closing.as_bytes() => return Ok(text),
                Event::Comment(_) => continue,
                other => return Err(unexpected(&format!("text of <{closing}>"), &other)),
            }
        }
    }
}

fn empty_typed(tag: &BytesStart<'_>) -> Result<Value, SupervisorError> {
    match tag_name(tag).as_str() {
        "nil" => Ok(Value::Nil),
        "string" => Ok(Value::String(String::new())),
        "struct" => Ok(Value::Struct(IndexMap::new())),
        "array" => Ok(Value::Array(Vec::new())),
        other => Err(SupervisorError::protocol(format!("empty <{other}/> has no value"))),
    }
}

fn tag_name(tag: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(tag.name().as_ref()).into_owned()
}

fn unexpected(expected: &str, found: &Event<'_>) -> SupervisorError {
    let found = match found {
        Event::Start(tag) => format!("<{}>", tag_name(tag)),
        Event::Empty(tag) => format!("<{}/>", tag_name(tag)),
        Event::End(tag) => format!("</{}>", String::from_utf8_lossy(tag.name().as_ref())),
        Event::Text(_) => "text".to_owned(),
        Event::Eof => "end of document".to_owned(),
        other => format!("{other:?}"),
    };
    SupervisorError::protocol(format!("expected {expected}, found {found}"))
}
