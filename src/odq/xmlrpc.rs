//! XML-RPC wire codec.
//!
//! Requests are written as strings directly; responses are read into a small
//! element tree with `quick-xml` and then interpreted as a [`Value`].

use crate::error::{OdqError, Result};
use crate::value::Value;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;

/// Encode a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Encode a successful `methodResponse` document.
pub fn encode_response(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Encode a `fault` response.
pub fn encode_fault(code: i64, message: &str) -> String {
    let mut fault = BTreeMap::new();
    fault.insert("faultCode".to_string(), Value::Int(code));
    fault.insert("faultString".to_string(), Value::from(message));
    let mut out = String::from("<?xml version=\"1.0\"?><methodResponse><fault>");
    write_value(&mut out, &Value::Struct(fault));
    out.push_str("</fault></methodResponse>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        Value::Int(i) => {
            out.push_str("<int>");
            out.push_str(&i.to_string());
            out.push_str("</int>");
        }
        Value::Double(d) => {
            out.push_str("<double>");
            out.push_str(&d.to_string());
            out.push_str("</double>");
        }
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, item) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, item);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    fn expect_child(&self, name: &str) -> Result<&Element> {
        self.child(name).ok_or_else(|| {
            OdqError::MalformedXml(format!("<{}> is missing <{}>", self.name, name))
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

fn parse_tree(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element {
                name: tag_name(start.local_name().as_ref())?,
                children: Vec::new(),
            }),
            Event::Empty(start) => {
                let element = Element {
                    name: tag_name(start.local_name().as_ref())?,
                    children: Vec::new(),
                };
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| OdqError::MalformedXml("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(Node::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    let text = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|e| OdqError::MalformedXml(e.to_string()))?;
                    top.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(OdqError::MalformedXml("unexpected end of document".into()));
    }
    root.ok_or_else(|| OdqError::MalformedXml("empty document".into()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => *root = Some(element),
    }
}

fn tag_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| OdqError::MalformedXml(e.to_string()))
}

/// Decode a `methodResponse`, turning a `<fault>` into [`OdqError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(OdqError::MalformedXml(format!(
            "expected <methodResponse>, found <{}>",
            root.name
        )));
    }

    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.expect_child("value")?)?;
        return Err(fault_error(value));
    }

    let value = root
        .expect_child("params")?
        .expect_child("param")?
        .expect_child("value")?;
    decode_value(value)
}

fn fault_error(value: Value) -> OdqError {
    let members = value.into_struct().unwrap_or_default();
    let code = match members.get("faultCode") {
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "?".to_string(),
    };
    let message = members
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    OdqError::Fault { code, message }
}

fn decode_value(value: &Element) -> Result<Value> {
    let typed = match value.elements().next() {
        Some(typed) => typed,
        // A bare <value>text</value> is a string.
        None => return Ok(Value::String(value.text())),
    };

    match typed.name.as_str() {
        "int" | "i4" | "i8" => {
            let text = typed.text();
            text.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| OdqError::MalformedXml(format!("invalid int '{}'", text)))
        }
        "double" => {
            let text = typed.text();
            text.trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| OdqError::MalformedXml(format!("invalid double '{}'", text)))
        }
        "boolean" => match typed.text().trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(OdqError::MalformedXml(format!("invalid boolean '{}'", other))),
        },
        "string" => Ok(Value::String(typed.text())),
        "nil" => Ok(Value::Nil),
        "dateTime.iso8601" | "base64" => Ok(Value::String(typed.text().trim().to_string())),
        "array" => {
            let data = typed.expect_child("data")?;
            data.elements()
                .filter(|e| e.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in typed.elements().filter(|e| e.name == "member") {
                let name = member.expect_child("name")?.text();
                let item = decode_value(member.expect_child("value")?)?;
                members.insert(name, item);
            }
            Ok(Value::Struct(members))
        }
        other => Err(OdqError::MalformedXml(format!("unknown value type <{}>", other))),
    }
}
