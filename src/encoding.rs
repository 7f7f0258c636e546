//! Serialization of `methodCall` envelopes.
//!
//! The encoder covers the full [`Value`] union, so anything the decoder
//! can produce can also be sent back out. Output is indented two spaces
//! per nesting level, scalars kept on one line.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use xml::escape::escape_str_pcdata;

use crate::error::Error;
use crate::value::Value;

/// Serializes a method name and its arguments into a `methodCall`
/// document.
///
/// Fails only when a [`Value::DateTime`] argument cannot be represented
/// in RFC 3339 (year outside 0..=9999 or a sub-minute UTC offset).
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, Error> {
    let mut body = String::new();
    let mut encoder = Encoder::new(&mut body);
    if encoder.emit_call(method, params).is_err() {
        // Writing into a String cannot fail, so the only error source is
        // timestamp formatting.
        return Err(Error::UnrepresentableDateTime);
    }
    Ok(body)
}

/// A structure for implementing serialization to XML-RPC.
struct Encoder<'a> {
    writer: &'a mut dyn fmt::Write,
    depth: usize,
}

impl<'a> Encoder<'a> {
    fn new(writer: &'a mut dyn fmt::Write) -> Encoder<'a> {
        Encoder { writer, depth: 0 }
    }

    fn emit_call(&mut self, method: &str, params: &[Value]) -> fmt::Result {
        self.line("<?xml version=\"1.0\"?>")?;
        self.open("methodCall")?;
        self.line(&format!(
            "<methodName>{}</methodName>",
            escape_str_pcdata(method)
        ))?;
        self.open("params")?;
        for param in params {
            self.open("param")?;
            self.emit_value(param)?;
            self.close("param")?;
        }
        self.close("params")?;
        self.close("methodCall")
    }

    fn emit_value(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::Int(v) => self.scalar("int", &v.to_string()),
            Value::Double(v) => self.scalar("double", &v.to_string()),
            Value::String(v) => self.scalar("string", &escape_str_pcdata(v)),
            Value::Boolean(v) => self.scalar("boolean", if *v { "1" } else { "0" }),
            Value::Base64(bytes) => self.scalar("base64", &BASE64.encode(bytes)),
            Value::DateTime(dt) => {
                let text = dt.format(&Rfc3339).map_err(|_| fmt::Error)?;
                self.scalar("dateTime.iso8601", &text)
            }
            Value::Nil => self.line("<value><nil/></value>"),
            Value::Array(items) => {
                self.open("value")?;
                self.open("array")?;
                self.open("data")?;
                for item in items {
                    self.emit_value(item)?;
                }
                self.close("data")?;
                self.close("array")?;
                self.close("value")
            }
            Value::Struct(members) => {
                self.open("value")?;
                self.open("struct")?;
                for (name, member) in members {
                    self.open("member")?;
                    self.line(&format!("<name>{}</name>", escape_str_pcdata(name)))?;
                    self.emit_value(member)?;
                    self.close("member")?;
                }
                self.close("struct")?;
                self.close("value")
            }
        }
    }

    fn scalar(&mut self, tag: &str, text: &str) -> fmt::Result {
        self.line(&format!("<value><{tag}>{text}</{tag}></value>"))
    }

    fn line(&mut self, text: &str) -> fmt::Result {
        self.indent()?;
        self.writer.write_str(text)?;
        self.writer.write_char('\n')
    }

    fn open(&mut self, tag: &str) -> fmt::Result {
        self.indent()?;
        write!(self.writer, "<{}>", tag)?;
        self.writer.write_char('\n')?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self, tag: &str) -> fmt::Result {
        self.depth -= 1;
        self.indent()?;
        write!(self.writer, "</{}>", tag)?;
        self.writer.write_char('\n')
    }

    fn indent(&mut self) -> fmt::Result {
        for _ in 0..self.depth {
            self.writer.write_str("  ")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::decode_call;
    use crate::value::Struct;
    use time::macros::datetime;

    #[test]
    fn test_encode_get_state_name() {
        let expected = "<?xml version=\"1.0\"?>\n\
            <methodCall>\n\
            \x20\x20<methodName>examples.getStateName</methodName>\n\
            \x20\x20<params>\n\
            \x20\x20\x20\x20<param>\n\
            \x20\x20\x20\x20\x20\x20<value><int>41</int></value>\n\
            \x20\x20\x20\x20</param>\n\
            \x20\x20</params>\n\
            </methodCall>\n";

        let body = encode_call("examples.getStateName", &[Value::Int(41)]).unwrap();
        assert_eq!(body, expected);
    }

    #[test]
    fn test_encode_no_params() {
        let expected = "<?xml version=\"1.0\"?>\n\
            <methodCall>\n\
            \x20\x20<methodName>system.listMethods</methodName>\n\
            \x20\x20<params>\n\
            \x20\x20</params>\n\
            </methodCall>\n";

        assert_eq!(encode_call("system.listMethods", &[]).unwrap(), expected);
    }

    #[test]
    fn test_encode_escapes_text() {
        let body = encode_call("echo", &[Value::String("a < b & c".to_string())]).unwrap();
        assert!(body.contains("<value><string>a &lt; b &amp; c</string></value>"));
    }

    #[test]
    fn test_encode_array() {
        let body = encode_call(
            "sum",
            &[Value::Array(vec![Value::Int(1), Value::Int(2)])],
        )
        .unwrap();
        let expected = "\
            \x20\x20\x20\x20\x20\x20<value>\n\
            \x20\x20\x20\x20\x20\x20\x20\x20<array>\n\
            \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20<data>\n\
            \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20\x20\x20<value><int>1</int></value>\n\
            \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20\x20\x20<value><int>2</int></value>\n\
            \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20</data>\n\
            \x20\x20\x20\x20\x20\x20\x20\x20</array>\n\
            \x20\x20\x20\x20\x20\x20</value>\n";
        assert!(body.contains(expected));
    }

    #[test]
    fn test_encode_rejects_unrepresentable_datetime() {
        // RFC 3339 cannot express negative years.
        let dt = time::OffsetDateTime::UNIX_EPOCH.replace_year(-5).unwrap();
        match encode_call("echo", &[Value::DateTime(dt)]) {
            Err(Error::UnrepresentableDateTime) => {}
            other => panic!("expected UnrepresentableDateTime, got {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_full_union() {
        let mut members = Struct::new();
        members.insert("code".to_string(), Value::Int(200));
        members.insert(
            "tags".to_string(),
            Value::Array(vec![
                Value::String("a".to_string()),
                Value::String("b".to_string()),
            ]),
        );

        let params = vec![
            Value::Int(-3),
            Value::Double(2.5),
            Value::String("hello".to_string()),
            Value::Boolean(true),
            Value::Boolean(false),
            Value::Base64(b"raw bytes".to_vec()),
            Value::DateTime(datetime!(2004-06-12 09:30:00 UTC)),
            Value::Nil,
            Value::Struct(members),
        ];

        let body = encode_call("test.echo", &params).unwrap();
        let call = decode_call(body.as_bytes()).unwrap();

        assert_eq!(call.name, "test.echo");
        assert_eq!(call.params, params);
    }

    #[test]
    fn test_roundtrip_nested_array() {
        let params = vec![Value::Array(vec![
            Value::Array(vec![Value::Array(vec![Value::Int(1)]), Value::Int(2)]),
            Value::Int(3),
        ])];

        let body = encode_call("deep", &params).unwrap();
        let call = decode_call(body.as_bytes()).unwrap();
        assert_eq!(call.params, params);
    }
}
