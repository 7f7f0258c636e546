//! Recursive-descent decoding of XML-RPC envelopes.
//!
//! The decoder walks the token cursor directly instead of building a
//! document tree first: each grammar production (`value`, `array`,
//! `struct`, `member`, `param`) is one routine, and nested content recurses
//! back through [`decode_value`]. Any structural surprise aborts the whole
//! decode; there is no recovery and no partial result.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{Error, Fault};
use crate::token::{Tag, TokenReader};
use crate::value::{MethodCall, Struct, Value};

/// Decodes a complete `methodResponse` document.
///
/// Returns the ordered `params` values, or [`Error::Fault`] if the
/// envelope carried a well-formed fault instead. Exactly one of the two is
/// produced, never both.
pub fn decode_response<R: Read>(source: R) -> Result<Vec<Value>, Error> {
    let mut tokens = TokenReader::with_declaration(source)?;

    tokens.next_document_start()?;
    tokens.next_start(Some("methodResponse"))?;

    let params = decode_method_response(&mut tokens)?;

    // Only trailing character data is tolerated past the envelope.
    tokens.expect_document_end()?;

    Ok(params)
}

/// Decodes a complete `methodCall` document.
///
/// The mirror of [`decode_response`]: it lets encoder output be verified
/// through the same token machinery and serves peer-side uses. A
/// `methodCall` without a `<params>` block is permitted.
pub fn decode_call<R: Read>(source: R) -> Result<MethodCall, Error> {
    let mut tokens = TokenReader::with_declaration(source)?;

    tokens.next_document_start()?;
    tokens.next_start(Some("methodCall"))?;

    tokens.next_start(Some("methodName"))?;
    let name = scalar_text(&mut tokens, "methodName")?;

    let mut params = Vec::new();
    match tokens.next_start_or_end(Some("params"), Some("methodCall"))? {
        Tag::Start(_) => {
            params = decode_params(&mut tokens)?;
            tokens.next_end(Some("methodCall"))?;
        }
        Tag::End(_) => {}
    }

    tokens.expect_document_end()?;

    Ok(MethodCall { name, params })
}

fn decode_method_response<R: Read>(tokens: &mut TokenReader<R>) -> Result<Vec<Value>, Error> {
    let tag = tokens.next_start(None)?;

    let params = match tag.as_str() {
        "params" => decode_params(tokens)?,
        "fault" => return Err(Error::Fault(decode_fault(tokens)?)),
        _ => {
            return Err(Error::UnexpectedTag {
                expected: "params or fault".to_string(),
                found: tag,
            })
        }
    };

    tokens.next_end(Some("methodResponse"))?;

    Ok(params)
}

fn decode_params<R: Read>(tokens: &mut TokenReader<R>) -> Result<Vec<Value>, Error> {
    let mut params = Vec::new();

    loop {
        match tokens.next_start_or_end(Some("param"), Some("params"))? {
            Tag::End(_) => return Ok(params),
            Tag::Start(_) => params.push(decode_param(tokens)?),
        }
    }
}

fn decode_param<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    tokens.next_start(Some("value"))?;
    let value = decode_value(tokens)?;
    tokens.next_end(Some("param"))?;
    Ok(value)
}

/// Decodes one value of unknown type, dispatching on the inner tag name.
///
/// The caller has already consumed the opening `<value>`; this routine
/// consumes everything up to and including the closing `</value>`.
pub fn decode_value<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let tag = tokens.next_start(None)?;

    let value = match tag.as_str() {
        "int" | "i4" => decode_int(tokens)?,
        "double" => decode_double(tokens)?,
        "string" => Value::String(scalar_text(tokens, "string")?),
        "boolean" => decode_boolean(tokens)?,
        "base64" => decode_base64(tokens)?,
        "dateTime.iso8601" => decode_date(tokens)?,
        "nil" => {
            // No character data: <nil/> closes immediately.
            tokens.next_end(Some("nil"))?;
            Value::Nil
        }
        "array" => decode_array(tokens)?,
        "struct" => decode_struct(tokens)?,
        _ => return Err(Error::UnknownValueType(tag)),
    };

    tokens.next_end(Some("value"))?;

    Ok(value)
}

/// Reads one character-data chunk followed by the named closing tag.
fn scalar_text<R: Read>(tokens: &mut TokenReader<R>, closing: &str) -> Result<String, Error> {
    let text = tokens.next_characters()?;
    tokens.next_end(Some(closing))?;
    Ok(text)
}

fn decode_int<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let text = tokens.next_characters()?;

    // Either spelling may close an integer.
    let end = tokens.next_end(None)?;
    if end != "int" && end != "i4" {
        return Err(Error::UnexpectedTag {
            expected: "int or i4".to_string(),
            found: end,
        });
    }

    match text.parse::<i32>() {
        Ok(v) => Ok(Value::Int(v)),
        Err(_) => Err(Error::InvalidInt(text)),
    }
}

fn decode_double<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let text = scalar_text(tokens, "double")?;
    match text.parse::<f64>() {
        Ok(v) => Ok(Value::Double(v)),
        Err(_) => Err(Error::InvalidDouble(text)),
    }
}

fn decode_boolean<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let text = scalar_text(tokens, "boolean")?;
    match text.as_str() {
        "0" => Ok(Value::Boolean(false)),
        "1" => Ok(Value::Boolean(true)),
        _ => Err(Error::InvalidBoolean(text)),
    }
}

fn decode_base64<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let text = scalar_text(tokens, "base64")?;
    match BASE64.decode(text.as_bytes()) {
        Ok(bytes) => Ok(Value::Base64(bytes)),
        Err(e) => Err(Error::InvalidBase64(e)),
    }
}

fn decode_date<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let text = scalar_text(tokens, "dateTime.iso8601")?;
    match OffsetDateTime::parse(&text, &Rfc3339) {
        Ok(dt) => Ok(Value::DateTime(dt)),
        Err(_) => Err(Error::InvalidDateTime(text)),
    }
}

fn decode_array<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    tokens.next_start(Some("data"))?;

    let mut items = Vec::new();
    loop {
        match tokens.next_start_or_end(Some("value"), Some("data"))? {
            Tag::End(_) => break,
            Tag::Start(_) => items.push(decode_value(tokens)?),
        }
    }

    tokens.next_end(Some("array"))?;

    Ok(Value::Array(items))
}

fn decode_struct<R: Read>(tokens: &mut TokenReader<R>) -> Result<Value, Error> {
    let mut members = Struct::new();

    loop {
        match tokens.next_start_or_end(Some("member"), Some("struct"))? {
            Tag::End(_) => return Ok(Value::Struct(members)),
            Tag::Start(_) => {
                let (name, value) = decode_member(tokens)?;
                if members.contains_key(&name) {
                    return Err(Error::DuplicateKey(name));
                }
                members.insert(name, value);
            }
        }
    }
}

/// Decodes one `<member>`: exactly one `<name>` and one `<value>`, in
/// either order.
fn decode_member<R: Read>(tokens: &mut TokenReader<R>) -> Result<(String, Value), Error> {
    let mut name = None;
    let mut value = None;

    loop {
        match tokens.next_start_or_end(None, Some("member"))? {
            Tag::End(_) => {
                return match (name, value) {
                    (Some(name), Some(value)) => Ok((name, value)),
                    (None, _) => Err(Error::IncompleteMember("missing name")),
                    (_, None) => Err(Error::IncompleteMember("missing value")),
                };
            }
            Tag::Start(tag) => match tag.as_str() {
                "name" => {
                    if name.is_some() {
                        return Err(Error::IncompleteMember("multiple name tags"));
                    }
                    name = Some(scalar_text(tokens, "name")?);
                }
                "value" => {
                    if value.is_some() {
                        return Err(Error::IncompleteMember("multiple value tags"));
                    }
                    value = Some(decode_value(tokens)?);
                }
                _ => {
                    return Err(Error::UnexpectedTag {
                        expected: "name or value".to_string(),
                        found: tag,
                    })
                }
            },
        }
    }
}

/// Decodes the payload of a `<fault>` element.
///
/// The struct must carry an integer `faultCode` and a string
/// `faultString`; anything else is a structural failure, not a fault
/// result.
fn decode_fault<R: Read>(tokens: &mut TokenReader<R>) -> Result<Fault, Error> {
    tokens.next_start(Some("value"))?;
    let value = decode_value(tokens)?;

    let members = match value {
        Value::Struct(members) => members,
        _ => return Err(Error::MalformedFault("fault payload is not a struct")),
    };

    let code = match members.get("faultCode") {
        Some(Value::Int(code)) => *code,
        Some(_) => return Err(Error::MalformedFault("faultCode is not an integer")),
        None => return Err(Error::MalformedFault("missing faultCode")),
    };

    let message = match members.get("faultString") {
        Some(Value::String(message)) => message.clone(),
        Some(_) => return Err(Error::MalformedFault("faultString is not a string")),
        None => return Err(Error::MalformedFault("missing faultString")),
    };

    tokens.next_end(Some("fault"))?;

    Ok(Fault { code, message })
}
