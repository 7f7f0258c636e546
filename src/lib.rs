//! XML-RPC client library: serialization of `methodCall` requests and
//! streaming, token-driven decoding of `methodResponse` replies.
//!
//! # What is XML-RPC?
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! # Example
//!
//! ```no_run
//! use xmlrpc_client::{Client, Value};
//!
//! # fn main() -> Result<(), xmlrpc_client::Error> {
//! let client = Client::new("https://rpc.example.net/RPC2")?;
//! let values = client.call("examples.getStateName", &[Value::Int(41)])?;
//! println!("{:?}", values);
//! # Ok(())
//! # }
//! ```

#![forbid(non_camel_case_types)]

pub mod client;
pub mod decoding;
pub mod encoding;
pub mod error;
pub mod token;
pub mod value;

pub use client::{Client, ClientConfig, HttpTransport, Transport, TransportError};
pub use decoding::{decode_call, decode_response};
pub use encoding::encode_call;
pub use error::{Error, Fault};
pub use value::{Array, MethodCall, Struct, Value};
