//! Blocking XML-RPC client.
//!
//! The client owns the transport and glues the codec together: encode the
//! call, POST it as `text/xml`, decode the reply. Transport behavior is
//! configured explicitly through [`ClientConfig`] rather than through any
//! process-wide default, and non-HTTP schemes (e.g. SCGI) can be served by
//! registering a [`Transport`] for them.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use log::{debug, trace};

use crate::decoding::decode_response;
use crate::encoding::encode_call;
use crate::error::Error;
use crate::value::Value;

pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// One request/response round trip against a target endpoint.
///
/// Implementations post `body` with the given content type and hand back
/// the response body as a reader. The reader is dropped as soon as
/// decoding finishes, on every exit path, which is when the connection
/// resources must be released.
pub trait Transport {
    fn round_trip(
        &self,
        target: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Box<dyn Read>, TransportError>;
}

/// Transport configuration, passed explicitly to the client constructor.
pub struct ClientConfig {
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Ceiling on a whole request/response exchange. `None` means no
    /// limit.
    pub request_timeout: Option<Duration>,
    /// How long an idle pooled connection is kept around.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    transports: HashMap<String, Box<dyn Transport>>,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 100,
            transports: HashMap::new(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> ClientConfig {
        ClientConfig::default()
    }

    /// Registers a transport for an alternate URL scheme, e.g. `scgi`.
    /// `http` and `https` are always served by the built-in transport.
    pub fn register_transport(
        mut self,
        scheme: &str,
        transport: Box<dyn Transport>,
    ) -> ClientConfig {
        self.transports.insert(scheme.to_string(), transport);
        self
    }
}

/// Built-in HTTP(S) transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    fn new(config: &ClientConfig) -> Result<HttpTransport, Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("xmlrpc-client")
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn round_trip(
        &self,
        target: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Box<dyn Read>, TransportError> {
        let response = self
            .client
            .post(target)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_vec())
            .send()?
            .error_for_status()?;
        Ok(Box::new(response))
    }
}

/// Blocking XML-RPC client bound to one target endpoint.
pub struct Client {
    target: String,
    http: HttpTransport,
    transports: HashMap<String, Box<dyn Transport>>,
}

impl Client {
    /// Creates a client with the default configuration.
    pub fn new(target: &str) -> Result<Client, Error> {
        Client::with_config(target, ClientConfig::default())
    }

    pub fn with_config(target: &str, config: ClientConfig) -> Result<Client, Error> {
        let http = HttpTransport::new(&config)?;
        Ok(Client {
            target: target.to_string(),
            http,
            transports: config.transports,
        })
    }

    /// Calls the remote method and returns the decoded `params` values.
    ///
    /// A fault response surfaces as [`Error::Fault`]; structural decode
    /// failures surface as the corresponding [`Error`] variant. No
    /// retries, no pooling policy beyond the configured transport.
    pub fn call(&self, method: &str, params: &[Value]) -> Result<Vec<Value>, Error> {
        let body = encode_call(method, params)?;

        debug!("calling {:?} on {}", method, self.target);
        trace!("request body: {}", body);

        let transport = self.transport()?;
        let response = transport
            .round_trip(&self.target, "text/xml", body.as_bytes())
            .map_err(Error::Transport)?;

        // The response reader is consumed (and the connection released)
        // here whether decoding succeeds or not.
        decode_response(response)
    }

    fn transport(&self) -> Result<&dyn Transport, Error> {
        let scheme = match self.target.split_once("://") {
            Some((scheme, _)) => scheme,
            None => {
                return Err(Error::Transport(
                    format!("target {:?} has no scheme", self.target).into(),
                ))
            }
        };

        match scheme {
            "http" | "https" => Ok(&self.http),
            other => match self.transports.get(other) {
                Some(transport) => Ok(transport.as_ref()),
                None => Err(Error::Transport(
                    format!("no transport registered for scheme {:?}", other).into(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    // Serves a canned response and records what was sent.
    struct StubTransport {
        response: &'static str,
        seen_body: Rc<RefCell<String>>,
        seen_content_type: Rc<RefCell<String>>,
    }

    impl Transport for StubTransport {
        fn round_trip(
            &self,
            _target: &str,
            content_type: &str,
            body: &[u8],
        ) -> Result<Box<dyn Read>, TransportError> {
            *self.seen_body.borrow_mut() = String::from_utf8_lossy(body).into_owned();
            *self.seen_content_type.borrow_mut() = content_type.to_string();
            Ok(Box::new(Cursor::new(self.response.as_bytes().to_vec())))
        }
    }

    fn stub_client(response: &'static str) -> (Client, Rc<RefCell<String>>, Rc<RefCell<String>>) {
        let seen_body = Rc::new(RefCell::new(String::new()));
        let seen_content_type = Rc::new(RefCell::new(String::new()));
        let stub = StubTransport {
            response,
            seen_body: seen_body.clone(),
            seen_content_type: seen_content_type.clone(),
        };
        let config = ClientConfig::new().register_transport("stub", Box::new(stub));
        let client = Client::with_config("stub://server/RPC2", config).unwrap();
        (client, seen_body, seen_content_type)
    }

    #[test]
    fn test_call_roundtrip() {
        let (client, seen_body, seen_content_type) = stub_client(
            "<?xml version=\"1.0\"?><methodResponse><params>\
             <param><value><string>South Dakota</string></value></param>\
             </params></methodResponse>",
        );

        let values = client
            .call("examples.getStateName", &[Value::Int(41)])
            .unwrap();

        assert_eq!(values, vec![Value::String("South Dakota".to_string())]);
        assert_eq!(*seen_content_type.borrow(), "text/xml");

        let body = seen_body.borrow();
        assert!(body.contains("<methodName>examples.getStateName</methodName>"));
        assert!(body.contains("<value><int>41</int></value>"));
    }

    #[test]
    fn test_call_surfaces_fault() {
        let (client, _, _) = stub_client(
            "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
             <member><name>faultCode</name><value><int>4</int></value></member>\
             <member><name>faultString</name>\
             <value><string>Too many parameters.</string></value></member>\
             </struct></value></fault></methodResponse>",
        );

        match client.call("examples.getStateName", &[]) {
            Err(Error::Fault(fault)) => {
                assert_eq!(fault.code, 4);
                assert_eq!(fault.message, "Too many parameters.");
            }
            other => panic!("expected Fault, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        let client = Client::new("scgi://server:5000/").unwrap();
        assert!(matches!(
            client.call("anything", &[]),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn test_target_without_scheme_is_rejected() {
        let client = Client::new("server:5000").unwrap();
        assert!(matches!(
            client.call("anything", &[]),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(90));
        assert_eq!(config.pool_max_idle_per_host, 100);
    }
}
