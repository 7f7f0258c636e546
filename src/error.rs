use thiserror::Error;

/// A well-formed XML-RPC fault response.
///
/// A fault is a normal protocol outcome (the remote method refused the
/// call), as opposed to the structural variants of [`Error`] which mean
/// the response document itself could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("fault ({code}): {message}")]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

/// The errors that can arise while encoding a call or decoding a response.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying XML tokenizer rejected the document.
    #[error("malformed xml")]
    Syntax(#[from] xml::reader::Error),

    #[error("i/o error reading document")]
    Io(#[from] std::io::Error),

    #[error("missing <?xml ?> declaration")]
    MissingDeclaration,

    #[error("unexpected end of document")]
    UnexpectedEof,

    #[error("unexpected tag <{found}>, expected <{expected}>")]
    UnexpectedTag { expected: String, found: String },

    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown value type <{0}>")]
    UnknownValueType(String),

    #[error("duplicate struct member {0:?}")]
    DuplicateKey(String),

    #[error("incomplete struct member: {0}")]
    IncompleteMember(&'static str),

    #[error("malformed fault: {0}")]
    MalformedFault(&'static str),

    #[error("invalid integer literal {0:?}")]
    InvalidInt(String),

    #[error("invalid double literal {0:?}")]
    InvalidDouble(String),

    #[error("invalid boolean literal {0:?}, expected \"0\" or \"1\"")]
    InvalidBoolean(String),

    #[error("invalid base64 payload")]
    InvalidBase64(#[source] base64::DecodeError),

    #[error("invalid dateTime.iso8601 literal {0:?}")]
    InvalidDateTime(String),

    #[error("dateTime value outside the RFC 3339 representable range")]
    UnrepresentableDateTime,

    #[error("unexpected content after response envelope")]
    TrailingContent,

    /// The server answered with an XML-RPC fault rather than a result.
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
