//! Navigation primitives over a forward-only XML token stream.
//!
//! Everything higher up (value decoding, envelope decoding) is built only
//! from these operations; none of them know anything about XML-RPC. The
//! cursor wraps the `xml-rs` pull reader and normalizes its events down to
//! four kinds: document boundaries, start tags, end tags and character
//! data.

use std::io::{Chain, Cursor, Read};

use xml::reader::{EventReader, ParserConfig, XmlEvent};

use crate::error::Error;

/// A start or end tag, as returned by [`TokenReader::next_start_or_end`].
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Start(String),
    End(String),
}

/// Forward-only cursor over the lexical tokens of an XML document.
pub struct TokenReader<R: Read> {
    events: EventReader<R>,
}

impl<R: Read> TokenReader<R> {
    pub fn new(source: R) -> TokenReader<R> {
        let config = ParserConfig::new()
            .cdata_to_characters(true)
            .whitespace_to_characters(true)
            .ignore_comments(true);
        TokenReader {
            events: config.create_reader(source),
        }
    }

    /// Builds a cursor over a document that must begin with an
    /// `<?xml ...?>` declaration (after an optional BOM and leading
    /// whitespace).
    ///
    /// The tokenizer synthesizes a document-start event even when no
    /// declaration is present, so the raw byte prefix is checked before
    /// the stream is handed over; a declaration-less document is
    /// [`Error::MissingDeclaration`].
    pub fn with_declaration(
        mut source: R,
    ) -> Result<TokenReader<Chain<Cursor<Vec<u8>>, R>>, Error> {
        let mut prefix = Vec::with_capacity(16);

        loop {
            let mut byte = [0u8; 1];
            if source.read(&mut byte)? == 0 {
                return Err(Error::MissingDeclaration);
            }
            prefix.push(byte[0]);

            match declaration_state(&prefix) {
                DeclarationState::Undecided => {}
                DeclarationState::Declared => break,
                DeclarationState::Missing => return Err(Error::MissingDeclaration),
            }
        }

        // Replay the inspected prefix in front of the rest of the stream.
        Ok(TokenReader::new(Cursor::new(prefix).chain(source)))
    }

    fn next_event(&mut self) -> Result<XmlEvent, Error> {
        Ok(self.events.next()?)
    }

    /// Returns the name of the next start tag, skipping character data.
    ///
    /// With `expected` set, any other tag name is an
    /// [`Error::UnexpectedTag`].
    pub fn next_start(&mut self, expected: Option<&str>) -> Result<String, Error> {
        loop {
            match self.next_event()? {
                XmlEvent::StartElement { name, .. } => {
                    let found = name.local_name;
                    if let Some(want) = expected {
                        if want != found {
                            return Err(Error::UnexpectedTag {
                                expected: want.to_string(),
                                found,
                            });
                        }
                    }
                    return Ok(found);
                }
                XmlEvent::Characters(_) => {}
                XmlEvent::EndDocument => return Err(Error::UnexpectedEof),
                other => {
                    return Err(Error::UnexpectedToken {
                        expected: "start tag",
                        found: event_kind(&other),
                    })
                }
            }
        }
    }

    /// Mirror of [`TokenReader::next_start`] for end tags.
    pub fn next_end(&mut self, expected: Option<&str>) -> Result<String, Error> {
        loop {
            match self.next_event()? {
                XmlEvent::EndElement { name } => {
                    let found = name.local_name;
                    if let Some(want) = expected {
                        if want != found {
                            return Err(Error::UnexpectedTag {
                                expected: want.to_string(),
                                found,
                            });
                        }
                    }
                    return Ok(found);
                }
                XmlEvent::Characters(_) => {}
                XmlEvent::EndDocument => return Err(Error::UnexpectedEof),
                other => {
                    return Err(Error::UnexpectedToken {
                        expected: "end tag",
                        found: event_kind(&other),
                    })
                }
            }
        }
    }

    /// Returns the next character-data chunk.
    ///
    /// The reader hands out an owned `String`, so the chunk never aliases
    /// an internal tokenizer buffer.
    pub fn next_characters(&mut self) -> Result<String, Error> {
        match self.next_event()? {
            XmlEvent::Characters(text) => Ok(text),
            XmlEvent::EndDocument => Err(Error::UnexpectedEof),
            other => Err(Error::UnexpectedToken {
                expected: "character data",
                found: event_kind(&other),
            }),
        }
    }

    /// Returns whichever of a start or end tag comes first, skipping
    /// character data. Each side is validated against its expected name
    /// when one is given. This drives every zero-or-more-children loop.
    pub fn next_start_or_end(
        &mut self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Tag, Error> {
        loop {
            match self.next_event()? {
                XmlEvent::StartElement { name, .. } => {
                    let found = name.local_name;
                    if let Some(want) = start {
                        if want != found {
                            return Err(Error::UnexpectedTag {
                                expected: want.to_string(),
                                found,
                            });
                        }
                    }
                    return Ok(Tag::Start(found));
                }
                XmlEvent::EndElement { name } => {
                    let found = name.local_name;
                    if let Some(want) = end {
                        if want != found {
                            return Err(Error::UnexpectedTag {
                                expected: want.to_string(),
                                found,
                            });
                        }
                    }
                    return Ok(Tag::End(found));
                }
                XmlEvent::Characters(_) => {}
                XmlEvent::EndDocument => return Err(Error::UnexpectedEof),
                other => {
                    return Err(Error::UnexpectedToken {
                        expected: "start or end tag",
                        found: event_kind(&other),
                    })
                }
            }
        }
    }

    /// Consumes the document prologue (the `<?xml ...?>` declaration).
    /// The tokenizer rejects a malformed declaration on its own.
    pub fn next_document_start(&mut self) -> Result<(), Error> {
        match self.next_event()? {
            XmlEvent::StartDocument { .. } => Ok(()),
            other => Err(Error::UnexpectedToken {
                expected: "document prologue",
                found: event_kind(&other),
            }),
        }
    }

    /// Drains the remainder of the document. Only character data is
    /// tolerated before the end; any tag is [`Error::TrailingContent`].
    pub fn expect_document_end(&mut self) -> Result<(), Error> {
        loop {
            match self.next_event()? {
                XmlEvent::EndDocument => return Ok(()),
                XmlEvent::Characters(_) => {}
                _ => return Err(Error::TrailingContent),
            }
        }
    }
}

enum DeclarationState {
    Undecided,
    Declared,
    Missing,
}

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const DECLARATION: &[u8] = b"<?xml";

/// Decides from the bytes read so far whether the document opens with an
/// `<?xml` declaration, or whether more input is needed to tell.
fn declaration_state(prefix: &[u8]) -> DeclarationState {
    let mut rest = prefix;

    if rest.starts_with(&UTF8_BOM) {
        rest = &rest[UTF8_BOM.len()..];
    } else if UTF8_BOM.starts_with(rest) {
        return DeclarationState::Undecided;
    }

    while !rest.is_empty() && rest[0].is_ascii_whitespace() {
        rest = &rest[1..];
    }

    if rest.len() < DECLARATION.len() {
        if DECLARATION.starts_with(rest) {
            DeclarationState::Undecided
        } else {
            DeclarationState::Missing
        }
    } else if &rest[..DECLARATION.len()] == DECLARATION {
        DeclarationState::Declared
    } else {
        DeclarationState::Missing
    }
}

fn event_kind(event: &XmlEvent) -> &'static str {
    match event {
        XmlEvent::StartDocument { .. } => "document prologue",
        XmlEvent::EndDocument => "end of document",
        XmlEvent::ProcessingInstruction { .. } => "processing instruction",
        XmlEvent::StartElement { .. } => "start tag",
        XmlEvent::EndElement { .. } => "end tag",
        XmlEvent::CData(_) => "character data",
        XmlEvent::Comment(_) => "comment",
        XmlEvent::Characters(_) => "character data",
        XmlEvent::Whitespace(_) => "character data",
    }
}
