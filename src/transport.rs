//! Line framing over a duplex byte stream.
//!
//! Every POP3 exchange is made of CRLF terminated lines. A reply starts with
//! a status line (`+OK ...` or `-ERR ...`); multi-line replies continue with
//! data lines until a line holding a single `.`.

use crate::errors::*;
use crate::utils;
use regex::Regex;
use std::io::{self, BufRead, BufReader, Read, Write};

const LF: u8 = 0x0a;
const CRLF: &str = "\r\n";
const TERMINATOR: &str = ".";

/// Reason attached to every failed read, so callers can recognise it.
pub const UNREADABLE_LINE: &str = "cannot read the line";

lazy_static! {
    static ref RESPONSE: Regex = Regex::new(r"^(?P<status>\+OK|-ERR)(?:\s(?P<statustext>.*))?$").unwrap();
}

fn peer_went_away(e: &io::Error) -> bool {
    match e.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => true,
        _ => false,
    }
}

pub struct Transport<S> {
    reader: Option<BufReader<S>>,
    eof: bool,
}

impl<S: Read + Write> Transport<S> {
    pub fn new(stream: S) -> Transport<S> {
        Transport {
            reader: Some(BufReader::new(stream)),
            eof: false,
        }
    }

    /// True once the peer has been seen closing the stream.
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    pub fn get_ref(&self) -> Option<&S> {
        self.reader.as_ref().map(|r| r.get_ref())
    }

    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.reader.as_mut().map(|r| r.get_mut())
    }

    /// Writes `line` followed by CRLF in one write and flushes.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        if self.eof {
            bail!(ErrorKind::EndOfStream);
        }
        let stream = match self.reader.as_mut() {
            Some(reader) => reader.get_mut(),
            None => bail!(ErrorKind::SessionClosed),
        };
        let framed = format!("{}{}", line, CRLF);
        let written = stream.write_all(framed.as_bytes()).and_then(|_| stream.flush());
        match written {
            Ok(()) => Ok(()),
            Err(ref e) if peer_went_away(e) => Err(self.hang_up()),
            Err(e) => Err(e).chain_err(|| ErrorKind::Transport("cannot write the line".to_string())),
        }
    }

    /// Reads one status line. Returns the text after `+OK`, or a `Response`
    /// error carrying the text after `-ERR`.
    pub fn read_response(&mut self) -> Result<String> {
        let line = self.read_line()?;
        info!("S: {}", line);
        let groups = match RESPONSE.captures(&line) {
            Some(groups) => groups,
            None => bail!(ErrorKind::Parse(line.clone(), "un-parseable status indicator".to_string())),
        };
        let text = groups.name("statustext").map_or("", |m| m.as_str()).to_string();
        match &groups["status"] {
            "+OK" => Ok(text),
            _ => bail!(ErrorKind::Response(text)),
        }
    }

    /// Reads data lines up to the terminator, un-stuffs them and joins them
    /// with CRLF. The terminator itself is not part of the body.
    ///
    /// Mail bodies are often 8-bit; bytes that are not UTF-8 are replaced
    /// with U+FFFD so the whole body is always consumed.
    pub fn read_multiline_body(&mut self) -> Result<String> {
        let mut lines = Vec::new();
        loop {
            let raw = self.read_raw_line()?;
            let line = String::from_utf8_lossy(&raw);
            let line = utils::strip_line_ending(&line);
            if line == TERMINATOR {
                break;
            }
            lines.push(utils::unstuff_line(line).to_string());
        }
        trace!("Read a body of {} lines", lines.len());
        Ok(lines.join(CRLF))
    }

    /// Reads listing lines up to the terminator, unaltered.
    ///
    /// A line that is not UTF-8 fails the listing, but only after the
    /// terminator has been read, so the next reply starts in the right place.
    pub fn read_lines(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut unreadable = None;
        loop {
            let raw = self.read_raw_line()?;
            match String::from_utf8(raw) {
                Ok(line) => {
                    let line = utils::strip_line_ending(&line);
                    if line == TERMINATOR {
                        break;
                    }
                    lines.push(line.to_string());
                }
                Err(e) => {
                    if unreadable.is_none() {
                        unreadable = Some(e);
                    }
                }
            }
        }
        match unreadable {
            Some(e) => Err(e).chain_err(|| ErrorKind::Transport(UNREADABLE_LINE.to_string())),
            None => Ok(lines),
        }
    }

    /// Releases the stream. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Transport closed");
        }
    }

    fn hang_up(&mut self) -> Error {
        if !self.eof {
            debug!("Server closed the connection");
            self.eof = true;
        }
        ErrorKind::EndOfStream.into()
    }

    fn read_line(&mut self) -> Result<String> {
        let buff = self.read_raw_line()?;
        let line = String::from_utf8(buff).chain_err(|| ErrorKind::Transport(UNREADABLE_LINE.to_string()))?;
        Ok(utils::strip_line_ending(&line).to_string())
    }

    /// One line as it came off the wire, line ending included.
    fn read_raw_line(&mut self) -> Result<Vec<u8>> {
        if self.eof {
            bail!(ErrorKind::EndOfStream);
        }
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => bail!(ErrorKind::SessionClosed),
        };
        let mut buff = Vec::new();
        match reader.read_until(LF, &mut buff) {
            Ok(0) => return Err(self.hang_up()),
            Ok(_) => {}
            Err(ref e) if peer_went_away(e) => return Err(self.hang_up()),
            Err(e) => return Err(e).chain_err(|| ErrorKind::Transport(UNREADABLE_LINE.to_string())),
        }
        Ok(buff)
    }
}
