//! One method per POP3 verb.
//!
//! A `Client` owns its stream for the whole session. Methods take
//! `&mut self`, so commands on one session are strictly one at a time.
//! Once the session reaches [`Pop3State::End`] it cannot be revived; dial a
//! new one instead.

use crate::errors::*;
use crate::pop3result::{MessageInfo, POP3Stat};
use crate::transport::Transport;
use std::fmt;
use std::io::{Read, Write};

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Pop3State {
    Authorization,
    Transaction,
    // UPDATE is entered by the server after QUIT; nothing left for a client to do there
    End,
}

impl fmt::Display for Pop3State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct Client<S> {
    transport: Transport<S>,
    state: Pop3State,
}

impl<S: Read + Write> Client<S> {
    /// Wraps an already established stream and reads the server greeting.
    ///
    /// A greeting that cannot be read at all is reported as
    /// `CannotReachHost`; a `-ERR` greeting is passed through as is.
    pub fn connect(stream: S) -> Result<Client<S>> {
        trace!("Reading Greeting from Server");
        let mut transport = Transport::new(stream);
        if let Err(e) = transport.read_response() {
            let unreadable = match *e.kind() {
                ErrorKind::Transport(_) | ErrorKind::EndOfStream => true,
                _ => false,
            };
            if unreadable {
                return Err(e).chain_err(|| ErrorKind::CannotReachHost);
            }
            return Err(e);
        }
        let client = Client {
            transport,
            state: Pop3State::Authorization,
        };
        debug!("POP3State::{:?}", client.state);
        Ok(client)
    }

    pub fn state(&self) -> Pop3State {
        self.state
    }

    /// The underlying stream, e.g. to set deadlines. `None` once closed.
    pub fn get_ref(&self) -> Option<&S> {
        self.transport.get_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut S> {
        self.transport.get_mut()
    }

    pub fn user(&mut self, user: &str) -> Result<()> {
        self.require("USER", &[Pop3State::Authorization])?;
        trace!("Cmd: USER");
        self.cmd_simple("USER", Some(user))
    }

    pub fn pass(&mut self, pass: &str) -> Result<()> {
        self.require("PASS", &[Pop3State::Authorization])?;
        trace!("Cmd: PASS");
        self.cmd_simple("PASS", Some(pass))?;
        self.state = Pop3State::Transaction;
        debug!("POP3State::{:?}", self.state);
        Ok(())
    }

    /// USER followed by PASS. Either rejection is returned as a `Response`
    /// error with the server's text.
    pub fn authenticate(&mut self, user: &str, pass: &str) -> Result<()> {
        trace!("Attempting to Login");
        self.user(user)?;
        self.pass(pass)
    }

    pub fn stat(&mut self) -> Result<POP3Stat> {
        self.require("STAT", &[Pop3State::Transaction])?;
        trace!("Cmd: STAT");
        let msg = self.send_command("STAT", None)?;
        POP3Stat::parse(&msg)
    }

    /// LIST for a single message: its number and size.
    pub fn list(&mut self, number: u32) -> Result<MessageInfo> {
        self.require("LIST", &[Pop3State::Transaction])?;
        trace!("Cmd: LIST {}", number);
        let msg = self.send_command("LIST", Some(&number.to_string()))?;
        MessageInfo::parse_scan(&msg)
    }

    /// LIST for the whole maildrop, in server order.
    pub fn list_all(&mut self) -> Result<Vec<MessageInfo>> {
        self.require("LIST", &[Pop3State::Transaction])?;
        trace!("Cmd: LIST");
        let lines = self.cmd_read_lines("LIST")?;
        MessageInfo::parse_all(&lines, MessageInfo::parse_scan)
    }

    /// UIDL for a single message: its number and unique id.
    pub fn uidl(&mut self, number: u32) -> Result<MessageInfo> {
        self.require("UIDL", &[Pop3State::Transaction])?;
        trace!("Cmd: UIDL {}", number);
        let msg = self.send_command("UIDL", Some(&number.to_string()))?;
        MessageInfo::parse_uid(&msg)
    }

    /// UIDL for the whole maildrop, in server order.
    pub fn uidl_all(&mut self) -> Result<Vec<MessageInfo>> {
        self.require("UIDL", &[Pop3State::Transaction])?;
        trace!("Cmd: UIDL");
        let lines = self.cmd_read_lines("UIDL")?;
        MessageInfo::parse_all(&lines, MessageInfo::parse_uid)
    }

    /// RETR: the message with dot-stuffing removed, lines joined by CRLF.
    pub fn retrieve(&mut self, number: u32) -> Result<String> {
        self.require("RETR", &[Pop3State::Transaction])?;
        trace!("Cmd: RETR {}", number);
        self.send_command("RETR", Some(&number.to_string()))?;
        self.transport.read_multiline_body()
    }

    /// DELE. Never retried.
    pub fn delete(&mut self, number: u32) -> Result<()> {
        self.require("DELE", &[Pop3State::Transaction])?;
        trace!("Cmd: DELE {}", number);
        self.cmd_simple("DELE", Some(&number.to_string()))
    }

    pub fn noop(&mut self) -> Result<()> {
        self.require("NOOP", &[Pop3State::Transaction])?;
        trace!("Cmd: NOOP");
        self.cmd_simple("NOOP", None)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.require("RSET", &[Pop3State::Transaction])?;
        trace!("Cmd: RSET");
        self.cmd_simple("RSET", None)
    }

    /// QUIT. The session ends whether or not the server acknowledges it.
    pub fn quit(&mut self) -> Result<()> {
        self.require("QUIT", &[Pop3State::Authorization, Pop3State::Transaction])?;
        trace!("Cmd: QUIT");
        let result = self.cmd_simple("QUIT", None);
        self.state = Pop3State::End;
        debug!("POP3State::{:?}", self.state);
        result
    }

    /// Liveness probe: sends STAT and reports whether the peer has closed
    /// the stream.
    ///
    /// This is not free. On a live session it costs a full STAT round trip.
    /// Any outcome other than end-of-stream, including `-ERR` or a
    /// transport failure, reports `false`.
    pub fn is_closed(&mut self) -> bool {
        match self.stat() {
            Err(ref e) => match *e.kind() {
                ErrorKind::EndOfStream => true,
                _ => false,
            },
            Ok(_) => false,
        }
    }

    /// Releases the stream. Calling it again does nothing.
    pub fn close(&mut self) {
        self.transport.close();
        if self.state != Pop3State::End {
            self.state = Pop3State::End;
            debug!("POP3State::{:?}", self.state);
        }
    }

    fn require(&self, command: &str, allowed: &[Pop3State]) -> Result<()> {
        if self.transport.at_eof() {
            bail!(ErrorKind::EndOfStream);
        }
        if self.state == Pop3State::End {
            bail!(ErrorKind::SessionClosed);
        }
        if !allowed.contains(&self.state) {
            bail!(ErrorKind::InvalidState(command.to_string(), self.state.to_string()));
        }
        Ok(())
    }

    fn cmd_simple(&mut self, command: &str, param: Option<&str>) -> Result<()> {
        self.send_command(command, param)?;
        Ok(())
    }

    fn cmd_read_lines(&mut self, command: &str) -> Result<Vec<String>> {
        self.send_command(command, None)?;
        self.transport.read_lines()
    }

    fn send_command(&mut self, command: &str, param: Option<&str>) -> Result<String> {
        let line = match param {
            Some(x) => format!("{} {}", command, x),
            None => command.to_string(),
        };

        if command == "PASS" {
            info!("C: PASS ****");
        } else {
            info!("C: {}", line);
        }
        self.transport.write_line(&line)?;
        self.transport.read_response()
    }
}
