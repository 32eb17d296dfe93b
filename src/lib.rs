//! A blocking POP3 client.
//!
//! The crate is layered the way the protocol is: [`transport::Transport`]
//! frames lines over any `Read + Write` stream, [`Client`] issues one
//! command per POP3 verb on top of it, and [`drain`] walks a whole mailbox,
//! handing every message to a caller supplied handler.
//!
//! ```no_run
//! use pop3_fetch::DrainOutcome;
//!
//! pop3_fetch::receive_mail("pop.example.org:110", "user", "secret", |number, uid, data| {
//!     match data {
//!         Ok(body) => println!("{} {} {} bytes", number, uid, body.len()),
//!         Err(e) => println!("{} {} failed: {}", number, uid, e),
//!     }
//!     (false, DrainOutcome::Continue)
//! }).unwrap();
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

pub mod errors {
    error_chain! {
        foreign_links {
            Io(::std::io::Error);
            SslStack(::openssl::error::ErrorStack);
            SslHandshake(::openssl::ssl::HandshakeError<::std::net::TcpStream>);
        }

        errors {
            Transport(reason: String) {
                description("stream unreadable or unwritable")
                display("transport failure: {}", reason)
            }
            CannotReachHost {
                description("cannot dial to host")
                display("cannot dial to host")
            }
            EndOfStream {
                description("connection closed by peer")
                display("connection closed by peer")
            }
            Response(text: String) {
                description("negative server response")
                display("server replied -ERR: {}", text)
            }
            Parse(line: String, reason: String) {
                description("malformed server reply")
                display("malformed reply {:?}: {}", line, reason)
            }
            SessionClosed {
                description("session already closed")
                display("session already closed")
            }
            InvalidState(command: String, state: String) {
                description("command not allowed in the current state")
                display("{} is not allowed in state {}", command, state)
            }
            Certificate(reason: String) {
                description("unusable root certificate bundle")
                display("unusable root certificate bundle: {}", reason)
            }
        }
    }
}
use crate::errors::*;

pub mod account;
pub mod client;
mod drain;
pub mod pop3result;
mod pop3resultimpl;
pub mod tcpstream;
pub mod transport;
mod utils;


pub use crate::account::{AccountConfig, Security};
pub use crate::client::{Client, Pop3State};
pub use crate::drain::{drain, DrainOutcome};
pub use crate::pop3result::{MessageInfo, POP3Stat};
pub use crate::tcpstream::{Pop3Stream, Trust};

use std::path::PathBuf;

/// Connects to the POP3 server at `addr` (`host:port`) over plain TCP and
/// reads its greeting.
pub fn dial(addr: &str) -> Result<Client<Pop3Stream>> {
    let stream = Pop3Stream::connect(addr)?;
    Client::connect(stream)
}

/// Connects to the POP3 server at `addr` over TLS, trusting the roots
/// selected by `trust`, and reads its greeting.
pub fn dial_tls(addr: &str, trust: &Trust) -> Result<Client<Pop3Stream>> {
    let stream = Pop3Stream::connect_tls(addr, trust)?;
    Client::connect(stream)
}

/// Dials `addr` over plain TCP and logs in with USER/PASS.
pub fn auth(addr: &str, user: &str, pass: &str) -> Result<Client<Pop3Stream>> {
    let mut client = dial(addr)?;
    client.authenticate(user, pass)?;
    Ok(client)
}

/// Dials `addr` over TLS, verifying the server against the PEM bundle at
/// `cert`, and logs in with USER/PASS.
pub fn auth_tls(addr: &str, user: &str, pass: &str, cert: &str) -> Result<Client<Pop3Stream>> {
    let mut client = dial_tls(addr, &Trust::RootCertificates(PathBuf::from(cert)))?;
    client.authenticate(user, pass)?;
    Ok(client)
}

/// Drains the mailbox at `addr` over plain TCP, calling `handler` for each
/// message. See [`drain`] for the exact sequencing.
pub fn receive_mail<H>(addr: &str, user: &str, pass: &str, handler: H) -> Result<()>
where
    H: FnMut(u32, &str, Result<String>) -> (bool, DrainOutcome),
{
    drain(|| auth(addr, user, pass), handler)
}

/// Same as [`receive_mail`] but over TLS with the PEM root bundle at `cert`.
pub fn receive_mail_tls<H>(addr: &str, user: &str, pass: &str, cert: &str, handler: H) -> Result<()>
where
    H: FnMut(u32, &str, Result<String>) -> (bool, DrainOutcome),
{
    drain(|| auth_tls(addr, user, pass, cert), handler)
}

/// Drains the mailbox described by `account`. Reconnects reuse the same
/// account settings.
pub fn receive_mail_account<H>(account: &AccountConfig, handler: H) -> Result<()>
where
    H: FnMut(u32, &str, Result<String>) -> (bool, DrainOutcome),
{
    drain(|| account.connect(), handler)
}
