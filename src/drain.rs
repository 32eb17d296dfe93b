//! Walking a whole mailbox with a per-message handler.

use crate::client::Client;
use crate::errors::*;
use std::io::{Read, Write};

/// What the handler wants to happen after a message.
#[derive(Debug)]
pub enum DrainOutcome {
    /// Move on to the next message.
    Continue,
    /// Stop after this message. The drain still succeeds.
    Stop,
    /// Abort the drain with this error. The message is not deleted.
    Fail(Error),
}

/// Drains one mailbox.
///
/// `connect` must return a fresh, authenticated session; it is called once
/// up front and again whenever the server turns out to have hung up.
/// `handler` is called once per message in UIDL order with the message
/// number, its unique id and the outcome of RETR (a failed retrieval is
/// handed over rather than aborting the drain). It returns whether to delete
/// the message and how to proceed.
///
/// After every handler call the session is probed with STAT; if the server
/// closed the stream, a new session replaces the old one for the remaining
/// messages. Deletion happens after the probe, on whichever session is
/// current. A handler failure is returned even if that reconnect fails. When the drain ends on an error, RSET is sent so the server
/// forgets this session's deletions. QUIT and close always follow. Failures
/// of these cleanup steps are logged and dropped.
pub fn drain<S, C, H>(mut connect: C, mut handler: H) -> Result<()>
where
    S: Read + Write,
    C: FnMut() -> Result<Client<S>>,
    H: FnMut(u32, &str, Result<String>) -> (bool, DrainOutcome),
{
    let mut session = connect()?;
    let result = drain_session(&mut session, &mut connect, &mut handler);
    finish(&mut session, result.is_err());
    result
}

fn drain_session<S, C, H>(session: &mut Client<S>, connect: &mut C, handler: &mut H) -> Result<()>
where
    S: Read + Write,
    C: FnMut() -> Result<Client<S>>,
    H: FnMut(u32, &str, Result<String>) -> (bool, DrainOutcome),
{
    let messages = session.uidl_all()?;
    debug!("Draining {} messages", messages.len());

    for info in messages {
        let data = session.retrieve(info.number);
        if let Err(ref e) = data {
            debug!("RETR {} failed: {}", info.number, e);
        }

        let (delete, outcome) = handler(info.number, &info.uid, data);

        if session.is_closed() {
            warn!("Server hung up after message {}, reconnecting", info.number);
            session.close();
            match connect() {
                Ok(fresh) => *session = fresh,
                Err(e) => {
                    if let DrainOutcome::Fail(_) = outcome {
                        warn!("Ignoring failed reconnect: {}", e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        let stop = match outcome {
            DrainOutcome::Continue => false,
            DrainOutcome::Stop => true,
            DrainOutcome::Fail(e) => {
                debug!("Handler failed on message {}: {}", info.number, e);
                return Err(e);
            }
        };

        if delete {
            session.delete(info.number)?;
        }

        if stop {
            debug!("Handler stopped the drain at message {}", info.number);
            break;
        }
    }
    Ok(())
}

fn finish<S: Read + Write>(session: &mut Client<S>, failed: bool) {
    if failed {
        if let Err(e) = session.reset() {
            warn!("Ignoring failed RSET: {}", e);
        }
    }
    if let Err(e) = session.quit() {
        warn!("Ignoring failed QUIT: {}", e);
    }
    session.close();
}
