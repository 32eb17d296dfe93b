//! Connection settings for one mailbox.

use crate::client::Client;
use crate::errors::*;
use crate::tcpstream::{Pop3Stream, Trust};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the byte stream to the server is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Security {
    Plain,
    Tls,
    /// TLS without certificate or hostname verification.
    TlsInsecure,
}

impl Default for Security {
    fn default() -> Security {
        Security::Tls
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AccountConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub security: Security,
    /// PEM bundle of trusted roots for `Security::Tls`. The system store is
    /// used when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ca_file: Option<PathBuf>,
    /// Read and write deadline in seconds for every command.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timeout_secs: Option<u64>,
}

impl AccountConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The trust settings for a TLS connection, `None` for plain TCP.
    pub fn trust(&self) -> Option<Trust> {
        match self.security {
            Security::Plain => None,
            Security::Tls => Some(match self.ca_file {
                Some(ref path) => Trust::RootCertificates(path.clone()),
                None => Trust::SystemDefault,
            }),
            Security::TlsInsecure => Some(Trust::InsecureSkipVerify),
        }
    }

    /// Dials the server, reads the greeting and logs in.
    pub fn connect(&self) -> Result<Client<Pop3Stream>> {
        trace!("Initiate POP3 Connection");
        let addr = self.address();
        let stream = match self.trust() {
            None => Pop3Stream::connect(&addr)?,
            Some(trust) => Pop3Stream::connect_tls(&addr, &trust)?,
        };
        stream.set_timeout(self.timeout_secs.map(Duration::from_secs))?;

        let mut client = Client::connect(stream)?;
        client.authenticate(&self.username, &self.password)?;
        info!("Logged in to {} as {}", addr, self.username);
        Ok(client)
    }
}
