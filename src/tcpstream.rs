use crate::errors::*;
use crate::utils;
use openssl::ssl::{SslConnector, SslMethod, SslStream, SslVerifyMode};
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use std::fs;
use std::io::{Error as IoError, Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which certificates a TLS connection trusts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trust {
    /// Only the roots found in this PEM bundle.
    RootCertificates(PathBuf),
    /// Whatever openssl finds in its default locations.
    SystemDefault,
    /// No chain or hostname verification at all.
    InsecureSkipVerify,
}

#[derive(Debug)]
pub enum Pop3Stream {
    Plain(TcpStream),
    SSL(SslStream<TcpStream>),
}

impl Pop3Stream {
    /// Opens a plain TCP connection to `addr` (`host:port`).
    pub fn connect(addr: &str) -> Result<Pop3Stream> {
        debug!("Creating a Plain TCP Connection to {}", addr);
        let stream = TcpStream::connect(addr)?;
        Ok(Pop3Stream::Plain(stream))
    }

    /// Opens a TCP connection to `addr` and runs the TLS handshake, naming
    /// the host part of `addr` for SNI and hostname verification.
    pub fn connect_tls(addr: &str, trust: &Trust) -> Result<Pop3Stream> {
        debug!("Creating a SSL Connection to {}", addr);
        let mut builder = SslConnector::builder(SslMethod::tls())?;
        match *trust {
            Trust::RootCertificates(ref path) => {
                let mut store = X509StoreBuilder::new()?;
                for cert in load_roots(path)? {
                    store.add_cert(cert)?;
                }
                builder.set_cert_store(store.build());
            }
            Trust::SystemDefault => {}
            Trust::InsecureSkipVerify => {
                warn!("Certificate verification disabled for {}", addr);
                builder.set_verify(SslVerifyMode::NONE);
            }
        }
        let connector = builder.build();

        let tcp_stream = TcpStream::connect(addr)?;
        let config = connector
            .configure()?
            .verify_hostname(*trust != Trust::InsecureSkipVerify);
        let stream = config.connect(utils::host_of(addr), tcp_stream)?;
        trace!("TLS handshake with {} done", addr);
        Ok(Pop3Stream::SSL(stream))
    }

    /// Sets both read and write deadlines on the socket. `None` blocks
    /// forever.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let socket = match *self {
            Pop3Stream::Plain(ref stream) => stream,
            Pop3Stream::SSL(ref stream) => stream.get_ref(),
        };
        socket.set_read_timeout(timeout)?;
        socket.set_write_timeout(timeout)?;
        Ok(())
    }
}

fn load_roots(path: &Path) -> Result<Vec<X509>> {
    let pem = fs::read(path).chain_err(|| format!("cannot read root certificates from {}", path.display()))?;
    let certs = X509::stack_from_pem(&pem)
        .chain_err(|| ErrorKind::Certificate(format!("{} is not a PEM bundle", path.display())))?;
    if certs.is_empty() {
        bail!(ErrorKind::Certificate(format!("no certificate in {}", path.display())));
    }
    debug!("Loaded {} root certificates from {}", certs.len(), path.display());
    Ok(certs)
}

impl Write for Pop3Stream {
    fn write(&mut self, buf: &[u8]) -> ::std::result::Result<usize, IoError> {
        match *self {
            Pop3Stream::Plain(ref mut stream) => stream.write(buf),
            Pop3Stream::SSL(ref mut stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> ::std::result::Result<(), IoError> {
        match *self {
            Pop3Stream::Plain(ref mut stream) => stream.flush(),
            Pop3Stream::SSL(ref mut stream) => stream.flush(),
        }
    }
}

impl Read for Pop3Stream {
    fn read(&mut self, buf: &mut [u8]) -> ::std::result::Result<usize, IoError> {
        match *self {
            Pop3Stream::Plain(ref mut stream) => stream.read(buf),
            Pop3Stream::SSL(ref mut stream) => stream.read(buf),
        }
    }
}
