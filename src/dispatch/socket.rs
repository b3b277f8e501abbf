use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use url::Url;

use super::{Ack, DispatchError, Transport};

/// Opens a TCP connection to `tcp://host:port`, writes the report as one
/// newline-terminated text frame, and closes the connection.
pub struct SocketTransport {
    endpoint: String,
    addrs: Vec<SocketAddr>,
    timeout: Duration,
}

impl SocketTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let url = Url::parse(endpoint)
            .map_err(|e| DispatchError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if url.scheme() != "tcp" {
            return Err(DispatchError::InvalidEndpoint(format!(
                "{endpoint}: socket mode needs a tcp://host:port url"
            )));
        }
        if url.port().is_none() {
            return Err(DispatchError::InvalidEndpoint(format!(
                "{endpoint}: missing port"
            )));
        }
        let addrs = url
            .socket_addrs(|| None)
            .map_err(|e| DispatchError::Unreachable(format!("{endpoint}: {e}")))?;
        if addrs.is_empty() {
            return Err(DispatchError::Unreachable(format!(
                "{endpoint}: host did not resolve"
            )));
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            addrs,
            timeout,
        })
    }

    fn connect(&self) -> Result<TcpStream, DispatchError> {
        let mut last_err = None;
        for addr in &self.addrs {
            match TcpStream::connect_timeout(addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        match last_err {
            Some(err) if is_timeout(&err) => Err(DispatchError::Timeout),
            Some(err) => Err(DispatchError::Unreachable(format!("{}: {err}", self.endpoint))),
            None => Err(DispatchError::Unreachable(self.endpoint.clone())),
        }
    }
}

impl Transport for SocketTransport {
    fn name(&self) -> &'static str {
        "socket"
    }

    fn send(&self, payload: &[u8]) -> Result<Ack, DispatchError> {
        let mut stream = self.connect()?;
        stream.set_write_timeout(Some(self.timeout))?;
        let written = stream
            .write_all(payload)
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush());
        if let Err(err) = written {
            return Err(if is_timeout(&err) {
                DispatchError::Timeout
            } else {
                DispatchError::Io(err)
            });
        }
        match stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotConnected => {}
            Err(err) => return Err(DispatchError::Io(err)),
        }
        Ok(Ack {
            bytes_sent: payload.len() + 1,
            status: None,
        })
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}
