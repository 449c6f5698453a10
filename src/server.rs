//! Line-protocol dictionary server.
//!
//! Each connection carries one ` word_possibleLanguages::<word>::<langs>`
//! request and gets one JSON array back, after which the connection is
//! closed. Connections are handled one at a time.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dictionary::{Dictionary, MAX_REQUEST_LEN, parse_request};
use crate::error::ServerError;

/// Read/write timeout for a client connection.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DictionaryServer<D> {
    listener: TcpListener,
    dictionary: D,
}

impl<D: Dictionary> DictionaryServer<D> {
    pub fn bind(address: &str, dictionary: D) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address).map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })?;
        Ok(Self {
            listener,
            dictionary,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the listener fails.
    pub fn serve(&self) -> Result<(), ServerError> {
        info!(address = %self.local_addr()?, "dictionary server listening");
        loop {
            self.accept_one()?;
        }
    }

    /// Serve exactly `count` connections.
    pub fn serve_n(&self, count: usize) -> Result<(), ServerError> {
        for _ in 0..count {
            self.accept_one()?;
        }
        Ok(())
    }

    fn accept_one(&self) -> Result<(), ServerError> {
        let (stream, peer) = self.listener.accept()?;
        // A misbehaving client must not take the server down.
        if let Err(err) = self.handle(stream) {
            warn!(%peer, error = %err, "dictionary request failed");
        }
        Ok(())
    }

    fn handle(&self, mut stream: TcpStream) -> std::io::Result<()> {
        stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
        stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;

        let mut line = String::new();
        // +2 leaves room for "\r\n".
        BufReader::new((&stream).take(MAX_REQUEST_LEN as u64 * 4 + 2)).read_line(&mut line)?;

        let response = self.answer(&line);
        debug!(request = %line.trim_end(), response = %response, "dictionary exchange");
        stream.write_all(response.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()
    }

    /// JSON array of the requested languages that know the word; `[]` for
    /// anything that can't be answered.
    fn answer(&self, line: &str) -> String {
        let known: Vec<String> = match parse_request(line) {
            Ok((word, langs)) => match self.dictionary.lookup(&word, &langs) {
                Ok(found) => langs.into_iter().filter(|lang| found.contains(lang)).collect(),
                Err(err) => {
                    warn!(word = %word, error = %err, "lookup failed");
                    Vec::new()
                }
            },
            Err(err) => {
                warn!(error = %err, "rejecting request");
                Vec::new()
            }
        };
        serde_json::to_string(&known).unwrap_or_else(|_| "[]".to_string())
    }
}
