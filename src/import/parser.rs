//! Streaming decoder for port documents.
//!
//! A document is one JSON object mapping port ids to port records:
//!
//! ```json
//! { "AEAJM": { "name": "Ajman", "unlocs": ["AEAJM"], ... }, ... }
//! ```
//!
//! Decoding runs on the blocking pool and hands ports over a channel of
//! capacity one, so at most one decoded record is held ahead of the consumer
//! no matter how large the document is.

use crate::error::PortError;
use crate::models::Port;
use serde::Deserializer as _;
use serde::de::{self, MapAccess, Visitor};
use std::cell::Cell;
use std::fmt;
use std::io::{BufReader, Read};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Outcome carried by a [`PortStream`]. An `Err` is always the last item.
pub type ParsedPort = Result<Port, PortError>;

/// Lazy sequence of decoded ports, terminated by at most one error.
#[derive(Debug)]
pub struct PortStream {
    receiver: mpsc::Receiver<ParsedPort>,
}

impl PortStream {
    pub(crate) fn from_receiver(receiver: mpsc::Receiver<ParsedPort>) -> Self {
        Self { receiver }
    }

    /// Next port or the terminal error. `None` once the parser is done.
    pub async fn next(&mut self) -> Option<ParsedPort> {
        self.receiver.recv().await
    }
}

/// Decodes a port document from any blocking reader.
pub struct JsonPortParser<R> {
    reader: R,
}

impl<R> JsonPortParser<R>
where
    R: Read + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Start decoding on the blocking pool.
    ///
    /// The parser stops quietly, without reporting an error, once `cancel` is
    /// triggered or the returned stream is dropped. Must be called from within
    /// a Tokio runtime.
    ///
    /// A decoder that panics is reported as [`PortError::DecoderFailed`], so
    /// the stream never ends silently on a crash.
    pub fn parse(self, cancel: CancellationToken) -> PortStream {
        let (sender, receiver) = mpsc::channel(1);
        let reader = self.reader;
        let supervisor = sender.clone();

        let decoder =
            tokio::task::spawn_blocking(move || decode_document(reader, sender, cancel));

        // Holds a sender until the decoder is joined, so the stream stays open
        // long enough to carry a join failure.
        tokio::spawn(async move {
            if let Err(err) = decoder.await {
                log::error!("port decoder stopped abnormally: {}", err);
                let _ = supervisor
                    .send(Err(PortError::DecoderFailed(err.to_string())))
                    .await;
            }
        });

        PortStream::from_receiver(receiver)
    }
}

fn decode_document<R: Read>(
    reader: R,
    sender: mpsc::Sender<ParsedPort>,
    cancel: CancellationToken,
) {
    let emitted = Cell::new(0usize);
    let halted = Cell::new(false);
    let visitor = PortMapVisitor {
        sender: &sender,
        cancel: &cancel,
        emitted: &emitted,
        halted: &halted,
    };

    let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(reader));
    let result = deserializer
        .deserialize_map(visitor)
        .and_then(|()| deserializer.end());

    match result {
        Ok(()) => log::debug!("port document decoded: {} ports", emitted.get()),
        Err(_) if halted.get() => log::debug!(
            "port decoding stopped after {} ports: import finished or cancelled",
            emitted.get()
        ),
        Err(err) => {
            log::error!(
                "invalid port document after {} ports: {}",
                emitted.get(),
                err
            );
            // Nobody to tell if the consumer already went away.
            let _ = sender.blocking_send(Err(PortError::InvalidJson(err)));
        }
    }
}

struct PortMapVisitor<'a> {
    sender: &'a mpsc::Sender<ParsedPort>,
    cancel: &'a CancellationToken,
    emitted: &'a Cell<usize>,
    halted: &'a Cell<bool>,
}

impl<'de> Visitor<'de> for PortMapVisitor<'_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object of port records keyed by id")
    }

    fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        while let Some(id) = map.next_key::<String>()? {
            let mut port: Port = map.next_value().map_err(|err: M::Error| {
                <M::Error as de::Error>::custom(format_args!("port '{}': {}", id, err))
            })?;
            port.id = Some(id);

            if self.cancel.is_cancelled() || self.sender.blocking_send(Ok(port)).is_err() {
                self.halted.set(true);
                return Err(de::Error::custom("port consumer stopped"));
            }
            self.emitted.set(self.emitted.get() + 1);
        }

        Ok(())
    }
}
