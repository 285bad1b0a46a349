//! The connection: one stream transport carrying, in order, the
//! authentication handshake and then marshalled message frames.
//!
//! The connection is driven inside a scope: [Connection::scope] opens the
//! transport, runs the handshake, and hands the caller's async body a
//! [Handle] for sending and a [Replies] stream for everything inbound
//! that no caller is waiting on. When the body returns, the transport is
//! closed and every outstanding reply waiter is released.

pub mod auth;

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use smol::channel;
use smol::future;
use smol::lock::Mutex;
use smol::prelude::*;

use self::auth::split_line;
use self::auth::AuthMechanism;
use self::auth::Authenticator;
use crate::message_protocol::Message;
use crate::type_system::unmarshal::UnmarshalError;

/// Outbound frames in flight between a [Handle] and the connection.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// What the connection needs to know to get going.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the bus's unix socket.
    pub endpoint: PathBuf,
    pub auth: AuthMechanism,
}

impl Config {
    #[cfg(unix)]
    pub fn system_bus() -> Self {
        Self {
            endpoint: PathBuf::from("/var/run/dbus/system_bus_socket"),
            auth: AuthMechanism::external_from_process_uid(),
        }
    }
}

struct Shared {
    serial: AtomicU32,
    /// One single-shot slot per outstanding method call, keyed by serial.
    waiters: Mutex<HashMap<u32, channel::Sender<Message>>>,
}

impl Shared {
    /// Serials are nonzero and monotonically increasing.
    fn next_serial(&self) -> NonZeroU32 {
        loop {
            let serial = self
                .serial
                .fetch_add(1, Ordering::Relaxed)
                .wrapping_add(1);
            if let Some(serial) = NonZeroU32::new(serial) {
                return serial;
            }
        }
    }
}

/// The sending half handed to the scope body. Cheap to clone.
#[derive(Clone)]
pub struct Handle {
    shared: Arc<Shared>,
    outbound: channel::Sender<Vec<u8>>,
}

impl Handle {
    /// Send a message without waiting for an answer.
    ///
    /// The connection assigns the serial, which is returned. Submission
    /// order is delivery order.
    pub async fn send(&self, mut message: Message) -> crate::Result<NonZeroU32> {
        let serial = self.shared.next_serial();
        message.serial = Some(serial);
        let frame = message.marshal()?;

        self.outbound
            .send(frame)
            .await
            .map_err(|_| crate::Error::NotConnected)?;

        Ok(serial)
    }

    /// Send a method call and wait for the message answering it.
    ///
    /// Non-matching inbound traffic keeps flowing to [Replies] while this
    /// waits; the reply itself is delivered here exactly once.
    pub async fn send_with_reply(&self, mut message: Message) -> crate::Result<Message> {
        let serial = self.shared.next_serial();
        message.serial = Some(serial);
        let frame = message.marshal()?;

        // Install the waiter before releasing the write, so the reply
        // cannot arrive before anyone is listening for it.
        let (sender, receiver) = channel::bounded(1);
        self.shared.waiters.lock().await.insert(serial.get(), sender);

        if self.outbound.send(frame).await.is_err() {
            self.shared.waiters.lock().await.remove(&serial.get());
            return Err(crate::Error::NotConnected);
        }

        receiver.recv().await.map_err(|_| crate::Error::Cancelled)
    }
}

/// Inbound messages nobody was waiting on: signals, unsolicited errors,
/// replies whose waiter gave up. Arrival order is preserved.
pub struct Replies {
    receiver: channel::Receiver<Message>,
}

impl Replies {
    pub async fn next(&mut self) -> crate::Result<Message> {
        self.receiver
            .recv()
            .await
            .map_err(|_| crate::Error::NotConnected)
    }
}

/// Owns the transport and drives the duplex conversation.
pub struct Connection {
    reader: Box<dyn AsyncRead + Unpin>,
    writer: Box<dyn AsyncWrite + Unpin>,
    shared: Arc<Shared>,
    outbound: channel::Receiver<Vec<u8>>,
    replies: channel::Sender<Message>,
    authenticator: Authenticator,
    mechanism: AuthMechanism,
    /// Bytes read off the transport but not yet framed. Shared between
    /// the line framing of the handshake and the message framing that
    /// replaces it, so nothing is lost across the switch.
    inbound: Vec<u8>,
}

impl Connection {
    /// Connect to `config.endpoint`, authenticate, and run `body`.
    #[cfg(unix)]
    pub async fn scope<T, F, Fut>(config: Config, body: F) -> crate::Result<T>
    where
        F: FnOnce(Handle, Replies) -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        use smol::net::unix::UnixStream;

        log::info!("Connecting to {}.", config.endpoint.display());
        let stream = UnixStream::connect(&config.endpoint).await?;

        // Split into read/write halves of the same socket.
        let reader = stream.clone();
        let writer = stream;

        Self::scope_with(reader, writer, config.auth, body).await
    }

    /// Like [Connection::scope], over an already-established duplex byte
    /// stream. The transport only has to be reliable and ordered; framing
    /// is reconstructed here.
    pub async fn scope_with<R, W, T, F, Fut>(
        reader: R,
        writer: W,
        mechanism: AuthMechanism,
        body: F,
    ) -> crate::Result<T>
    where
        R: AsyncRead + Unpin + 'static,
        W: AsyncWrite + Unpin + 'static,
        F: FnOnce(Handle, Replies) -> Fut,
        Fut: Future<Output = crate::Result<T>>,
    {
        let shared = Arc::new(Shared {
            serial: AtomicU32::new(0),
            waiters: Mutex::new(HashMap::new()),
        });

        let (outbound_sender, outbound_receiver) = channel::bounded(OUTBOUND_QUEUE_DEPTH);
        let (replies_sender, replies_receiver) = channel::unbounded();

        let connection = Connection {
            reader: Box::new(reader),
            writer: Box::new(writer),
            shared: Arc::clone(&shared),
            outbound: outbound_receiver,
            replies: replies_sender,
            authenticator: Authenticator::new(),
            mechanism,
            inbound: Vec::new(),
        };

        let handle = Handle {
            shared: Arc::clone(&shared),
            outbound: outbound_sender,
        };
        let replies = Replies {
            receiver: replies_receiver,
        };

        // The body and the connection driver share one task; whichever
        // finishes first ends the scope and drops the other, which closes
        // the transport.
        let result = future::or(async { body(handle, replies).await }, async {
            Err(connection.run().await)
        })
        .await;

        // Nobody will complete the remaining waiters now; dropping their
        // slots lets them observe the cancellation.
        shared.waiters.lock().await.clear();

        result
    }

    /// Drive the connection until the transport fails or the scope ends.
    /// Only ever returns by failing.
    async fn run(mut self) -> crate::Error {
        match self.drive().await {
            Ok(never) => match never {},
            Err(error) => {
                log::debug!("Connection terminated: {}.", error);
                error
            }
        }
    }

    async fn drive(&mut self) -> crate::Result<std::convert::Infallible> {
        self.handshake().await?;
        self.message_loop().await
    }

    /// Run the line-oriented handshake to completion.
    ///
    /// Outbound frames submitted in the meantime are parked in the
    /// authenticator and go out right behind its `BEGIN`.
    async fn handshake(&mut self) -> crate::Result<()> {
        log::info!("Authenticating.");

        let opening = self.authenticator.activate(&self.mechanism);
        self.writer.write_all(&opening).await?;
        self.writer.flush().await?;

        loop {
            match self.next_event(true).await? {
                Event::Outbound(frame) => {
                    self.authenticator.queue_frame(frame);
                }
                Event::Inbound(bytes) => {
                    if bytes.is_empty() {
                        return Err(crate::Error::NotConnected);
                    }
                    self.inbound.extend_from_slice(&bytes);

                    let consumed = self.authenticator.consume_leading_null(&self.inbound);
                    self.inbound.drain(..consumed);

                    while let Some((line, consumed)) = split_line(&self.inbound)? {
                        self.inbound.drain(..consumed);

                        let response = self.authenticator.handle_line(&line)?;
                        self.writer.write_all(&response).await?;
                        self.writer.flush().await?;

                        if self.authenticator.is_authenticated() {
                            // Bytes behind the OK line stay buffered: they
                            // already belong to the message framing.
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// The steady state: frame inbound bytes into messages and route
    /// them; write outbound frames in submission order.
    async fn message_loop(&mut self) -> crate::Result<std::convert::Infallible> {
        log::info!("Authenticated, switching to message framing.");

        loop {
            // Frame and dispatch everything already buffered.
            loop {
                match Message::unmarshal(&self.inbound) {
                    Ok((message, consumed)) => {
                        self.inbound.drain(..consumed);
                        self.route(message).await;
                    }
                    // An incomplete frame stays in the buffer untouched;
                    // the reader position effectively rewinds to its
                    // start until more bytes arrive.
                    Err(UnmarshalError::TruncatedHeaderFields)
                    | Err(UnmarshalError::TruncatedBody) => break,
                    Err(error) => return Err(error.into()),
                }
            }

            match self.next_event(false).await? {
                Event::Inbound(bytes) => {
                    if bytes.is_empty() {
                        return Err(crate::Error::NotConnected);
                    }
                    self.inbound.extend_from_slice(&bytes);
                }
                Event::Outbound(frame) => {
                    self.writer.write_all(&frame).await?;
                    self.writer.flush().await?;
                }
            }
        }
    }

    /// Wait for the next thing to do: bytes from the transport, or an
    /// outbound frame from a handle.
    async fn next_event(&mut self, authenticating: bool) -> crate::Result<Event> {
        // While the handshake queue is full, stop accepting outbound
        // frames; senders back up on the channel instead.
        let accept_outbound = !authenticating || self.authenticator.can_queue();
        let reader = &mut self.reader;
        let outbound = &self.outbound;

        future::or(
            async {
                let mut chunk = [0u8; 4096];
                let n = reader.read(&mut chunk).await?;
                Ok(Event::Inbound(chunk[..n].to_vec()))
            },
            async {
                if !accept_outbound {
                    future::pending::<()>().await;
                }
                match outbound.recv().await {
                    Ok(frame) => Ok(Event::Outbound(frame)),
                    // Every handle is gone; there is nothing left to send,
                    // but inbound traffic may still matter.
                    Err(_) => future::pending().await,
                }
            },
        )
        .await
    }

    /// Deliver one inbound message: to the waiter registered for its
    /// REPLY_SERIAL if there is one, exactly once; otherwise to the
    /// generic stream.
    async fn route(&mut self, message: Message) {
        if let Some(reply_serial) = message.reply_serial() {
            let mut waiters = self.shared.waiters.lock().await;
            if let Some(waiter) = waiters.remove(&reply_serial) {
                drop(waiters);
                // A waiter that gave up just misses its reply.
                let _ = waiter.try_send(message);
                return;
            }
        }

        // No waiter: signals, unsolicited errors, stray replies.
        let _ = self.replies.send(message).await;
    }
}

enum Event {
    Inbound(Vec<u8>),
    Outbound(Vec<u8>),
}
