//! Connection tests against an in-process peer over a socketpair.
//!
//! The peer plays the bus side of the conversation by hand: it accepts
//! the textual handshake and then speaks marshalled frames, so these
//! tests cover the pipeline switch, write queueing, ordering and reply
//! correlation end to end.

#![cfg(unix)]

use std::num::NonZeroU32;

use smol::channel;
use smol::future;
use smol::net::unix::UnixStream;
use smol::prelude::*;

use dbus_wire::type_system::types::DBusString;
use dbus_wire::AuthMechanism;
use dbus_wire::Body;
use dbus_wire::Connection;
use dbus_wire::Error;
use dbus_wire::Message;
use dbus_wire::MessageType;
use dbus_wire::UnmarshalError;

async fn read_byte(stream: &mut UnixStream) -> u8 {
    let mut byte = [0u8; 1];
    stream.read_exact(&mut byte).await.unwrap();
    byte[0]
}

async fn read_line(stream: &mut UnixStream) -> String {
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.push(read_byte(stream).await);
        if line.ends_with(b"\r\n") {
            line.truncate(line.len() - 2);
            return String::from_utf8(line).unwrap();
        }
    }
}

/// Accept the client's handshake: null byte, AUTH, OK, BEGIN.
async fn accept_handshake(stream: &mut UnixStream) {
    assert_eq!(read_byte(stream).await, 0x00, "conversation opens with a null byte");

    let auth = read_line(stream).await;
    assert!(auth.starts_with("AUTH "), "unexpected opening line: {}", auth);

    stream.write_all(b"OK 1234abcd5678ef90\r\n").await.unwrap();

    let begin = read_line(stream).await;
    assert_eq!(begin, "BEGIN");
}

/// Read one frame off the stream, reassembling it from arbitrary chunks.
async fn read_message(stream: &mut UnixStream, buffer: &mut Vec<u8>) -> Message {
    loop {
        match Message::unmarshal(buffer) {
            Ok((message, consumed)) => {
                buffer.drain(..consumed);
                return message;
            }
            Err(UnmarshalError::TruncatedHeaderFields) | Err(UnmarshalError::TruncatedBody) => {
                let mut chunk = [0u8; 1024];
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "peer hung up mid-frame");
                buffer.extend_from_slice(&chunk[..n]);
            }
            Err(error) => panic!("bad frame: {}", error),
        }
    }
}

fn call(member: &str) -> Message {
    Message::method_call(None, "/org/example/Test", None, member, Body::new()).unwrap()
}

#[test]
fn replies_are_correlated_by_serial() {
    smol::block_on(async {
        let (client, server) = UnixStream::pair().unwrap();

        let peer = smol::spawn(async move {
            let mut stream = server;
            accept_handshake(&mut stream).await;

            let mut buffer = Vec::new();
            let first = read_message(&mut stream, &mut buffer).await;
            let second = read_message(&mut stream, &mut buffer).await;

            // Answer in reverse order of arrival; each reply names the
            // call it answers in its body.
            for message in vec![second, first] {
                let serial = message.serial.unwrap();
                let mut body = Body::new();
                body.push(DBusString::new(message.member().unwrap()).unwrap());

                let mut reply = Message::method_return(serial, None, body).unwrap();
                reply.serial = NonZeroU32::new(1000 + serial.get());
                stream.write_all(&reply.marshal().unwrap()).await.unwrap();
            }
        });

        let result = Connection::scope_with(
            client.clone(),
            client,
            AuthMechanism::Anonymous,
            |handle, _replies| async move {
                let first = handle.send_with_reply(call("First"));
                let second = handle.send_with_reply(call("Second"));
                let (first, second) = future::zip(first, second).await;

                Ok((first?, second?))
            },
        )
        .await;

        let (first_reply, second_reply) = result.unwrap();

        let answered = |message: &Message| match &message.body.arguments[..] {
            [dbus_wire::type_system::types::Type::Basic(
                dbus_wire::type_system::types::BasicType::DBusString(inner),
            )] => inner.string.clone(),
            other => panic!("unexpected reply body: {:?}", other),
        };

        // Each waiter saw exactly the reply for its own serial, despite
        // the reversed delivery order.
        assert_eq!(answered(&first_reply), "First");
        assert_eq!(answered(&second_reply), "Second");
        assert_eq!(first_reply.message_type, MessageType::MethodReturn);

        peer.await;
    });
}

#[test]
fn sends_before_authentication_replay_in_order() {
    smol::block_on(async {
        let (client, server) = UnixStream::pair().unwrap();

        // The peer holds the OK back until the client has queued its
        // sends, so they can only go out behind BEGIN.
        let (queued_sender, queued_receiver) = channel::bounded::<()>(1);
        let (done_sender, done_receiver) = channel::bounded::<()>(1);

        let peer = smol::spawn(async move {
            let mut stream = server;

            assert_eq!(read_byte(&mut stream).await, 0x00);
            let auth = read_line(&mut stream).await;
            assert!(auth.starts_with("AUTH "));

            queued_receiver.recv().await.unwrap();
            stream.write_all(b"OK 1234abcd5678ef90\r\n").await.unwrap();

            // BEGIN must come before any frame bytes.
            let begin = read_line(&mut stream).await;
            assert_eq!(begin, "BEGIN");

            let mut buffer = Vec::new();
            for expected in &["One", "Two", "Three"] {
                let message = read_message(&mut stream, &mut buffer).await;
                assert_eq!(message.member(), Some(*expected));
            }

            done_sender.send(()).await.unwrap();
        });

        Connection::scope_with(
            client.clone(),
            client,
            AuthMechanism::Anonymous,
            |handle, _replies| async move {
                // These are accepted while the handshake is still waiting
                // for the server.
                let one = handle.send(call("One")).await?;
                let two = handle.send(call("Two")).await?;
                let three = handle.send(call("Three")).await?;

                // Serials are nonzero and increasing.
                assert!(one.get() < two.get() && two.get() < three.get());

                queued_sender.send(()).await.unwrap();
                done_receiver.recv().await.unwrap();
                Ok(())
            },
        )
        .await
        .unwrap();

        peer.await;
    });
}

#[test]
fn signals_flow_to_the_replies_stream() {
    smol::block_on(async {
        let (client, server) = UnixStream::pair().unwrap();

        let peer = smol::spawn(async move {
            let mut stream = server;
            accept_handshake(&mut stream).await;

            let mut body = Body::new();
            body.push(7u32);
            let mut signal =
                Message::signal("/org/example/Test", "org.example.Test", "Alert", body).unwrap();
            signal.serial = NonZeroU32::new(9);
            stream.write_all(&signal.marshal().unwrap()).await.unwrap();
        });

        Connection::scope_with(
            client.clone(),
            client,
            AuthMechanism::Anonymous,
            |_handle, mut replies| async move {
                let signal = replies.next().await?;
                assert_eq!(signal.message_type, MessageType::Signal);
                assert_eq!(signal.member(), Some("Alert"));
                assert_eq!(signal.interface(), Some("org.example.Test"));
                Ok(())
            },
        )
        .await
        .unwrap();

        peer.await;
    });
}

#[test]
fn rejection_fails_the_scope_without_begin() {
    smol::block_on(async {
        let (client, server) = UnixStream::pair().unwrap();

        let peer = smol::spawn(async move {
            let mut stream = server;

            assert_eq!(read_byte(&mut stream).await, 0x00);
            let auth = read_line(&mut stream).await;
            assert!(auth.starts_with("AUTH "));

            stream.write_all(b"REJECTED EXTERNAL\r\n").await.unwrap();

            // The client closes without sending BEGIN or anything else.
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).await.unwrap();
            assert!(rest.is_empty(), "client sent bytes after rejection: {:?}", rest);
        });

        let result: dbus_wire::Result<()> = Connection::scope_with(
            client.clone(),
            client,
            AuthMechanism::Anonymous,
            |_handle, _replies| async move {
                // The failing handshake ends the scope; the body never
                // finishes on its own.
                future::pending::<dbus_wire::Result<()>>().await
            },
        )
        .await;

        match result {
            Err(Error::InvalidAuthCommand(line)) => assert_eq!(line, "REJECTED EXTERNAL"),
            other => panic!("expected an authentication failure, got {:?}", other.map(|_| ())),
        }

        peer.await;
    });
}

#[test]
fn scope_exit_cancels_pending_waiters() {
    smol::block_on(async {
        let (client, server) = UnixStream::pair().unwrap();

        // The peer acknowledges the call but never answers it.
        let (swallowed_sender, swallowed_receiver) = channel::bounded::<()>(1);

        let peer = smol::spawn(async move {
            let mut stream = server;
            accept_handshake(&mut stream).await;

            let mut buffer = Vec::new();
            let _ = read_message(&mut stream, &mut buffer).await;
            swallowed_sender.send(()).await.unwrap();

            // Hold the socket open until the client hangs up.
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest).await;
        });

        let result = Connection::scope_with(
            client.clone(),
            client,
            AuthMechanism::Anonymous,
            |handle, _replies| async move {
                // Race the reply wait against the peer's acknowledgement;
                // the scope then ends with the waiter still registered.
                let reply = handle.send_with_reply(call("Forgotten"));
                let give_up = async {
                    swallowed_receiver.recv().await.unwrap();
                    Ok(None)
                };

                future::or(async { reply.await.map(Some) }, give_up).await
            },
        )
        .await;

        assert!(matches!(result, Ok(None)), "the give-up arm wins");

        peer.await;
    });
}
