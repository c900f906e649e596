//! End-to-end routing over real Unix sockets.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use dr_01_wire_protocol::io::{authenticate, read_frame, write_frame};
use dr_01_wire_protocol::{
    ArgReader, ArgWriter, CallBody, Envelope, Opcode, ReplyBody, ReturnValue, DEFAULT_MAX_PAYLOAD,
};
use relay_runtime::bootstrap::SessionCookie;
use relay_runtime::container::LimitsConfig;
use relay_runtime::transport::Listeners;
use relay_runtime::{ControlEvent, RelayServer};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;

const READ_DEADLINE: Duration = Duration::from_secs(5);

async fn connect(path: &Path, secret: &[u8]) -> UnixStream {
    let mut stream = UnixStream::connect(path).await.unwrap();
    assert!(authenticate(&mut stream, secret).await.unwrap());
    stream
}

async fn next_envelope(stream: &mut UnixStream) -> Envelope {
    tokio::time::timeout(READ_DEADLINE, read_frame(stream, DEFAULT_MAX_PAYLOAD))
        .await
        .expect("no frame before deadline")
        .unwrap()
        .expect("stream closed")
        .decode()
        .unwrap()
}

async fn call_server(stream: &mut UnixStream, function: &str, args: Bytes) -> ReturnValue {
    let body = CallBody::new("", function, args);
    let call = Envelope::new(Opcode::Call, 7, "", "DeskRelay", body.encode());
    write_frame(stream, &call).await.unwrap();

    let reply = next_envelope(stream).await;
    assert_eq!(reply.opcode, Opcode::Reply);
    assert_eq!(reply.key, 7);
    ReturnValue::from_reply_body(&reply.reply_body().unwrap().unwrap())
        .unwrap()
        .unwrap()
}

async fn register(stream: &mut UnixStream, name: &str) -> String {
    let args = ArgWriter::new().string(name).finish();
    match call_server(stream, "registerAs(QCString)", args).await {
        ReturnValue::String(assigned) => assigned,
        other => panic!("unexpected registerAs result: {other:?}"),
    }
}

fn ping(from: &str, to: &str, key: u32) -> Envelope {
    let body = CallBody::new("obj", "ping()", Bytes::new());
    Envelope::new(Opcode::Call, key, from, to, body.encode())
}

#[tokio::test]
async fn test_clients_route_through_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("relay.sock");

    let cookie = SessionCookie::generate();
    let secret = cookie.as_bytes().to_vec();
    let listeners = Listeners::bind(&socket, None).await.unwrap();

    let mut server = RelayServer::new();
    let _tasks = server.start(listeners, cookie, &LimitsConfig::default());
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let clients = tokio::spawn(async move {
        // A wrong cookie is answered with a rejection
        let mut intruder = UnixStream::connect(&socket).await.unwrap();
        assert!(!authenticate(&mut intruder, b"not-the-cookie").await.unwrap());

        let mut alpha = connect(&socket, &secret).await;
        let mut beta = connect(&socket, &secret).await;
        assert_eq!(register(&mut alpha, "alpha").await, "alpha");
        assert_eq!(register(&mut beta, "beta").await, "beta");

        // Call and reply pass through with the caller's key
        write_frame(&mut alpha, &ping("alpha", "beta", 11)).await.unwrap();
        let call = next_envelope(&mut beta).await;
        assert_eq!(call.opcode, Opcode::Call);
        assert_eq!(call.from_app, "alpha");
        assert_eq!(call.key, 11);
        assert_eq!(call.call_body().unwrap().function_name(), "ping");

        let reply_body = ReplyBody::new("void", Bytes::new()).encode();
        let reply = Envelope::new(Opcode::Reply, 11, "beta", "alpha", reply_body);
        write_frame(&mut beta, &reply).await.unwrap();
        let answered = next_envelope(&mut alpha).await;
        assert_eq!(answered.opcode, Opcode::Reply);
        assert_eq!(answered.from_app, "beta");
        assert_eq!(answered.key, 11);

        // The callee dies with a call outstanding
        write_frame(&mut alpha, &ping("alpha", "beta", 12)).await.unwrap();
        let _ = next_envelope(&mut beta).await;
        drop(beta);

        let failed = next_envelope(&mut alpha).await;
        assert_eq!(failed.opcode, Opcode::ReplyFailed);
        assert_eq!(failed.key, 1);
        assert_eq!(failed.from_app, "beta");
        assert_eq!(failed.to_app, "alpha");
        assert!(failed.body.is_empty());

        control_tx.send(ControlEvent::Shutdown).unwrap();
        alpha
    });

    server.run(control_rx).await;
    let _alpha = clients.await.unwrap();

    assert_eq!(server.router().registered_count(), 1);
    assert_eq!(server.router().connection_count(), 1);
}

#[tokio::test]
async fn test_duplicate_names_get_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("relay.sock");

    let cookie = SessionCookie::generate();
    let secret = cookie.as_bytes().to_vec();
    let listeners = Listeners::bind(&socket, None).await.unwrap();

    let mut server = RelayServer::new();
    let _tasks = server.start(listeners, cookie, &LimitsConfig::default());
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let clients = tokio::spawn(async move {
        let mut first = connect(&socket, &secret).await;
        let mut second = connect(&socket, &secret).await;
        assert_eq!(register(&mut first, "kate").await, "kate");
        assert_eq!(register(&mut second, "kate").await, "kate-2");

        // Plain-name lookups reach the earliest holder
        write_frame(&mut second, &ping("kate-2", "kate", 3)).await.unwrap();
        let call = next_envelope(&mut first).await;
        assert_eq!(call.from_app, "kate-2");

        control_tx.send(ControlEvent::Shutdown).unwrap();
        (first, second)
    });

    server.run(control_rx).await;
    let _streams = clients.await.unwrap();

    assert_eq!(server.router().registered_count(), 2);
}

/// Name announced by a presence notification.
fn presence(envelope: &Envelope) -> (String, String) {
    assert_eq!(envelope.opcode, Opcode::Send);
    assert_eq!(envelope.from_app, "DeskRelay");
    let call = envelope.call_body().unwrap();
    let name = ArgReader::new(call.args.clone()).string().unwrap();
    (call.function, name)
}

#[tokio::test]
async fn test_bad_frames_skip_or_close() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("relay.sock");

    let cookie = SessionCookie::generate();
    let secret = cookie.as_bytes().to_vec();
    let listeners = Listeners::bind(&socket, None).await.unwrap();
    let limits = LimitsConfig {
        max_payload_bytes: 1024,
        ..LimitsConfig::default()
    };

    let mut server = RelayServer::new();
    let _tasks = server.start(listeners, cookie, &limits);
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    let clients = tokio::spawn(async move {
        let mut alpha = connect(&socket, &secret).await;

        // Unknown opcode: skipped by length, the connection stays usable
        let mut frame = Envelope::new(Opcode::Send, 0, "alpha", "nobody", Bytes::new())
            .encode()
            .unwrap()
            .to_vec();
        frame[..4].copy_from_slice(&99i32.to_be_bytes());
        alpha.write_all(&frame).await.unwrap();

        assert_eq!(register(&mut alpha, "alpha").await, "alpha");
        let watch = ArgWriter::new().boolean(true).finish();
        assert_eq!(
            call_server(&mut alpha, "setNotifications(bool)", watch).await,
            ReturnValue::Void
        );

        let mut beta = connect(&socket, &secret).await;
        assert_eq!(register(&mut beta, "beta").await, "beta");
        assert_eq!(
            presence(&next_envelope(&mut alpha).await),
            ("applicationRegistered".to_string(), "beta".to_string())
        );

        // Oversized payload: the connection is closed and torn down
        let header = [0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0x10, 0x00];
        beta.write_all(&header).await.unwrap();
        assert_eq!(
            presence(&next_envelope(&mut alpha).await),
            ("applicationRemoved".to_string(), "beta".to_string())
        );
        let closed = tokio::time::timeout(READ_DEADLINE, read_frame(&mut beta, DEFAULT_MAX_PAYLOAD))
            .await
            .expect("beta not closed before deadline");
        assert!(matches!(closed, Ok(None) | Err(_)));

        control_tx.send(ControlEvent::Shutdown).unwrap();
        alpha
    });

    server.run(control_rx).await;
    let _alpha = clients.await.unwrap();

    assert_eq!(server.router().registered_count(), 1);
    assert_eq!(server.router().connection_count(), 1);
}
