//! End-to-end tests: a real russh client against a bound bbssh server.
//!
//! Key fixtures live in `tests/fixtures`:
//! - `host_ed25519`: server host key
//! - `robey_ed25519`: the allowed client key
//! - `intruder_ed25519`: a key that is not allowed

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bbssh::error::SessionError;
use bbssh::session::bbs::{BANNER, farewell};
use bbssh::{Server, ServerBuilder};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_test::assert_ok;

const OWNER: &str = "alice";
const KEY_USER: &str = "robey";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_key(name: &str) -> PrivateKey {
    load_secret_key(fixture(name), None).unwrap()
}

fn test_builder() -> ServerBuilder {
    ServerBuilder::new()
        .bind(Ipv4Addr::LOCALHOST.into())
        .port(0)
        .host_key_path(fixture("host_ed25519"))
        .allowed_key_path(fixture("robey_ed25519.pub"))
        .password_user(Some(OWNER.to_string()))
        .auth_rejection_time(Duration::from_millis(10))
        .timeout(Duration::from_secs(2))
        .line_timeout(Duration::from_secs(5))
}

/// Bind a server and serve exactly one connection in the background.
fn serve_one(builder: ServerBuilder) -> (SocketAddr, JoinHandle<Result<String, SessionError>>) {
    let server = Server::bind(builder.build().unwrap()).unwrap();
    let addr = server.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let (stream, peer) = server.accept().await.unwrap();
        server.serve(stream, peer).await
    });
    (addr, task)
}

/// Client handler that trusts any host key.
struct TestClient;

impl client::Handler for TestClient {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

async fn connect(addr: SocketAddr) -> Handle<TestClient> {
    let config = Arc::new(client::Config::default());
    client::connect(config, addr, TestClient).await.unwrap()
}

async fn auth_with_key(session: &mut Handle<TestClient>, user: &str, key: &str) -> bool {
    let key = PrivateKeyWithHashAlg::new(Arc::new(load_key(key)), None);
    session
        .authenticate_publickey(user, key)
        .await
        .unwrap()
        .success()
}

async fn auth_with_password(session: &mut Handle<TestClient>, user: &str, password: &str) -> bool {
    session
        .authenticate_password(user, password)
        .await
        .unwrap()
        .success()
}

/// Open a session channel and ask for a PTY and a shell.
async fn open_shell(session: &Handle<TestClient>) -> Channel<Msg> {
    let channel = session.channel_open_session().await.unwrap();
    channel
        .request_pty(true, "xterm", 80, 24, 0, 0, &[])
        .await
        .unwrap();
    channel.request_shell(true).await.unwrap();
    channel
}

/// Collect channel data until `done` says stop, or the channel ends.
async fn read_until(channel: &mut Channel<Msg>, done: impl Fn(&[u8]) -> bool) -> Vec<u8> {
    let mut output = Vec::new();
    let read = async {
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { data } => {
                    output.extend_from_slice(&data);
                    if done(&output) {
                        break;
                    }
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }
    };
    timeout(Duration::from_secs(10), read).await.unwrap();
    output
}

#[tokio::test]
async fn test_public_key_session_end_to_end() {
    let (addr, server) = serve_one(test_builder());

    let mut session = connect(addr).await;
    assert!(auth_with_key(&mut session, KEY_USER, "robey_ed25519").await);

    let mut channel = open_shell(&session).await;
    let banner = read_until(&mut channel, |out| out.ends_with(b"Username: ")).await;
    assert_eq!(String::from_utf8_lossy(&banner), BANNER.concat());

    channel.data(&b"alice\n"[..]).await.unwrap();
    let reply = read_until(&mut channel, |_| false).await;
    assert_eq!(
        String::from_utf8_lossy(&reply),
        "\r\nI don't like you, alice.\r\n"
    );

    let username = assert_ok!(server.await.unwrap());
    assert_eq!(username, "alice");
}

#[tokio::test]
async fn test_password_session_for_owner() {
    let (addr, server) = serve_one(test_builder());

    let mut session = connect(addr).await;
    assert!(auth_with_password(&mut session, OWNER, "anything").await);

    let mut channel = open_shell(&session).await;
    read_until(&mut channel, |out| out.ends_with(b"Username: ")).await;
    channel.data(&b"dave\r"[..]).await.unwrap();
    let reply = read_until(&mut channel, |_| false).await;
    assert_eq!(String::from_utf8_lossy(&reply), farewell("dave"));

    assert_eq!(assert_ok!(server.await.unwrap()), "dave");
}

#[tokio::test]
async fn test_empty_password_rejected() {
    let (addr, server) = serve_one(test_builder());

    let mut session = connect(addr).await;
    assert!(!auth_with_password(&mut session, OWNER, "").await);
    assert!(!auth_with_password(&mut session, KEY_USER, "").await);
    assert!(!auth_with_password(&mut session, "root", "").await);

    server.abort();
}

#[tokio::test]
async fn test_password_for_other_user_rejected() {
    let (addr, server) = serve_one(test_builder());

    let mut session = connect(addr).await;
    assert!(!auth_with_password(&mut session, KEY_USER, "secret").await);
    assert!(auth_with_password(&mut session, OWNER, "secret").await);

    server.abort();
}

#[tokio::test]
async fn test_public_key_rejections() {
    let (addr, server) = serve_one(test_builder());

    let mut session = connect(addr).await;
    // right user, wrong key
    assert!(!auth_with_key(&mut session, KEY_USER, "intruder_ed25519").await);
    // right key, wrong user
    assert!(!auth_with_key(&mut session, OWNER, "robey_ed25519").await);
    assert!(auth_with_key(&mut session, KEY_USER, "robey_ed25519").await);

    server.abort();
}

#[tokio::test]
async fn test_non_session_channel_rejected() {
    let (addr, server) = serve_one(test_builder().timeout(Duration::from_millis(500)));

    let mut session = connect(addr).await;
    assert!(auth_with_key(&mut session, KEY_USER, "robey_ed25519").await);

    let result = session
        .channel_open_direct_tcpip("localhost", 80, "127.0.0.1", 40000)
        .await;
    assert!(result.is_err());

    let err = server.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::NoChannel(_)));
}

#[tokio::test]
async fn test_no_shell_request_sends_no_banner() {
    let (addr, server) = serve_one(test_builder().shell_timeout(Duration::from_millis(300)));

    let mut session = connect(addr).await;
    assert!(auth_with_key(&mut session, KEY_USER, "robey_ed25519").await);

    let mut channel = session.channel_open_session().await.unwrap();
    channel
        .request_pty(true, "xterm", 80, 24, 0, 0, &[])
        .await
        .unwrap();

    let err = server.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::NoShellRequest(_)));

    // The transport is torn down; nothing but control messages arrived.
    let output = read_until(&mut channel, |_| false).await;
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_unauthenticated_client_times_out() {
    let (addr, server) = serve_one(test_builder().timeout(Duration::from_millis(300)));

    let _session = connect(addr).await;

    let err = server.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::NoChannel(_)));
}

#[tokio::test]
async fn test_silent_client_times_out_before_handshake() {
    let builder = test_builder()
        .timeout(Duration::from_millis(300))
        .inactivity_timeout(None);
    let (addr, server) = serve_one(builder);

    // TCP only, no SSH version line
    let _silent = TcpStream::connect(addr).await.unwrap();

    let result = timeout(Duration::from_secs(5), server).await.unwrap();
    let err = result.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::HandshakeTimeout(d) if d == Duration::from_millis(300)));
}

#[tokio::test]
async fn test_loop_continues_after_abandoned_connection() {
    let config = test_builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let server = Server::bind(config).unwrap();
    assert_eq!(server.config().accept_timeout, Duration::from_millis(300));
    let addr = server.local_addr().unwrap();
    let running = tokio::spawn(async move { server.run().await });

    // First client never speaks SSH, second never authenticates.
    let silent = TcpStream::connect(addr).await.unwrap();
    let idle = connect(addr).await;

    let mut session = connect(addr).await;
    assert!(auth_with_key(&mut session, KEY_USER, "robey_ed25519").await);
    let mut channel = open_shell(&session).await;
    let banner = read_until(&mut channel, |out| out.ends_with(b"Username: ")).await;
    assert_eq!(String::from_utf8_lossy(&banner), BANNER.concat());

    drop(silent);
    drop(idle);
    running.abort();
}
