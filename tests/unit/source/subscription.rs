use std::{
    net::{TcpListener, TcpStream},
    thread::JoinHandle,
};

use serde_json::Value;
use tungstenite::{
    WebSocket,
    handshake::server::{ErrorResponse, Request, Response},
};

use super::*;

type Server<T> = JoinHandle<(Option<String>, T)>;

/// Accept one `graphql-ws` client, record its `Origin`, then hand the socket to `script`.
fn serve<T, F>(script: F) -> (String, Server<T>)
where
    T: Send + 'static,
    F: FnOnce(&mut WebSocket<TcpStream>) -> T + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}/query", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut origin = None;
        let mut ws = tungstenite::accept_hdr(stream, |req: &Request, mut resp: Response| {
            origin = req
                .headers()
                .get("Origin")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            resp.headers_mut()
                .insert("Sec-WebSocket-Protocol", HeaderValue::from_static("graphql-ws"));
            Ok::<_, ErrorResponse>(resp)
        })
        .unwrap();
        let out = script(&mut ws);
        (origin, out)
    });
    (url, handle)
}

fn read_json(ws: &mut WebSocket<TcpStream>) -> Value {
    loop {
        if let Message::Text(t) = ws.read().unwrap() {
            return serde_json::from_str(t.as_str()).unwrap();
        }
    }
}

/// Read until the client closes; true if a close frame arrived.
fn drain(ws: &mut WebSocket<TcpStream>) -> bool {
    loop {
        match ws.read() {
            Ok(Message::Close(_)) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

fn locator(url: &str) -> GqlTileLocator {
    GqlTileLocator::new(url, "https://origin.test", "placer-test", "AFD2022")
        .with_read_timeout(Duration::from_millis(500))
}

fn token() -> AccessToken {
    AccessToken::new("tok")
}

#[test]
fn announced_image_is_returned_after_init_and_start() {
    let (url, server) = serve(|ws| {
        let init = read_json(ws);
        let start = read_json(ws);
        ws.send(Message::text(r#"{"type":"connection_ack"}"#)).unwrap();
        ws.send(Message::text(r#"{"type":"ka"}"#)).unwrap();
        ws.send(Message::text(
            r#"{"type":"data","id":"1","payload":{"data":{"subscribe":{"id":"x","data":{"__typename":"FullFrameMessageData","name":"https://cdn.test/tile-2.png","timestamp":1}}}}}"#,
        ))
        .unwrap();
        (init, start, drain(ws))
    });

    let tile = locator(&url).tile_url(Quadrant::BOTTOM_LEFT, &token()).unwrap();
    assert_eq!(tile, "https://cdn.test/tile-2.png");

    let (origin, (init, start, closed)) = server.join().unwrap();
    assert_eq!(origin.as_deref(), Some("https://origin.test"));
    assert_eq!(init["type"], "connection_init");
    assert_eq!(init["payload"]["Authorization"], "Bearer tok");
    assert_eq!(start["type"], "start");
    let channel = &start["payload"]["variables"]["input"]["channel"];
    assert_eq!(channel["teamOwner"], "AFD2022");
    assert_eq!(channel["tag"], "2");
    assert!(closed, "client should close the subscription socket");
}

#[test]
fn connection_error_is_an_auth_failure() {
    let (url, server) = serve(|ws| {
        read_json(ws);
        read_json(ws);
        ws.send(Message::text(
            r#"{"type":"connection_error","payload":{"message":"401 Unauthorized"}}"#,
        ))
        .unwrap();
        drain(ws)
    });

    let err = locator(&url).tile_url(Quadrant::TOP_LEFT, &token()).unwrap_err();
    assert!(matches!(err, PlacerError::Auth(_)), "{err}");
    assert!(err.to_string().contains("401 Unauthorized"));
    server.join().unwrap();
}

#[test]
fn close_before_any_image_is_a_transport_failure() {
    let (url, server) = serve(|ws| {
        read_json(ws);
        read_json(ws);
        ws.close(None).unwrap();
        drain(ws)
    });

    let err = locator(&url).tile_url(Quadrant::TOP_RIGHT, &token()).unwrap_err();
    assert!(matches!(err, PlacerError::Transport(_)), "{err}");
    server.join().unwrap();
}

#[test]
fn error_and_complete_frames_end_the_lookup() {
    let (url, server) = serve(|ws| {
        read_json(ws);
        read_json(ws);
        ws.send(Message::text(
            r#"{"type":"error","id":"1","payload":{"message":"unknown channel"}}"#,
        ))
        .unwrap();
        // The client may already be gone.
        let _ = ws.send(Message::text(r#"{"type":"complete","id":"1"}"#));
        drain(ws)
    });

    let started = Instant::now();
    let err = locator(&url).tile_url(Quadrant::TOP_LEFT, &token()).unwrap_err();
    assert!(matches!(err, PlacerError::Protocol(_)), "{err}");
    assert!(err.to_string().contains("unknown channel"));
    assert!(started.elapsed() < Duration::from_millis(500));
    server.join().unwrap();
}

#[test]
fn complete_without_image_is_a_protocol_failure() {
    let (url, server) = serve(|ws| {
        read_json(ws);
        read_json(ws);
        ws.send(Message::text(r#"{"type":"complete","id":"1"}"#)).unwrap();
        drain(ws)
    });

    let err = locator(&url).tile_url(Quadrant::TOP_LEFT, &token()).unwrap_err();
    assert!(matches!(err, PlacerError::Protocol(_)), "{err}");
    server.join().unwrap();
}

#[test]
fn silent_server_times_out_as_transport_failure() {
    let (url, server) = serve(|ws| {
        read_json(ws);
        read_json(ws);
        drain(ws)
    });

    let started = Instant::now();
    let err = locator(&url).tile_url(Quadrant::BOTTOM_RIGHT, &token()).unwrap_err();
    assert!(matches!(err, PlacerError::Transport(_)), "{err}");
    assert!(err.to_string().contains("no image announced"));
    assert!(started.elapsed() < Duration::from_secs(5));
    server.join().unwrap();
}

#[test]
fn keepalives_alone_do_not_extend_the_lookup() {
    let (url, server) = serve(|ws| {
        read_json(ws);
        read_json(ws);
        while ws.send(Message::text(r#"{"type":"ka"}"#)).is_ok() {
            std::thread::sleep(Duration::from_millis(100));
        }
    });

    let started = Instant::now();
    let err = locator(&url).tile_url(Quadrant::TOP_LEFT, &token()).unwrap_err();
    assert!(matches!(err, PlacerError::Transport(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    server.join().unwrap();
}
