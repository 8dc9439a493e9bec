use std::{
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

use tungstenite::{WebSocket, handshake::client::Request, stream::MaybeTlsStream};

use crate::foundation::error::{PlacerError, PlacerResult};

pub(crate) type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Open a client websocket (plain or TLS by scheme).
///
/// With `timeout` set, connecting and every read including the handshake are bounded by it.
/// The returned stream handle shares the socket, so callers can adjust timeouts later.
pub(crate) fn open_socket(
    request: Request,
    timeout: Option<Duration>,
) -> PlacerResult<(Socket, TcpStream)> {
    let uri = request.uri();
    let host = uri
        .host()
        .ok_or_else(|| PlacerError::config(format!("websocket url '{uri}' has no host")))?
        .to_string();
    let port = uri
        .port_u16()
        .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

    let connect_err = |e: std::io::Error| PlacerError::transport(format!("connect {host}:{port}: {e}"));
    let stream = match timeout {
        Some(limit) => {
            let addr = (host.as_str(), port)
                .to_socket_addrs()
                .map_err(connect_err)?
                .next()
                .ok_or_else(|| PlacerError::transport(format!("{host}:{port} did not resolve")))?;
            let stream = TcpStream::connect_timeout(&addr, limit).map_err(connect_err)?;
            stream.set_read_timeout(Some(limit)).map_err(connect_err)?;
            stream.set_write_timeout(Some(limit)).map_err(connect_err)?;
            stream
        }
        None => TcpStream::connect((host.as_str(), port)).map_err(connect_err)?,
    };
    let handle = stream
        .try_clone()
        .map_err(|e| PlacerError::transport(format!("clone socket: {e}")))?;

    let (socket, _response) = tungstenite::client_tls(request, stream)
        .map_err(|e| PlacerError::transport(format!("websocket handshake with {host}: {e}")))?;
    Ok((socket, handle))
}

/// Whether a read error is only the socket timeout elapsing.
pub(crate) fn is_timeout(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::Io(e)
            if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
    )
}
