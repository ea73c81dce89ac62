//! mpv JSON IPC over the `--input-ipc-server` unix socket.

use serde::Deserialize;
use serde_json::json;
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

const IPC_TIMEOUT: Duration = Duration::from_millis(500);
const PAUSE_REQUEST_ID: u64 = 1;

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    request_id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

pub fn set_pause(socket: &Path, paused: bool) -> io::Result<()> {
    let mut stream = UnixStream::connect(socket)?;
    stream.set_read_timeout(Some(IPC_TIMEOUT))?;
    stream.set_write_timeout(Some(IPC_TIMEOUT))?;

    let request = json!({
        "command": ["set_property", "pause", paused],
        "request_id": PAUSE_REQUEST_ID,
    });
    let mut line = serde_json::to_string(&request)?;
    line.push('\n');
    stream.write_all(line.as_bytes())?;

    let mut reader = BufReader::new(stream);
    let mut buffer = String::new();
    loop {
        buffer.clear();
        if reader.read_line(&mut buffer)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "control socket closed before replying",
            ));
        }

        // mpv interleaves event lines with replies.
        let Ok(reply) = serde_json::from_str::<Reply>(buffer.trim_end()) else {
            continue;
        };
        match (reply.request_id, reply.error) {
            (Some(PAUSE_REQUEST_ID), Some(error)) if error == "success" => return Ok(()),
            (Some(PAUSE_REQUEST_ID), Some(error)) => return Err(io::Error::other(error)),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::thread;

    fn serve_once(listener: UnixListener, response: &'static str) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut byte = [0_u8; 1];
            while stream.read(&mut byte).expect("read") == 1 {
                request.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            stream.write_all(response.as_bytes()).expect("write");
            String::from_utf8(request).expect("utf8")
        })
    }

    #[test]
    fn sends_pause_property_and_accepts_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&socket).expect("bind");
        let server = serve_once(
            listener,
            "{\"event\":\"pause\"}\n{\"request_id\":1,\"error\":\"success\"}\n",
        );

        set_pause(&socket, true).expect("pause");
        let request = server.join().expect("server");
        let parsed: serde_json::Value = serde_json::from_str(request.trim()).expect("json");
        assert_eq!(parsed["command"], json!(["set_property", "pause", true]));
    }

    #[test]
    fn reports_player_side_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&socket).expect("bind");
        let server = serve_once(listener, "{\"request_id\":1,\"error\":\"property unavailable\"}\n");

        let err = set_pause(&socket, false).expect_err("should fail");
        assert!(err.to_string().contains("property unavailable"));
        server.join().expect("server");
    }

    #[test]
    fn missing_socket_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(set_pause(&dir.path().join("absent.sock"), true).is_err());
    }
}
