//! Thin static file server for previewing recorded movies in a browser.
//!
//! Not involved in running a match at all — a convenience for replaying a
//! movie against the game's web assets during development. GET only, one
//! request per connection, HTTP/1.0 with `Connection: close`.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};

use anyhow::Context;
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 9999;
const INDEX_FILE: &str = "index.html";

/// Serves static files from a resource root.
pub struct PreviewServer {
    root: PathBuf,
    port: u16,
}

impl PreviewServer {
    /// Server for the assets under `root`, on the default port 9999.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PreviewServer {
            root: root.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Use `port` instead of the default.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Bind the configured port on localhost and serve requests forever.
    pub fn serve(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.port))
            .with_context(|| format!("could not bind preview port {}", self.port))?;
        self.run(listener)
    }

    /// Serve requests from an already-bound listener forever.
    pub fn run(&self, listener: TcpListener) -> anyhow::Result<()> {
        info!(root = %self.root.display(), addr = ?listener.local_addr(), "preview server up");
        for stream in listener.incoming() {
            let stream = stream.context("accepting preview connection")?;
            if let Err(e) = self.handle(stream) {
                warn!(error = %e, "preview request failed");
            }
        }
        Ok(())
    }

    fn handle(&self, mut stream: TcpStream) -> anyhow::Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut request_line = String::new();
        reader.read_line(&mut request_line)?;

        let target = request_target(&request_line);
        info!(target, "preview request");

        match self.resolve(target) {
            Some(source) => {
                let body = fs::read(&source)?;
                let mime = mime_type(extension(&source));
                respond(&mut stream, 200, "Ok", mime, &body)
            }
            None => {
                let body = format!("<h2>Not found: {target}</h2>\n");
                respond(
                    &mut stream,
                    404,
                    "Not Found",
                    "text/html; charset=utf-8",
                    body.as_bytes(),
                )
            }
        }
    }

    /// Map a request target to a readable file under the root, or `None`.
    ///
    /// Directory targets resolve to their index document. Targets escaping
    /// the root (`..`) resolve to `None` rather than to files outside it.
    fn resolve(&self, target: &str) -> Option<PathBuf> {
        let mut source = self.root.clone();
        for part in target.split('/') {
            match part {
                "" | "." => {}
                ".." => return None,
                part => source.push(part),
            }
        }

        if source.is_dir() {
            source.push(INDEX_FILE);
        }
        source.is_file().then_some(source)
    }
}

fn request_target(request_line: &str) -> &str {
    // e.g. "GET /images/ball.png?x=1 HTTP/1.1"
    let target = request_line.split(' ').nth(1).unwrap_or("/");
    target.split('?').next().unwrap_or("/")
}

fn respond(
    stream: &mut TcpStream,
    code: u16,
    phrase: &str,
    content_type: &str,
    body: &[u8],
) -> anyhow::Result<()> {
    write!(stream, "HTTP/1.0 {code} {phrase}\r\n")?;
    if let Ok(date) = OffsetDateTime::now_utc().format(&Rfc2822) {
        write!(stream, "Date: {date}\r\n")?;
    }
    write!(stream, "Server: Arena Previewer\r\n")?;
    write!(stream, "Content-Type: {content_type}\r\n")?;
    write!(stream, "Content-Length: {}\r\n", body.len())?;
    write!(stream, "Connection: close\r\n\r\n")?;
    stream.write_all(body)?;
    Ok(())
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn mime_type(extension: &str) -> &'static str {
    match extension {
        "html" => "text/html",
        "js" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::SocketAddr;

    fn serve_tempdir() -> (SocketAddr, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "<h1>replay</h1>").unwrap();
        fs::write(dir.path().join("movie.json"), "{\"frames\":[]}").unwrap();

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let server = PreviewServer::new(dir.path());
        std::thread::spawn(move || {
            let _ = server.run(listener);
        });
        (addr, dir)
    }

    fn get(addr: SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {target} HTTP/1.0\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn directory_paths_serve_the_index_document() {
        let (addr, _dir) = serve_tempdir();
        let response = get(addr, "/");
        assert!(response.starts_with("HTTP/1.0 200 Ok"));
        assert!(response.contains("Content-Type: text/html"));
        assert!(response.ends_with("<h1>replay</h1>"));
    }

    #[test]
    fn files_get_mime_types_by_extension() {
        let (addr, _dir) = serve_tempdir();
        let response = get(addr, "/movie.json");
        assert!(response.starts_with("HTTP/1.0 200 Ok"));
        assert!(response.contains("Content-Type: application/json"));
    }

    #[test]
    fn missing_resources_get_an_html_404() {
        let (addr, _dir) = serve_tempdir();
        let response = get(addr, "/nope.png");
        assert!(response.starts_with("HTTP/1.0 404 Not Found"));
        assert!(response.contains("Content-Type: text/html"));
        assert!(response.contains("Not found: /nope.png"));
    }

    #[test]
    fn traversal_out_of_the_root_is_not_served() {
        let (addr, _dir) = serve_tempdir();
        let response = get(addr, "/../../etc/hostname");
        assert!(response.starts_with("HTTP/1.0 404 Not Found"));
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(mime_type("bin"), "application/octet-stream");
        assert_eq!(mime_type("svg"), "image/svg+xml");
    }
}
