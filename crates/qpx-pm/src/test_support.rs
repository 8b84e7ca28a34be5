//! Local HTTP server for tests that talk to a registry or tarball endpoint.

use std::io::Read;
use std::thread::JoinHandle;
use tiny_http::{Header, Response, Server};

/// A request the server answered
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub authorization: Option<String>,
}

pub struct TestServer {
    pub base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl TestServer {
    /// Answer exactly one request per entry of `responses`, in order
    pub fn serve(responses: Vec<(u16, Vec<u8>)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();

        let handle = std::thread::spawn(move || {
            let mut recorded = Vec::new();
            for (status, body) in responses {
                let mut request = server.recv().unwrap();

                let mut request_body = String::new();
                request.as_reader().read_to_string(&mut request_body).unwrap();
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    body: request_body,
                    authorization: request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.to_string()),
                });

                let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
                let response = Response::from_data(body)
                    .with_status_code(status)
                    .with_header(content_type);
                request.respond(response).unwrap();
            }
            recorded
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
        }
    }

    /// Wait for every response to be sent and return what was asked
    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().unwrap()
    }
}

/// A `.tar.gz` holding `files` under a single `<prefix>/` directory
pub fn tarball(prefix: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, format!("{}/{}", prefix, path), content.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}
