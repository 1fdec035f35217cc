use std::collections::VecDeque;
use std::io;

use crate::{
    error::ClientError,
    http::{Request, Response, Transport},
};

/// Transport answering from a fixed script and recording every request.
/// Once the script runs out, requests fail as refused connections.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<Result<Response, ClientError>>,
    pub requests: Vec<Request>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, body: &str) -> Self {
        self.replies.push_back(Ok(Response {
            status: Some(200),
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(mut self) -> Self {
        self.replies.push_back(Err(refused()));
        self
    }

    pub fn paths(&self) -> Vec<&str> {
        self.requests.iter().map(|request| request.path.as_str()).collect()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, request: &Request) -> Result<Response, ClientError> {
        self.requests.push(request.clone());
        self.replies.pop_front().unwrap_or_else(|| Err(refused()))
    }
}

fn refused() -> ClientError {
    ClientError::Connection(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        "scripted refusal",
    ))
}
