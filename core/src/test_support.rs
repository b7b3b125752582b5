//! Recording transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::client::Client;
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};

#[derive(Default)]
struct Recorded {
    requests: Vec<HttpRequest>,
    responses: VecDeque<HttpResponse>,
}

/// Replays queued responses in order and records every request it sees.
/// Clones share state, so a test keeps one handle after giving the other to
/// a `Client`.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Rc<RefCell<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: u16, body: &str) {
        self.inner.borrow_mut().responses.push_back(HttpResponse {
            status,
            body: body.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.borrow().requests.clone()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().requests.clear();
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut inner = self.inner.borrow_mut();
        inner.requests.push(request.clone());
        inner
            .responses
            .pop_front()
            .ok_or_else(|| ApiError::Transport("no response queued".to_string()))
    }
}

pub const TEST_ROOT: &str = "http://diary.test/api/v1";

/// A client whose credential probe already succeeded, with the probe request
/// cleared from the recording.
pub fn connected_client() -> (Client, MockTransport) {
    let transport = MockTransport::new();
    transport.push(200, "{}");
    let config = Config::new(TEST_ROOT).unwrap();
    let client = Client::with_transport(config, "alice", "hunter2", transport.clone()).unwrap();
    transport.clear();
    (client, transport)
}
