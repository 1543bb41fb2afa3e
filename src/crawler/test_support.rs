//! Scripted [`HttpTransport`] used by the unit tests

use crate::crawler::fetcher::{HttpTransport, RawPage, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Replays queued responses per URL; unscripted URLs answer 404
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<RawPage, TransportError>>>>,
    sticky: Mutex<HashMap<String, RawPage>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, url: &str, response: Result<RawPage, TransportError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_ok(&self, url: &str, body: &str) {
        self.push(
            url,
            Ok(RawPage {
                status: 200,
                body: body.to_string(),
            }),
        );
    }

    pub fn push_status(&self, url: &str, status: u16) {
        self.push(
            url,
            Ok(RawPage {
                status,
                body: String::new(),
            }),
        );
    }

    pub fn push_err(&self, url: &str, error: TransportError) {
        self.push(url, Err(error));
    }

    /// Answers every request for `url` with `body` once the script runs dry
    pub fn always_ok(&self, url: &str, body: &str) {
        self.sticky.lock().unwrap().insert(
            url.to_string(),
            RawPage {
                status: 200,
                body: body.to_string(),
            },
        );
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .count()
    }

    pub fn call_times(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == url)
            .map(|(_, at)| *at)
            .collect()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<RawPage, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());

        if let Some(response) = scripted {
            return response;
        }

        if let Some(page) = self.sticky.lock().unwrap().get(url) {
            return Ok(page.clone());
        }

        Ok(RawPage {
            status: 404,
            body: String::new(),
        })
    }
}
