//! Scripted transport shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http_client::{
    HttpClient, HttpRequest, HttpResponse, TransportError, TransportErrorKind, TransportFuture,
};

type Outcome = Result<HttpResponse, TransportError>;

struct Route {
    url_fragment: String,
    outcomes: VecDeque<Outcome>,
}

/// Replays canned outcomes per URL fragment and records every request.
/// The last outcome of a route repeats once the script runs dry.
pub(crate) struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on(self, url_fragment: &str, outcomes: Vec<Outcome>) -> Self {
        assert!(!outcomes.is_empty(), "a route needs at least one outcome");
        self.routes
            .lock()
            .expect("route table should not be poisoned")
            .push(Route {
                url_fragment: url_fragment.to_owned(),
                outcomes: outcomes.into(),
            });
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }

    pub(crate) fn count_matching(&self, url_fragment: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(url_fragment))
            .count()
    }

    fn next_outcome(&self, url: &str) -> Outcome {
        let mut routes = self
            .routes
            .lock()
            .expect("route table should not be poisoned");
        let Some(route) = routes
            .iter_mut()
            .find(|route| url.contains(&route.url_fragment))
        else {
            return Err(TransportError::new(
                TransportErrorKind::InvalidRequest,
                format!("no scripted route for {url}"),
            ));
        };

        if route.outcomes.len() > 1 {
            route.outcomes.pop_front().expect("checked non-empty")
        } else {
            route.outcomes.front().cloned().expect("routes are never empty")
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
        let outcome = self.next_outcome(&request.url);
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
        Box::pin(async move { outcome })
    }
}

pub(crate) fn json(status: u16, body: serde_json::Value) -> Outcome {
    Ok(HttpResponse::new(status, body.to_string()))
}

pub(crate) fn transport_failure() -> Outcome {
    Err(TransportError::new(TransportErrorKind::Connect, "connection reset by peer"))
}
