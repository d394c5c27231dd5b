//! Scripted in-memory transport

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chemres_core::{HttpError, HttpResponse, HttpTransport};
use tokio::time::Instant;

use super::fixtures::not_found;

pub type Reply = Result<HttpResponse, HttpError>;

type Responder = Box<dyn Fn(&str) -> Reply + Send + Sync>;

struct Route {
    fragment: String,
    replies: VecDeque<Responder>,
}

/// Answers GETs from scripted routes.
///
/// A route matches when its fragment is a substring of the URL; the first
/// registered match wins. Replies queued on a route are used in order and
/// the last one repeats. Unrouted URLs get a PubChem 404 fault.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a fixed reply for URLs containing `fragment`
    pub fn on(self, fragment: impl Into<String>, reply: Reply) -> Self {
        self.on_with(fragment, move |_| reply.clone())
    }

    /// Queue a reply computed from the requested URL
    pub fn on_with<F>(mut self, fragment: impl Into<String>, responder: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        let fragment = fragment.into();
        let routes = self.routes.get_mut().unwrap();
        match routes.iter_mut().find(|r| r.fragment == fragment) {
            Some(route) => route.replies.push_back(Box::new(responder)),
            None => routes.push(Route {
                fragment,
                replies: VecDeque::from([Box::new(responder) as Responder]),
            }),
        }
        self
    }

    /// Every URL requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    /// When each request reached the transport
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_matching(&self, fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u.contains(fragment))
            .count()
    }

    /// Most requests that were ever outstanding at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn reply(&self, url: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|r| url.contains(&r.fragment)) else {
            return Ok(not_found());
        };
        if route.replies.len() > 1 {
            let responder = route.replies.pop_front().unwrap();
            responder(url)
        } else {
            (route.replies[0])(url)
        }
    }
}

impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        let _outstanding = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.reply(url)
    }
}

/// Counts a request as outstanding until dropped, including when the caller
/// abandons the future mid-latency.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let outstanding = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(outstanding, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connection refused
pub fn refused() -> Reply {
    Err(HttpError::Connect {
        message: "Connection refused (os error 111)".to_string(),
    })
}

/// Bare status with an empty body
pub fn status(code: u16) -> Reply {
    Ok(HttpResponse::new(code, ""))
}
