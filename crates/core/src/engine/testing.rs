//! Test doubles shared by the engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Barrier;

use super::CacheEngine;
use crate::cache::CacheDb;
use crate::config::AppConfig;
use crate::request::{Request, RequestMode, Response};
use crate::{Error, Fetcher};

/// Config pointing at fake hosts with a fixed cache-busting token.
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        origin: "https://quiz.example/".into(),
        cdn_base: "https://cdn.example.com/".into(),
        cache_bust_token: Some("1700000000000".into()),
        ..Default::default()
    }
}

pub(crate) async fn engine<F: Fetcher>(config: AppConfig, fetcher: F) -> CacheEngine<F> {
    let db = CacheDb::open_in_memory().await.unwrap();
    CacheEngine::new(config, db, fetcher).unwrap()
}

/// Answers from a fixed URL → response table; unknown URLs reject as if
/// offline. Records every call.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    responses: HashMap<String, Response>,
    reject_after: Option<usize>,
    calls: Mutex<Vec<(String, RequestMode)>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, url: &str, status: u16, body: &'static str) -> Self {
        self.respond_with(url, Response::new(status, vec![], body))
    }

    pub(crate) fn respond_with(mut self, url: &str, response: Response) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Reject every call once `n` calls have been made.
    pub(crate) fn reject_after(mut self, n: usize) -> Self {
        self.reject_after = Some(n);
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn modes(&self) -> Vec<RequestMode> {
        self.calls.lock().unwrap().iter().map(|(_, m)| *m).collect()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request, mode: RequestMode) -> Result<Response, Error> {
        let url = request.url.to_string();
        let made = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((url.clone(), mode));
            calls.len()
        };

        if self.reject_after.is_some_and(|n| made > n) {
            return Err(Error::Network(format!("offline: {url}")));
        }

        self.responses
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("connection refused: {url}")))
    }
}

/// Holds every fetch at a barrier until `n` fetches are in flight, then
/// answers 200. A caller that fetches one at a time never gets past the first.
pub(crate) struct GateFetcher {
    gate: Barrier,
    modes: Mutex<Vec<RequestMode>>,
}

impl GateFetcher {
    pub(crate) fn new(n: usize) -> Self {
        Self { gate: Barrier::new(n), modes: Mutex::new(Vec::new()) }
    }

    pub(crate) fn modes(&self) -> Vec<RequestMode> {
        self.modes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for GateFetcher {
    async fn fetch(&self, _request: &Request, mode: RequestMode) -> Result<Response, Error> {
        self.modes.lock().unwrap().push(mode);
        self.gate.wait().await;
        Ok(Response::new(200, vec![], "ok"))
    }
}
