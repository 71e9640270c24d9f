//! Scripted stand-ins for the harvest seams, shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::harvest::client::ResultShape;
use crate::harvest::traits::{ApiFailure, ClientFactory, Clock, SearchClient, Sleeper};
use crate::model::{Credential, SearchResponse, Seed};

/// One recorded `fetch_related` call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub key: String,
    pub seed: String,
    pub shape: ResultShape,
}

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<SearchResponse, ApiFailure>>,
    calls: Vec<Call>,
    connects: Vec<String>,
}

/// Factory whose clients answer from a shared queue of replies, then with
/// empty batches once the queue runs dry.
#[derive(Clone, Default)]
pub(crate) struct ScriptedFactory {
    script: Arc<Mutex<Script>>,
}

impl ScriptedFactory {
    pub fn reply(&self, reply: Result<SearchResponse, ApiFailure>) -> &Self {
        self.script.lock().unwrap().replies.push_back(reply);
        self
    }

    pub fn reply_n(&self, n: usize, failure: ApiFailure) -> &Self {
        for _ in 0..n {
            self.reply(Err(failure.clone()));
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Keys passed to `connect`, in order.
    pub fn connects(&self) -> Vec<String> {
        self.script.lock().unwrap().connects.clone()
    }
}

pub(crate) struct ScriptedClient {
    key: String,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl SearchClient for ScriptedClient {
    async fn fetch_related(
        &self,
        seed: &Seed,
        _region_code: &str,
        shape: ResultShape,
    ) -> Result<SearchResponse, ApiFailure> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call {
            key: self.key.clone(),
            seed: seed.id.clone(),
            shape,
        });
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::default()))
    }
}

impl ClientFactory for ScriptedFactory {
    type Client = ScriptedClient;

    fn connect(&self, credential: &Credential) -> Result<ScriptedClient, ApiFailure> {
        self.script
            .lock()
            .unwrap()
            .connects
            .push(credential.expose().to_string());
        Ok(ScriptedClient {
            key: credential.expose().to_string(),
            script: self.script.clone(),
        })
    }
}

/// Sleeper that returns immediately and remembers what it was asked for.
#[derive(Clone, Default)]
pub(crate) struct RecordingSleeper {
    pub slept: Arc<Mutex<Vec<Duration>>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub(crate) struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
