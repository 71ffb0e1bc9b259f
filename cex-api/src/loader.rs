//! Fetch orchestration with stale-response discarding.
//!
//! A [`Loader`] tracks the derived selection key a controller last
//! fetched for, plus an epoch counter. Every [`Loader::begin`] bumps the
//! epoch and returns a ticket; a completion presented with a superseded
//! ticket is discarded. The contract is exactly: the most recently
//! issued fetch for a component instance wins, regardless of the order
//! in which responses arrive.

use crate::error::ApiError;
use std::future::Future;

/// Lifecycle of one fetchable resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Nothing fetched yet (or reset after a selection change).
    Idle,
    /// A fetch for the current key is outstanding.
    Loading,
    Loaded(T),
    /// The fetch failed; carries the user-facing placeholder message.
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

/// Ticket identifying one issued fetch. Completions are only applied
/// while their ticket is still the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
}

/// Keyed, epoch-guarded fetch state for one resource owned by one
/// controller.
#[derive(Debug)]
pub struct Loader<K, T> {
    key: Option<K>,
    epoch: u64,
    state: LoadState<T>,
}

impl<K, T> Default for Loader<K, T> {
    fn default() -> Self {
        Loader { key: None, epoch: 0, state: LoadState::Idle }
    }
}

impl<K: PartialEq, T> Loader<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Whether the derived key has changed since the last issued fetch.
    pub fn needs_fetch(&self, key: &K) -> bool {
        self.key.as_ref() != Some(key)
    }

    /// Record that a fetch for `key` is being issued: the state becomes
    /// `Loading` and every previously issued ticket is superseded.
    pub fn begin(&mut self, key: K) -> FetchTicket {
        self.key = Some(key);
        self.epoch += 1;
        self.state = LoadState::Loading;
        FetchTicket { epoch: self.epoch }
    }

    /// Whether a ticket is still the latest issued fetch.
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Apply a fetch completion. Superseded tickets are discarded and
    /// leave the state untouched; returns whether the result was
    /// applied.
    pub fn complete(&mut self, ticket: FetchTicket, result: Result<T, ApiError>) -> bool {
        if !self.is_current(ticket) {
            log::debug!("discarding superseded fetch completion");
            return false;
        }
        self.state = match result {
            Ok(value) => LoadState::Loaded(value),
            Err(e) => LoadState::Failed(e.display_message()),
        };
        true
    }

    /// Forget the current key and result, returning to `Idle`. Used when
    /// the owning selection is torn down rather than changed.
    pub fn reset(&mut self) {
        self.key = None;
        self.state = LoadState::Idle;
        self.epoch += 1;
    }

    /// Drive a future through the guard: begin, await, complete. The
    /// epoch check still applies, so a `reset` (or another `begin` from
    /// the same owner) issued before the future resolves discards its
    /// result.
    pub async fn load_with<F>(&mut self, key: K, fetch: F) -> bool
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let ticket = self.begin(key);
        let result = fetch.await;
        self.complete(ticket, result)
    }
}
