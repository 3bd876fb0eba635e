#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{collections::VecDeque, sync::Mutex};

use {
    async_trait::async_trait,
    courier_common::{AssetKind, Markup, RecipientId},
    tokio::time::Instant,
};

use crate::transport::{MediaSource, Transport, TransportError};

#[derive(Debug, Clone)]
pub enum CallKind {
    Media {
        kind: AssetKind,
        source: MediaSource,
        caption: Option<String>,
    },
    Text {
        text: String,
        has_markup: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Call {
    pub at: Instant,
    pub to: RecipientId,
    pub kind: CallKind,
}

/// Scripted transport. Queued results are consumed in order; once a queue
/// is empty media sends succeed with `issued-<n>` and text sends succeed.
#[derive(Default)]
pub struct FakeTransport {
    media_results: Mutex<VecDeque<Result<Option<String>, TransportError>>>,
    text_results: Mutex<VecDeque<Result<(), TransportError>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_media(&self, result: Result<Option<String>, TransportError>) -> &Self {
        self.media_results.lock().unwrap().push_back(result);
        self
    }

    pub fn push_text(&self, result: Result<(), TransportError>) -> &Self {
        self.text_results.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn media_sources(&self) -> Vec<MediaSource> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c.kind {
                CallKind::Media { source, .. } => Some(source),
                CallKind::Text { .. } => None,
            })
            .collect()
    }

    pub fn texts_to(&self, to: RecipientId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.to == to)
            .filter_map(|c| match c.kind {
                CallKind::Text { text, .. } => Some(text),
                CallKind::Media { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_media(
        &self,
        to: RecipientId,
        kind: AssetKind,
        source: MediaSource,
        caption: Option<&str>,
        _markup: Option<&Markup>,
    ) -> Result<Option<String>, TransportError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call {
                at: Instant::now(),
                to,
                kind: CallKind::Media {
                    kind,
                    source,
                    caption: caption.map(str::to_string),
                },
            });
            calls.len()
        };
        self.media_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(format!("issued-{n}"))))
    }

    async fn send_text(
        &self,
        to: RecipientId,
        text: &str,
        markup: Option<&Markup>,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call {
            at: Instant::now(),
            to,
            kind: CallKind::Text {
                text: text.to_string(),
                has_markup: markup.is_some(),
            },
        });
        self.text_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}
