// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Agent directory: who is in a view, who carries a tag
//!
//! The engine never owns agent inventory; it asks a [`Directory`] at
//! dispatch time. A view or tag that resolves to nobody is an empty
//! answer, not an error. Only an unknown view or tag is an error.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("unknown view: {0}")]
    UnknownView(String),
    #[error("unknown tag {tag:?} in view {view:?}")]
    UnknownTag { view: String, tag: String },
}

/// Resolves target selections to concrete agent ids
#[async_trait]
pub trait Directory: Send + Sync {
    /// Every agent in a view
    async fn agents_in_view(&self, view: &str) -> Result<Vec<String>, DirectoryError>;

    /// Every agent carrying a tag within a view
    async fn agents_with_tag(&self, view: &str, tag: &str) -> Result<Vec<String>, DirectoryError>;

    /// Whether these exact agents exist in the view. Unknown ids are
    /// dropped from the answer, not errors: a retired agent must not
    /// block an operation against the rest.
    async fn confirm_agents(
        &self,
        view: &str,
        agent_ids: &[String],
    ) -> Result<Vec<String>, DirectoryError>;
}

#[derive(Debug, Default, Clone)]
struct ViewRecord {
    agents: Vec<String>,
    tags: HashMap<String, Vec<String>>,
}

/// An in-memory directory, seeded up front. Used by tests and by
/// deployments that sync inventory from elsewhere.
#[derive(Clone, Default)]
pub struct StaticDirectory {
    views: Arc<RwLock<HashMap<String, ViewRecord>>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_view(&self, view: &str) {
        self.views
            .write()
            .await
            .entry(view.to_string())
            .or_default();
    }

    pub async fn add_agent(&self, view: &str, agent_id: &str) {
        let mut views = self.views.write().await;
        let record = views.entry(view.to_string()).or_default();
        if !record.agents.iter().any(|a| a == agent_id) {
            record.agents.push(agent_id.to_string());
        }
    }

    pub async fn tag_agent(&self, view: &str, tag: &str, agent_id: &str) {
        let mut views = self.views.write().await;
        let record = views.entry(view.to_string()).or_default();
        if !record.agents.iter().any(|a| a == agent_id) {
            record.agents.push(agent_id.to_string());
        }
        let tagged = record.tags.entry(tag.to_string()).or_default();
        if !tagged.iter().any(|a| a == agent_id) {
            tagged.push(agent_id.to_string());
        }
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn agents_in_view(&self, view: &str) -> Result<Vec<String>, DirectoryError> {
        let views = self.views.read().await;
        views
            .get(view)
            .map(|r| r.agents.clone())
            .ok_or_else(|| DirectoryError::UnknownView(view.to_string()))
    }

    async fn agents_with_tag(&self, view: &str, tag: &str) -> Result<Vec<String>, DirectoryError> {
        let views = self.views.read().await;
        let record = views
            .get(view)
            .ok_or_else(|| DirectoryError::UnknownView(view.to_string()))?;
        record
            .tags
            .get(tag)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownTag {
                view: view.to_string(),
                tag: tag.to_string(),
            })
    }

    async fn confirm_agents(
        &self,
        view: &str,
        agent_ids: &[String],
    ) -> Result<Vec<String>, DirectoryError> {
        let views = self.views.read().await;
        let record = views
            .get(view)
            .ok_or_else(|| DirectoryError::UnknownView(view.to_string()))?;
        Ok(agent_ids
            .iter()
            .filter(|id| record.agents.contains(id))
            .cloned()
            .collect())
    }
}
