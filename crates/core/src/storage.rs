// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! JSON file-based storage
//!
//! One document per record, laid out as `<base>/<kind>/<id>.json`.
//! Kinds in use: `job`, `admin_job`, `operation`, `queue`, `order`,
//! `history`.

use crate::job::{Job, JobHistory, JobTable};
use crate::operation::Operation;
use crate::queue::QueueEntry;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
}

/// JSON file-based storage
#[derive(Clone)]
pub struct JsonStore {
    base_path: PathBuf,
}

impl JsonStore {
    /// Open a store at the given path
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Open a temporary store for testing
    pub fn open_temp() -> Result<Self, StorageError> {
        let temp_dir = std::env::temp_dir().join(format!("warden-test-{}", uuid::Uuid::new_v4()));
        Self::open(temp_dir)
    }

    /// Save a value to storage
    pub fn save<T: Serialize>(&self, kind: &str, id: &str, data: &T) -> Result<(), StorageError> {
        let path = self.path_for(kind, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Load a value from storage
    pub fn load<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<T, StorageError> {
        let path = self.path_for(kind, id);
        if !path.exists() {
            return Err(StorageError::NotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Delete a value from storage. Returns whether this call removed
    /// the record: a `false` means another deleter won the race, so the
    /// caller must not act on the record's behalf.
    pub fn delete(&self, kind: &str, id: &str) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(kind, id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List all IDs of a given kind
    pub fn list(&self, kind: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.base_path.join(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().to_string());
                }
            }
        }
        Ok(ids)
    }

    /// Load every record of a kind. Records that no longer deserialize
    /// are skipped rather than poisoning the whole scan.
    pub fn load_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>, StorageError> {
        let mut records = Vec::new();
        for id in self.list(kind)? {
            match self.load(kind, &id) {
                Ok(record) => records.push(record),
                Err(StorageError::Json(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Check if a value exists
    pub fn exists(&self, kind: &str, id: &str) -> bool {
        self.path_for(kind, id).exists()
    }

    fn path_for(&self, kind: &str, id: &str) -> PathBuf {
        self.base_path.join(kind).join(format!("{}.json", id))
    }

    // Convenience methods for common types

    /// Save a job into its table
    pub fn save_job(&self, job: &Job) -> Result<(), StorageError> {
        self.save(job.table.kind(), &job.id.0, job)
    }

    /// Load a job from a table
    pub fn load_job(&self, table: JobTable, id: &str) -> Result<Job, StorageError> {
        self.load(table.kind(), id)
    }

    /// Delete a job from a table
    pub fn delete_job(&self, table: JobTable, id: &str) -> Result<bool, StorageError> {
        self.delete(table.kind(), id)
    }

    /// Load every job in a table
    pub fn list_jobs(&self, table: JobTable) -> Result<Vec<Job>, StorageError> {
        self.load_all(table.kind())
    }

    /// Save an operation
    pub fn save_operation(&self, operation: &Operation) -> Result<(), StorageError> {
        self.save("operation", &operation.id.0, operation)
    }

    /// Load an operation
    pub fn load_operation(&self, id: &str) -> Result<Operation, StorageError> {
        self.load("operation", id)
    }

    /// Load every operation
    pub fn list_operations(&self) -> Result<Vec<Operation>, StorageError> {
        self.load_all("operation")
    }

    /// Save a queue entry
    pub fn save_entry(&self, entry: &QueueEntry) -> Result<(), StorageError> {
        self.save("queue", &entry.id.0, entry)
    }

    /// Load a queue entry
    pub fn load_entry(&self, id: &str) -> Result<QueueEntry, StorageError> {
        self.load("queue", id)
    }

    /// Delete a queue entry, claiming it: `true` only for the one
    /// caller that actually removed it
    pub fn delete_entry(&self, id: &str) -> Result<bool, StorageError> {
        self.delete("queue", id)
    }

    /// Load every queue entry
    pub fn list_entries(&self) -> Result<Vec<QueueEntry>, StorageError> {
        self.load_all("queue")
    }

    /// Save a job's history mirror, keyed by the job id (1:1)
    pub fn save_history(&self, history: &JobHistory) -> Result<(), StorageError> {
        self.save("history", &history.job_id.0, history)
    }

    /// Load one job's history mirror
    pub fn load_history(&self, job_id: &str) -> Result<JobHistory, StorageError> {
        self.load("history", job_id)
    }

    /// Load every job history mirror
    pub fn list_history(&self) -> Result<Vec<JobHistory>, StorageError> {
        self.load_all("history")
    }

    /// Load an agent's order counter, zero when absent
    pub fn load_order_counter(&self, agent_id: &str) -> Result<u64, StorageError> {
        match self.load("order", agent_id) {
            Ok(n) => Ok(n),
            Err(StorageError::NotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Persist an agent's order counter
    pub fn save_order_counter(&self, agent_id: &str, value: u64) -> Result<(), StorageError> {
        self.save("order", agent_id, &value)
    }
}
