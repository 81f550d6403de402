//! Status source trait
//!
//! The poller asks a `StatusSource` for the current state of a task. The API
//! client implements it over HTTP; tests implement it with scripted replies.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use tempt_core::models::TaskStatusReport;

#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of one generation task.
    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatusReport>;
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatusReport> {
        (**self).fetch_status(task_id).await
    }
}
