//! Operator-facing search administration
//!
//! Health and sync statistics, plus background dispatch of indexing runs
//! whose status is polled by task id.

mod service;
mod tasks;

pub use service::{
    ActionRequest, ActionResponse, AdminAction, AdminService, IndexStats, SearchStats,
};
pub use tasks::{TaskHandle, TaskManager, TaskState, TaskStatus};
