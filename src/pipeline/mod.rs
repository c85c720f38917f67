//! Issue mutation pipeline
//!
//! Orchestrates create/upvote/comment/status-update against the record
//! store, enforcing community and authority invariants.

mod community;
mod issues;

pub use community::resolve_community;
pub use issues::{IssuePipeline, IssueRecord, NewIssue};
