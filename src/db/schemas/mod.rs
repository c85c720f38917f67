//! Database schemas
//!
//! MongoDB document structures for issues, upvotes, comments, communities,
//! authority users, and news items.

mod authority;
mod comment;
mod community;
mod issue;
mod news;
mod upvote;

pub use authority::{AuthorityDoc, AUTHORITY_COLLECTION};
pub use comment::{CommentDoc, COMMENT_COLLECTION};
pub use community::{CommunityDoc, COMMUNITY_COLLECTION};
pub use issue::{IssueDoc, IssueStatus, ISSUE_COLLECTION};
pub use news::{NewsDoc, NEWS_COLLECTION};
pub use upvote::{UpvoteDoc, UPVOTE_COLLECTION};
