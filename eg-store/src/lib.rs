pub mod db;
pub mod error;
pub mod sentences;
pub mod submissions;
pub mod users;

pub use db::Db;
pub use error::{Result, StoreError};
pub use sentences::{SentenceRow, SentenceStore};
pub use submissions::{NewSubmission, SubmissionRow, SubmissionStore, UserStats};
pub use users::{UserRecord, UserStore};
