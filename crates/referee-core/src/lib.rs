//! Comment/review aggregation and the article approval workflow.
//!
//! Every operation lives on [`Engine`]. Writes run as one storage transaction
//! each; reads assemble a whole view under one connection lock.

pub mod annotations;
pub mod approval;
pub mod comments;
pub mod directory;
pub mod error;
pub mod redact;
pub mod reviews;
pub mod threads;
pub mod votes;

use std::sync::Arc;

use referee_db::Database;

pub use error::{Result, ServiceError};

#[derive(Clone)]
pub struct Engine {
    db: Arc<Database>,
}

impl Engine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
