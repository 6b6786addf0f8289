use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::urls::Urls;
use crate::vocabulary::Vocabularies;

pub type SafeDb = dyn Db + Send + Sync;

/// Everything a handler needs, cloned into each request.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<SafeDb>,
    pub urls: Arc<Urls>,
    pub vocabularies: Arc<Vocabularies>,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<SafeDb>,
        urls: Arc<Urls>,
        vocabularies: Arc<Vocabularies>,
    ) -> Self {
        Self {
            logger,
            db,
            urls,
            vocabularies,
        }
    }
}
