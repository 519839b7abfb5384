use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::clock::Clock;
use crate::services::loyalty::LoyaltyAwarder;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub clock: Box<dyn Clock>,
    pub loyalty: Box<dyn LoyaltyAwarder>,
}
