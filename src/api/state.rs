use std::sync::Arc;

use crate::geocode::Geocoder;
use crate::ledger::FriendLedger;
use crate::models::GeoSnapshot;
use crate::storage::StorageConfig;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageConfig>,
    pub ledger: Arc<tokio::sync::RwLock<FriendLedger>>,
    pub geo: Arc<tokio::sync::RwLock<GeoSnapshot>>,
    pub geocoder: Arc<dyn Geocoder>,
}
