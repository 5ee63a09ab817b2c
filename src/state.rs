use std::sync::Arc;

use crate::client::PeerApi;
use crate::gateway::Gateway;
use crate::peer_health::PeerHealth;
use crate::records::{DirectoryLookup, WorkRequestLookup};

// app's shared state
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub records: Arc<dyn WorkRequestLookup>, // backs verify and the work request routes
    pub directory: Arc<dyn DirectoryLookup>,
    pub peer: Option<Arc<PeerApi>>,          // outbound client, when a peer is configured
    pub peer_health: Option<Arc<PeerHealth>>,
}
