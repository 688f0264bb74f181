use crate::auth::TokenVerifier;
use crate::items::OwnedItems;
use crate::store::ItemStore;
use std::sync::Arc;

/// Shared application state: the collaborators every route depends on
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Item operations scoped through the shared store
    pub fn items(&self) -> OwnedItems {
        OwnedItems::new(Arc::clone(&self.store))
    }
}
