//! Location search.

use std::sync::Arc;

use bom_client::{paths, BomClient};
use common::{Location, SearchResponse};
use tracing::{info, warn};

use crate::cache::LocationStore;

/// Turns a search term into a catalog and a selected location.
pub struct LocationResolver {
    client: Arc<BomClient>,
    locations: Arc<LocationStore>,
}

impl LocationResolver {
    pub fn new(client: Arc<BomClient>, locations: Arc<LocationStore>) -> Self {
        Self { client, locations }
    }

    /// Search for `term` and replace the catalog with the results.
    ///
    /// Returns the accepted results; the last one is now selected. An empty
    /// list clears the catalog and keeps the selection. `None` means the
    /// search failed and nothing changed.
    pub async fn resolve(&self, term: &str) -> Option<Vec<Location>> {
        let term = term.trim();
        info!("Searching for location '{}'", term);

        let response: SearchResponse = match self
            .client
            .fetch("location search", paths::LOCATION_SEARCH, Some(term))
            .await
        {
            Some(response) => response,
            None => {
                warn!("Location search for '{}' returned no usable data", term);
                return None;
            }
        };

        let results = response.data;
        if results.is_empty() {
            warn!("Location search for '{}' found nothing", term);
        }

        if let Some(location) = self.locations.replace_catalog(results.clone()).await {
            info!(
                "Selected {} ({}) from {} result(s)",
                location.name,
                location.geohash,
                results.len()
            );
        }
        Some(results)
    }
}
