use async_trait::async_trait;

use crate::error::GeocodeError;

/// One place returned by a geocoding provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeHit {
    pub latitude: f64,
    pub longitude: f64,
    pub state: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
}

/// Forward geocoding of a free-text address query
#[async_trait]
pub trait GeocoderPort: Send + Sync {
    /// Results in provider order; an empty vector means "no match".
    async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>, GeocodeError>;
}
