use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::app::ports::{GeocodeHit, GeocoderPort};
use crate::config::GeocoderConfig;
use crate::domain::Establishment;
use crate::pipeline::processing::catalog::ChangeSet;
use crate::types::non_blank;

/// Result of one enrichment attempt
#[derive(Debug)]
pub enum GeoOutcome {
    /// Coordinates were found and merged into the establishment
    Located(ChangeSet),
    /// Transport error, bad status, unusable body or no result
    Failed(String),
}

/// Fills in coordinates, region and city of establishments from their
/// address. Failures stay local: they are reported, never raised.
pub struct GeoEnricher {
    geocoder: Arc<dyn GeocoderPort>,
    country: String,
    /// Pause after each successful lookup, for the provider's rate policy
    delay: Duration,
}

impl GeoEnricher {
    pub fn new(geocoder: Arc<dyn GeocoderPort>, config: &GeocoderConfig) -> Self {
        Self {
            geocoder,
            country: config.country.clone(),
            delay: config.delay(),
        }
    }

    /// Only establishments with an address and a missing coordinate are looked up.
    pub fn needs_lookup(establishment: &Establishment) -> bool {
        non_blank(establishment.address.as_deref()).is_some() && !establishment.has_coordinates()
    }

    pub fn build_query(&self, address: &str) -> String {
        let address = address.trim();
        if address
            .to_lowercase()
            .contains(&self.country.to_lowercase())
        {
            address.to_string()
        } else {
            format!("{address}, {}", self.country)
        }
    }

    pub async fn enrich(&self, establishment: &mut Establishment) -> GeoOutcome {
        let Some(address) = non_blank(establishment.address.as_deref()) else {
            return GeoOutcome::Failed("no address".to_string());
        };
        let query = self.build_query(address);

        let hit = match self.geocoder.search(&query).await {
            Ok(hits) => match hits.into_iter().next() {
                Some(hit) => hit,
                None => {
                    warn!(establishment = %establishment.name, %query, "no geocoding result");
                    return GeoOutcome::Failed(format!("no result for '{query}'"));
                }
            },
            Err(e) => {
                warn!(establishment = %establishment.name, %query, error = %e, "geocoding failed");
                return GeoOutcome::Failed(e.to_string());
            }
        };

        let changes = apply_hit(establishment, &hit);
        debug!(
            establishment = %establishment.name,
            lat = hit.latitude,
            lon = hit.longitude,
            "geocoded"
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        GeoOutcome::Located(changes)
    }
}

/// Merge a provider hit: coordinates always, region from `state`, city from
/// the first of `city`, `town`, `village`.
fn apply_hit(establishment: &mut Establishment, hit: &GeocodeHit) -> ChangeSet {
    let mut changes = ChangeSet::default();
    changes.fill_number("latitude", &mut establishment.latitude, Some(hit.latitude));
    changes.fill_number("longitude", &mut establishment.longitude, Some(hit.longitude));
    changes.fill_text("region", &mut establishment.region, hit.state.as_deref());
    let city = [&hit.city, &hit.town, &hit.village]
        .into_iter()
        .find_map(|c| non_blank(c.as_deref()));
    changes.fill_text("city", &mut establishment.city, city);
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocodeError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct StubGeocoder {
        reply: Mutex<Option<std::result::Result<Vec<GeocodeHit>, GeocodeError>>>,
        queries: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        fn new(reply: std::result::Result<Vec<GeocodeHit>, GeocodeError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                queries: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GeocoderPort for StubGeocoder {
        async fn search(&self, query: &str) -> std::result::Result<Vec<GeocodeHit>, GeocodeError> {
            self.queries.lock().unwrap().push(query.to_string());
            self.reply.lock().unwrap().take().unwrap_or(Ok(vec![]))
        }
    }

    fn config() -> GeocoderConfig {
        GeocoderConfig {
            delay_ms: 0,
            ..Default::default()
        }
    }

    fn establishment(address: Option<&str>) -> Establishment {
        Establishment {
            id: Uuid::new_v4(),
            name: "Université de Fianarantsoa".to_string(),
            abbreviation: None,
            category_id: Uuid::new_v4(),
            address: address.map(str::to_string),
            latitude: None,
            longitude: None,
            region: Some("Ancienne région".to_string()),
            city: None,
        }
    }

    #[test]
    fn query_appends_country_once() {
        let enricher = GeoEnricher::new(StubGeocoder::new(Ok(vec![])), &config());
        assert_eq!(enricher.build_query("  Andrainjato "), "Andrainjato, Madagascar");
        assert_eq!(
            enricher.build_query("Andrainjato, MADAGASCAR"),
            "Andrainjato, MADAGASCAR"
        );
    }

    #[test]
    fn lookup_precondition() {
        let mut e = establishment(Some("Andrainjato"));
        assert!(GeoEnricher::needs_lookup(&e));
        e.latitude = Some(-21.45);
        assert!(GeoEnricher::needs_lookup(&e));
        e.longitude = Some(47.08);
        assert!(!GeoEnricher::needs_lookup(&e));
        assert!(!GeoEnricher::needs_lookup(&establishment(Some("  "))));
    }

    #[tokio::test]
    async fn merges_first_hit_with_city_fallback() {
        let geocoder = StubGeocoder::new(Ok(vec![
            GeocodeHit {
                latitude: -21.45,
                longitude: 47.08,
                state: Some("Haute Matsiatra".to_string()),
                city: None,
                town: Some("Fianarantsoa".to_string()),
                village: Some("Andrainjato".to_string()),
            },
            GeocodeHit::default(),
        ]));
        let enricher = GeoEnricher::new(geocoder.clone(), &config());
        let mut e = establishment(Some("Andrainjato"));

        let outcome = enricher.enrich(&mut e).await;

        assert!(matches!(outcome, GeoOutcome::Located(_)));
        assert_eq!((e.latitude, e.longitude), (Some(-21.45), Some(47.08)));
        assert_eq!(e.region.as_deref(), Some("Haute Matsiatra"));
        assert_eq!(e.city.as_deref(), Some("Fianarantsoa"));
        assert_eq!(
            geocoder.queries.lock().unwrap().as_slice(),
            ["Andrainjato, Madagascar".to_string()]
        );
    }

    #[tokio::test]
    async fn provider_errors_are_contained() {
        let enricher = GeoEnricher::new(StubGeocoder::new(Err(GeocodeError::Status(503))), &config());
        let mut e = establishment(Some("Andrainjato"));
        let outcome = enricher.enrich(&mut e).await;
        assert!(matches!(outcome, GeoOutcome::Failed(ref reason) if reason.contains("503")));
        assert_eq!((e.latitude, e.longitude), (None, None));
    }

    #[tokio::test]
    async fn empty_result_is_a_failure() {
        let enricher = GeoEnricher::new(StubGeocoder::new(Ok(vec![])), &config());
        let mut e = establishment(Some("Andrainjato"));
        let outcome = enricher.enrich(&mut e).await;
        assert!(matches!(outcome, GeoOutcome::Failed(ref reason) if reason.starts_with("no result")));
        assert_eq!((e.latitude, e.longitude), (None, None));
        assert_eq!(e.region.as_deref(), Some("Ancienne région"));
    }
}
