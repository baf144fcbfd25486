//! Courier location directory.
//!
//! City, zone and area lists change rarely, so they are cached in memory
//! (`moka`, TTL from `PATHAO_LOCATION_CACHE_SECS`). A courier failure is
//! never cached.

use std::sync::Arc;
use std::time::Duration;

use crumb_core::{AreaId, CityId, DeliverySelection, ZoneId};
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument};

use super::ServiceError;
use crate::courier::{Area, City, Courier, CourierError, Zone};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum LocationKey {
    Cities,
    Zones(CityId),
    Areas(ZoneId),
}

#[derive(Debug, Clone)]
enum LocationValue {
    Cities(Arc<Vec<City>>),
    Zones(Arc<Vec<Zone>>),
    Areas(Arc<Vec<Area>>),
}

/// A delivery selection checked against the courier's hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocation {
    pub city: City,
    pub zone: Zone,
    pub area: Area,
}

/// Cached view over the courier's city → zone → area hierarchy.
#[derive(Clone)]
pub struct LocationDirectory {
    inner: Arc<LocationDirectoryInner>,
}

struct LocationDirectoryInner {
    courier: Arc<dyn Courier>,
    cache: Cache<LocationKey, LocationValue>,
}

impl LocationDirectory {
    /// Create a directory whose entries live for `ttl`.
    #[must_use]
    pub fn new(courier: Arc<dyn Courier>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(2_000)
            .time_to_live(ttl)
            .build();

        Self {
            inner: Arc::new(LocationDirectoryInner { courier, cache }),
        }
    }

    /// All cities.
    ///
    /// # Errors
    ///
    /// Returns `CourierError` if the list is not cached and the courier call fails.
    pub async fn cities(&self) -> Result<Arc<Vec<City>>, CourierError> {
        if let Some(LocationValue::Cities(cities)) = self.inner.cache.get(&LocationKey::Cities).await {
            debug!("Cache hit for cities");
            return Ok(cities);
        }

        let cities = Arc::new(self.inner.courier.cities().await?);
        self.inner
            .cache
            .insert(LocationKey::Cities, LocationValue::Cities(Arc::clone(&cities)))
            .await;
        Ok(cities)
    }

    /// Zones of a city.
    ///
    /// # Errors
    ///
    /// Returns `CourierError` if the list is not cached and the courier call fails.
    pub async fn zones(&self, city_id: CityId) -> Result<Arc<Vec<Zone>>, CourierError> {
        let key = LocationKey::Zones(city_id);
        if let Some(LocationValue::Zones(zones)) = self.inner.cache.get(&key).await {
            debug!(%city_id, "Cache hit for zones");
            return Ok(zones);
        }

        let zones = Arc::new(self.inner.courier.zones(city_id).await?);
        self.inner
            .cache
            .insert(key, LocationValue::Zones(Arc::clone(&zones)))
            .await;
        Ok(zones)
    }

    /// Areas of a zone.
    ///
    /// # Errors
    ///
    /// Returns `CourierError` if the list is not cached and the courier call fails.
    pub async fn areas(&self, zone_id: ZoneId) -> Result<Arc<Vec<Area>>, CourierError> {
        let key = LocationKey::Areas(zone_id);
        if let Some(LocationValue::Areas(areas)) = self.inner.cache.get(&key).await {
            debug!(%zone_id, "Cache hit for areas");
            return Ok(areas);
        }

        let areas = Arc::new(self.inner.courier.areas(zone_id).await?);
        self.inner
            .cache
            .insert(key, LocationValue::Areas(Arc::clone(&areas)))
            .await;
        Ok(areas)
    }

    /// Check that `selection` names a real (city, zone, area) chain.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if any level is unknown or does not
    /// belong to its parent, `ServiceError::Courier` if a lookup fails.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        selection: &DeliverySelection,
    ) -> Result<ResolvedLocation, ServiceError> {
        let city = find(self.cities().await?.as_slice(), |c: &City| c.id == selection.city_id)
            .ok_or_else(|| unknown("city", selection.city_id.as_i64(), None))?;

        let zone = find(self.zones(city.id).await?.as_slice(), |z: &Zone| z.id == selection.zone_id)
            .ok_or_else(|| {
                unknown("zone", selection.zone_id.as_i64(), Some(("city", city.id.as_i64())))
            })?;

        let area = find(self.areas(zone.id).await?.as_slice(), |a: &Area| {
            a.id == selection.area_id
        })
        .ok_or_else(|| {
            unknown("area", selection.area_id.as_i64(), Some(("zone", zone.id.as_i64())))
        })?;

        Ok(ResolvedLocation { city, zone, area })
    }

    /// Drop every cached list.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

fn find<T: Clone>(items: &[T], pred: impl Fn(&T) -> bool) -> Option<T> {
    items.iter().find(|item| pred(item)).cloned()
}

fn unknown(level: &str, id: i64, parent: Option<(&str, i64)>) -> ServiceError {
    let message = match parent {
        Some((parent_level, parent_id)) => {
            format!("delivery {level} {id} is not in {parent_level} {parent_id}")
        }
        None => format!("delivery {level} {id} is not served by the courier"),
    };
    ServiceError::Validation(message)
}
