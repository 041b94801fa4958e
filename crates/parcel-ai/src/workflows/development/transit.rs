use super::domain::{Coordinates, DistanceBasis, ServiceLevel, TransitProfile};
use super::rulebook::{MunicipalityProfile, RegulatoryTables};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Distance to the nearest rapid-transit station, or an explicit reason it is not known.
///
/// Only a measured distance establishes TOD proximity; a placeholder is reported but grants no
/// tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitDistance {
    Measured(f64),
    Placeholder(f64),
    Unknown,
}

impl TransitDistance {
    pub fn meters(self) -> Option<f64> {
        match self {
            Self::Measured(m) | Self::Placeholder(m) => Some(m),
            Self::Unknown => None,
        }
    }

    /// Distance that may be used to place the parcel in a TOD band.
    pub fn qualifying_meters(self) -> Option<f64> {
        match self {
            Self::Measured(m) => Some(m),
            Self::Placeholder(_) | Self::Unknown => None,
        }
    }

    pub fn basis(self) -> DistanceBasis {
        match self {
            Self::Measured(_) => DistanceBasis::Measured,
            Self::Placeholder(_) => DistanceBasis::Placeholder,
            Self::Unknown => DistanceBasis::Unknown,
        }
    }
}

/// Replaceable source of rapid-transit distances.
pub trait DistanceSource: Send + Sync {
    fn rapid_transit_distance(
        &self,
        tables: &dyn RegulatoryTables,
        municipality: &MunicipalityProfile,
        location: Option<Coordinates>,
    ) -> TransitDistance;
}

/// Measures against the rule book's station list. Without coordinates, or in a municipality the
/// rule book lists without rapid transit, the distance is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct StationDistanceSource;

impl DistanceSource for StationDistanceSource {
    fn rapid_transit_distance(
        &self,
        tables: &dyn RegulatoryTables,
        municipality: &MunicipalityProfile,
        location: Option<Coordinates>,
    ) -> TransitDistance {
        let Some(point) = location.filter(|_| municipality.rapid_transit) else {
            return TransitDistance::Unknown;
        };

        tables
            .rapid_transit_stations()
            .iter()
            .map(|station| {
                haversine_m(
                    point,
                    Coordinates {
                        latitude: station.latitude,
                        longitude: station.longitude,
                    },
                )
            })
            .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))))
            .map_or(TransitDistance::Unknown, TransitDistance::Measured)
    }
}

/// Fixed distance, for callers that already know the walking distance.
#[derive(Debug, Clone, Copy)]
pub struct FixedDistance(pub TransitDistance);

impl DistanceSource for FixedDistance {
    fn rapid_transit_distance(
        &self,
        _tables: &dyn RegulatoryTables,
        _municipality: &MunicipalityProfile,
        _location: Option<Coordinates>,
    ) -> TransitDistance {
        self.0
    }
}

pub fn classify_transit(
    tables: &dyn RegulatoryTables,
    distances: &dyn DistanceSource,
    municipality: &str,
    location: Option<Coordinates>,
) -> TransitProfile {
    let Some(profile) = tables.municipality(municipality) else {
        return TransitProfile::not_served(municipality);
    };

    let distance = distances.rapid_transit_distance(tables, profile, location);
    let (within_200, within_400, within_800) = match distance.qualifying_meters() {
        Some(m) => rapid_bands(m),
        None => (false, false, false),
    };

    let service_level = if within_800 {
        ServiceLevel::Rapid
    } else if profile.frequent_transit {
        ServiceLevel::Frequent
    } else if profile.route_count > 0 {
        ServiceLevel::Basic
    } else {
        ServiceLevel::None
    };

    TransitProfile {
        municipality: profile.name.clone(),
        rapid_transit_200m: within_200,
        rapid_transit_400m: within_400,
        rapid_transit_800m: within_800,
        station_type: profile.station_type.clone().filter(|_| within_800),
        station_frequency: profile.station_frequency.clone().filter(|_| within_800),
        frequent_transit_400m: profile.frequent_transit,
        service_level,
        route_count: profile.route_count,
        rapid_transit_distance_m: distance.meters(),
        distance_basis: distance.basis(),
    }
}

/// Build a profile from a known distance; used by callers with their own geometry.
pub fn profile_from_distance(
    municipality: &str,
    rapid_transit_distance_m: Option<f64>,
    frequent_transit_400m: bool,
) -> TransitProfile {
    let mut profile = TransitProfile::not_served(municipality);
    if let Some(m) = rapid_transit_distance_m {
        let (within_200, within_400, within_800) = rapid_bands(m);
        profile.rapid_transit_200m = within_200;
        profile.rapid_transit_400m = within_400;
        profile.rapid_transit_800m = within_800;
        profile.rapid_transit_distance_m = Some(m);
        profile.distance_basis = DistanceBasis::Measured;
    }
    profile.frequent_transit_400m = frequent_transit_400m;
    profile.service_level = if profile.rapid_transit_800m {
        ServiceLevel::Rapid
    } else if frequent_transit_400m {
        ServiceLevel::Frequent
    } else {
        ServiceLevel::None
    };
    profile
}

fn rapid_bands(meters: f64) -> (bool, bool, bool) {
    if !meters.is_finite() || meters < 0.0 {
        return (false, false, false);
    }
    (meters <= 200.0, meters <= 400.0, meters <= 800.0)
}

pub(crate) fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
