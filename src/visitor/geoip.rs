//! Offline geolocation using MaxMind GeoLite2/GeoIP2 MMDB files

use anyhow::{Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;

use crate::visitor::geolocation::{GeoError, GeoLookup};
use crate::visitor::models::GeoDetails;

pub const PROVIDER_NAME: &str = "maxmind";

/// Memory-mapped City and ASN databases
#[derive(Clone)]
pub struct MaxMindLookup {
    city_reader: Option<Arc<Reader<Mmap>>>,
    asn_reader: Option<Arc<Reader<Mmap>>>,
}

impl MaxMindLookup {
    /// Open whichever databases are configured
    pub fn new(city_path: Option<&str>, asn_path: Option<&str>) -> Result<Self> {
        let city_reader = if let Some(path) = city_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP City database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        let asn_reader = if let Some(path) = asn_path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP ASN database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self {
            city_reader,
            asn_reader,
        })
    }

    fn lookup_addr(&self, ip: IpAddr) -> GeoDetails {
        let mut details = GeoDetails {
            provider: PROVIDER_NAME.to_string(),
            ..Default::default()
        };

        if let Some(ref reader) = self.city_reader {
            if let Ok(result) = reader.lookup(ip) {
                // Country data is a subset of City, so it decodes from either database
                match result.decode::<geoip2::City>() {
                    Ok(Some(city)) => extract_from_city(&city, &mut details),
                    _ => {
                        if let Ok(Some(country)) = result.decode::<geoip2::Country>() {
                            details.country_code = country.country.iso_code.map(str::to_string);
                            details.country = country.country.names.english.map(str::to_string);
                        }
                    }
                }
            }
        }

        if let Some(ref reader) = self.asn_reader {
            if let Ok(result) = reader.lookup(ip) {
                if let Ok(Some(asn)) = result.decode::<geoip2::Asn>() {
                    let org = asn.autonomous_system_organization.map(str::to_string);
                    details.asn = asn.autonomous_system_number.map(|number| match &org {
                        Some(org) => format!("AS{} {}", number, org),
                        None => format!("AS{}", number),
                    });
                    details.org = org;
                }
            }
        }

        details
    }
}

fn extract_from_city(city: &geoip2::City, details: &mut GeoDetails) {
    details.country_code = city.country.iso_code.map(str::to_string);
    details.country = city.country.names.english.map(str::to_string);

    if let Some(subdivision) = city.subdivisions.first() {
        details.region = subdivision.names.english.map(str::to_string);
    }

    details.city = city.city.names.english.map(str::to_string);
    details.postal = city.postal.code.map(str::to_string);
    details.latitude = city.location.latitude;
    details.longitude = city.location.longitude;
    details.timezone = city.location.time_zone.map(str::to_string);
}

#[async_trait]
impl GeoLookup for MaxMindLookup {
    fn provider(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn lookup(&self, ip: &str) -> Result<GeoDetails, GeoError> {
        let addr = ip
            .parse::<IpAddr>()
            .map_err(|_| GeoError::InvalidIp(ip.to_string()))?;

        let details = self.lookup_addr(addr);
        if details.country.is_none() && details.city.is_none() && details.asn.is_none() {
            return Err(GeoError::NotFound(ip.to_string()));
        }

        Ok(details)
    }
}
