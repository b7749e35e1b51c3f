//! Real UK postcodes with approximate centroid coordinates.

/// A postcode and where it is.
#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub postcode: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub const fn new(postcode: &'static str, lat: f64, lng: f64) -> Self {
        Self { postcode, lat, lng }
    }
}

// ============================================================================
// Central London
// ============================================================================

pub const BUCKINGHAM_PALACE: Place = Place::new("SW1A 1AA", 51.5010, -0.1416);
pub const DOWNING_STREET: Place = Place::new("SW1A 2AA", 51.5034, -0.1276);
pub const WESTMINSTER: Place = Place::new("SW1P 3BU", 51.4966, -0.1300);
pub const KINGS_CROSS: Place = Place::new("N1C 4AG", 51.5347, -0.1246);

// ============================================================================
// Home counties
// ============================================================================

pub const GUILDFORD: Place = Place::new("GU1 3AA", 51.2362, -0.5704);
pub const READING: Place = Place::new("RG1 1AF", 51.4560, -0.9717);
pub const BRIGHTON: Place = Place::new("BN1 1AE", 50.8225, -0.1372);

// ============================================================================
// Far away
// ============================================================================

pub const MANCHESTER: Place = Place::new("M1 1AE", 53.4808, -2.2426);
pub const EDINBURGH: Place = Place::new("EH1 1YZ", 55.9533, -3.1883);

pub const ALL: &[Place] = &[
    BUCKINGHAM_PALACE,
    DOWNING_STREET,
    WESTMINSTER,
    KINGS_CROSS,
    GUILDFORD,
    READING,
    BRIGHTON,
    MANCHESTER,
    EDINBURGH,
];
