//! Register value helpers

use std::collections::BTreeMap;

/// Register values keyed by register address, in address order
pub type RegisterMap = BTreeMap<u16, u16>;

/// Reinterpret a raw register value as a two's-complement 16-bit integer
///
/// Inverters report signed quantities (battery current, grid power flowing
/// back, temperatures below zero) in plain unsigned registers.
pub fn signed_to_float(value: u16) -> f64 {
    f64::from(value as i16)
}
