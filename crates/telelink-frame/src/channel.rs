//! Channel identifiers carried in the first payload field.
//!
//! Identifiers are the CAN-style ids used by the vehicle controller.
//! Anything outside this list is still decoded and surfaced raw.

/// Rear IMU, or the power-bus summary under the newer wire format.
pub const IMU_REAR: u16 = 0x600;

/// Front IMU.
pub const IMU_FRONT: u16 = 0x610;

/// Motor and power stage temperatures, DC bus, RPM.
pub const POWERTRAIN: u16 = 0x620;

/// Torque request/estimate and pedal positions.
pub const DRIVER_INPUTS: u16 = 0x630;

/// Battery pack current, minimum cell voltage, maximum cell temperature.
pub const ACCUMULATOR: u16 = 0x640;

pub const GPS: u16 = 0x650;

/// Damper travel per corner.
pub const SUSPENSION: u16 = 0x660;

/// Coolant temperatures around inverter and motor.
pub const WATER_TEMPS: u16 = 0x670;

/// Inverter state word and error count.
pub const INVERTER_STATUS: u16 = 0x680;

/// Every channel with a static schema.
pub const KNOWN_CHANNELS: [u16; 9] = [
    IMU_REAR,
    IMU_FRONT,
    POWERTRAIN,
    DRIVER_INPUTS,
    ACCUMULATOR,
    GPS,
    SUSPENSION,
    WATER_TEMPS,
    INVERTER_STATUS,
];

/// Returns true if the id has a static schema.
pub fn is_known(id: u16) -> bool {
    KNOWN_CHANNELS.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_channels_are_recognized() {
        for id in KNOWN_CHANNELS {
            assert!(is_known(id));
        }
        assert!(!is_known(0x6FF));
        assert!(!is_known(0));
    }
}
