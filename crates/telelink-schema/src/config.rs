/// Controls how records map onto channel schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperConfig {
    /// When true, `0x600` records read with the NEW layout use the power-bus
    /// schema; when false they are always read as the rear IMU.
    pub power_bus_on_new_format: bool,
    /// When true, channels with compatibility aliases also update the
    /// legacy-named keys older consumers read.
    pub compat_aliases: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            power_bus_on_new_format: true,
            compat_aliases: true,
        }
    }
}
