use telelink_frame::{
    FormatTag, ACCUMULATOR, DRIVER_INPUTS, GPS, IMU_FRONT, IMU_REAR, INVERTER_STATUS, POWERTRAIN,
    SUSPENSION, WATER_TEMPS,
};

use crate::config::MapperConfig;
use crate::error::{Result, SchemaError};

/// How a raw value becomes a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Stored as received.
    Value,
    /// Clamped to `[0, 100]`. Out-of-range values are clamped, never rejected.
    Percent,
}

impl FieldKind {
    pub fn apply(self, raw: f32) -> f32 {
        match self {
            FieldKind::Value => raw,
            FieldKind::Percent => raw.clamp(0.0, 100.0),
        }
    }
}

/// One positional field of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Copies fields from one channel into a legacy-named channel.
///
/// The target is updated read-modify-write: fields not listed keep their
/// previously cached values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub target: u16,
    /// `(source field, target field)` pairs.
    pub fields: &'static [(&'static str, &'static str)],
}

/// Static schema for one channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSchema {
    pub id: u16,
    /// Display name, also used as the measurement name by persistence.
    pub name: &'static str,
    /// Fields in wire order, starting at `v1`.
    pub fields: &'static [FieldSpec],
    pub aliases: &'static [Alias],
}

impl ChannelSchema {
    /// Find a field's spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

const fn value(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Value,
    }
}

const fn percent(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Percent,
    }
}

const IMU_FIELDS: &[FieldSpec] = &[
    value("ax"),
    value("ay"),
    value("az"),
    value("wx"),
    value("wy"),
    value("wz"),
];

/// Every channel with a fixed schema, keyed by id.
pub static CHANNELS: [ChannelSchema; 9] = [
    ChannelSchema {
        id: IMU_REAR,
        name: "IMU_REAR",
        fields: IMU_FIELDS,
        aliases: &[],
    },
    ChannelSchema {
        id: IMU_FRONT,
        name: "IMU_FRONT",
        fields: IMU_FIELDS,
        aliases: &[],
    },
    ChannelSchema {
        id: POWERTRAIN,
        name: "POWERTRAIN",
        fields: &[
            value("motor_temp"),
            value("pwrstg_temp"),
            value("board1_temp"),
            value("board2_temp"),
            value("dc_bus_voltage"),
            value("dc_bus_power"),
            value("motor_rpm"),
        ],
        aliases: &[],
    },
    ChannelSchema {
        id: DRIVER_INPUTS,
        name: "DRIVER_INPUTS",
        fields: &[
            value("torque_req"),
            value("torque_est"),
            percent("throttle"),
            percent("brake"),
        ],
        aliases: &[],
    },
    ChannelSchema {
        id: ACCUMULATOR,
        name: "ACCUMULATOR",
        fields: &[
            value("current_sensor"),
            value("cell_min_v"),
            value("cell_max_temp"),
        ],
        aliases: &[],
    },
    ChannelSchema {
        id: GPS,
        name: "GPS",
        fields: &[value("speed"), value("lat"), value("long"), value("alt")],
        aliases: &[],
    },
    ChannelSchema {
        id: SUSPENSION,
        name: "SUSPENSION",
        fields: &[value("FR"), value("FL"), value("RR"), value("RL")],
        aliases: &[],
    },
    ChannelSchema {
        id: WATER_TEMPS,
        name: "WATER_TEMPS",
        fields: &[
            value("inverter_in"),
            value("inverter_out"),
            value("motor_in"),
            value("motor_out"),
        ],
        aliases: &[],
    },
    ChannelSchema {
        id: INVERTER_STATUS,
        name: "INVERTER_STATUS",
        fields: &[value("status"), value("errors")],
        aliases: &[],
    },
];

/// `0x600` as sent by transmitters using the NEW layout: a power-bus
/// summary instead of the rear IMU.
///
/// Dashboards written against the older layout read the DC bus from
/// `POWERTRAIN` and the minimum cell voltage from `ACCUMULATOR`, so those
/// keys are kept current through aliases.
pub static POWER_BUS: ChannelSchema = ChannelSchema {
    id: IMU_REAR,
    name: "POWER_BUS",
    fields: &[
        value("dc_bus_voltage"),
        value("dc_bus_power"),
        value("rpm"),
        value("torque_total"),
        value("cell_min_v"),
        value("throttle_raw1"),
        value("throttle_raw2"),
    ],
    aliases: &[
        Alias {
            target: POWERTRAIN,
            fields: &[
                ("dc_bus_voltage", "dc_bus_voltage"),
                ("dc_bus_power", "dc_bus_power"),
                ("rpm", "motor_rpm"),
            ],
        },
        Alias {
            target: ACCUMULATOR,
            fields: &[("cell_min_v", "cell_min_v")],
        },
    ],
};

/// Resolve the schema for a channel id as read under `format`.
pub fn schema_for(
    id: u16,
    format: FormatTag,
    config: &MapperConfig,
) -> Option<&'static ChannelSchema> {
    if id == IMU_REAR && format == FormatTag::New && config.power_bus_on_new_format {
        return Some(&POWER_BUS);
    }
    table_schema(id)
}

/// The table entry for `id`, ignoring format-dependent variants.
pub fn table_schema(id: u16) -> Option<&'static ChannelSchema> {
    CHANNELS.iter().find(|schema| schema.id == id)
}

/// Look up a channel schema by display name, case-insensitively.
pub fn schema_by_name(name: &str) -> Result<&'static ChannelSchema> {
    CHANNELS
        .iter()
        .chain(std::iter::once(&POWER_BUS))
        .find(|schema| schema.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| SchemaError::UnknownChannelName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use telelink_frame::{KNOWN_CHANNELS, VALUE_COUNT};

    use super::*;

    #[test]
    fn every_known_channel_has_a_schema() {
        let config = MapperConfig::default();
        for id in KNOWN_CHANNELS {
            assert!(schema_for(id, FormatTag::Legacy, &config).is_some());
        }
        assert!(schema_for(0x6FF, FormatTag::New, &config).is_none());
    }

    #[test]
    fn schemas_fit_in_a_record() {
        for schema in CHANNELS.iter().chain(std::iter::once(&POWER_BUS)) {
            assert!(schema.fields.len() <= VALUE_COUNT, "{}", schema.name);
            let names: HashSet<_> = schema.fields.iter().map(|f| f.name).collect();
            assert_eq!(names.len(), schema.fields.len(), "{}", schema.name);
        }
    }

    #[test]
    fn aliases_reference_real_fields() {
        let config = MapperConfig::default();
        for alias in POWER_BUS.aliases {
            let target = schema_for(alias.target, FormatTag::Legacy, &config).unwrap();
            for (from, to) in alias.fields {
                assert!(POWER_BUS.field(from).is_some(), "{from}");
                assert!(target.field(to).is_some(), "{to}");
            }
        }
    }

    #[test]
    fn channel_0x600_depends_on_format() {
        let config = MapperConfig::default();
        assert_eq!(
            schema_for(IMU_REAR, FormatTag::New, &config).unwrap().name,
            "POWER_BUS"
        );
        assert_eq!(
            schema_for(IMU_REAR, FormatTag::Legacy, &config).unwrap().name,
            "IMU_REAR"
        );

        let imu_only = MapperConfig {
            power_bus_on_new_format: false,
            ..MapperConfig::default()
        };
        assert_eq!(
            schema_for(IMU_REAR, FormatTag::New, &imu_only).unwrap().name,
            "IMU_REAR"
        );
    }

    #[test]
    fn percent_fields_clamp() {
        assert_eq!(FieldKind::Percent.apply(150.0), 100.0);
        assert_eq!(FieldKind::Percent.apply(-5.0), 0.0);
        assert_eq!(FieldKind::Percent.apply(42.5), 42.5);
        assert_eq!(FieldKind::Value.apply(-7.25), -7.25);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(schema_by_name("gps").unwrap().id, GPS);
        assert_eq!(schema_by_name("POWER_BUS").unwrap().id, IMU_REAR);
        assert!(matches!(
            schema_by_name("nope"),
            Err(SchemaError::UnknownChannelName(_))
        ));
    }
}
