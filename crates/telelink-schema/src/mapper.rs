use std::collections::{BTreeMap, HashSet};
use std::time::SystemTime;

use telelink_frame::NormalizedRecord;

use crate::config::MapperConfig;
use crate::registry::{schema_for, table_schema, ChannelSchema};
use crate::sample::{channel_key, SemanticSample, RAW_FIELDS};

/// Everything one record produces.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedSamples {
    /// Replaces the cached sample for the record's own channel.
    pub primary: SemanticSample,
    /// Partial samples for aliased channels. Their fields are merged into
    /// whatever is already cached under the target key.
    pub merges: Vec<SemanticSample>,
}

impl MappedSamples {
    /// Number of cache keys this record touches.
    pub fn key_count(&self) -> usize {
        1 + self.merges.len()
    }
}

/// Dispatches records to channel schemas.
///
/// Holds the set of unknown ids already reported, so a stray channel is
/// logged once per session instead of once per frame.
#[derive(Debug, Default)]
pub struct SemanticMapper {
    config: MapperConfig,
    reported_unknown: HashSet<u16>,
}

impl SemanticMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self {
            config,
            reported_unknown: HashSet::new(),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// The schema a record would be mapped with, if any.
    pub fn schema(&self, record: &NormalizedRecord) -> Option<&'static ChannelSchema> {
        schema_for(record.channel_id, record.format, &self.config)
    }

    /// Map one record. Never fails: unknown channels come back as raw
    /// `v1..v7` under their hex key.
    pub fn map(&mut self, record: &NormalizedRecord, at: SystemTime) -> MappedSamples {
        let Some(schema) = self.schema(record) else {
            if self.reported_unknown.insert(record.channel_id) {
                tracing::warn!(
                    channel = %channel_key(record.channel_id),
                    format = record.format.as_str(),
                    "unknown channel id; storing raw values"
                );
            }
            return MappedSamples {
                primary: raw_sample(record, at),
                merges: Vec::new(),
            };
        };

        let fields: BTreeMap<&'static str, f32> = schema
            .fields
            .iter()
            .zip(record.values.iter())
            .map(|(spec, raw)| (spec.name, spec.kind.apply(*raw)))
            .collect();

        let merges = if self.config.compat_aliases {
            schema
                .aliases
                .iter()
                .map(|alias| SemanticSample {
                    channel_key: channel_key(alias.target),
                    channel_name: table_schema(alias.target).map(|target| target.name),
                    fields: alias
                        .fields
                        .iter()
                        .filter_map(|(from, to)| fields.get(*from).map(|v| (*to, *v)))
                        .collect(),
                    sequence: record.sequence,
                    derived_at: at,
                })
                .collect()
        } else {
            Vec::new()
        };

        MappedSamples {
            primary: SemanticSample {
                channel_key: channel_key(record.channel_id),
                channel_name: Some(schema.name),
                fields,
                sequence: record.sequence,
                derived_at: at,
            },
            merges,
        }
    }
}

fn raw_sample(record: &NormalizedRecord, at: SystemTime) -> SemanticSample {
    SemanticSample {
        channel_key: channel_key(record.channel_id),
        channel_name: None,
        fields: RAW_FIELDS
            .iter()
            .copied()
            .zip(record.values.iter().copied())
            .collect(),
        sequence: record.sequence,
        derived_at: at,
    }
}

#[cfg(test)]
mod tests {
    use telelink_frame::{
        FormatTag, ACCUMULATOR, DRIVER_INPUTS, IMU_REAR, INVERTER_STATUS, POWERTRAIN,
    };

    use super::*;

    fn record(channel_id: u16, values: [f32; 7], format: FormatTag) -> NormalizedRecord {
        NormalizedRecord {
            channel_id,
            sequence: match format {
                FormatTag::New => Some(7),
                FormatTag::Legacy => None,
            },
            values,
            format,
        }
    }

    #[test]
    fn accumulator_fields() {
        let mut mapper = SemanticMapper::default();
        let mapped = mapper.map(
            &record(ACCUMULATOR, [12.5, 3.70, 41.2, 0.0, 0.0, 0.0, 0.0], FormatTag::New),
            SystemTime::now(),
        );

        let sample = mapped.primary;
        assert_eq!(sample.channel_key, "0x640");
        assert_eq!(sample.channel_name, Some("ACCUMULATOR"));
        assert_eq!(sample.sequence, Some(7));
        assert_eq!(
            sample.fields,
            BTreeMap::from([
                ("current_sensor", 12.5),
                ("cell_min_v", 3.70),
                ("cell_max_temp", 41.2),
            ])
        );
        assert!(mapped.merges.is_empty());
    }

    #[test]
    fn driver_inputs_clamp_percentages() {
        let mut mapper = SemanticMapper::default();
        let high = mapper.map(
            &record(DRIVER_INPUTS, [80.0, 75.0, 150.0, 150.0, 0.0, 0.0, 0.0], FormatTag::New),
            SystemTime::now(),
        );
        assert_eq!(high.primary.get("throttle"), Some(100.0));
        assert_eq!(high.primary.get("brake"), Some(100.0));
        assert_eq!(high.primary.get("torque_req"), Some(80.0));

        let low = mapper.map(
            &record(DRIVER_INPUTS, [0.0, 0.0, -5.0, -5.0, 0.0, 0.0, 0.0], FormatTag::Legacy),
            SystemTime::now(),
        );
        assert_eq!(low.primary.get("throttle"), Some(0.0));
        assert_eq!(low.primary.get("brake"), Some(0.0));
    }

    #[test]
    fn unknown_channel_is_raw() {
        let mut mapper = SemanticMapper::default();
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let mapped = mapper.map(&record(0x6FF, values, FormatTag::New), SystemTime::now());

        assert_eq!(mapped.primary.channel_key, "0x6FF");
        assert!(mapped.primary.is_raw());
        assert_eq!(mapped.primary.fields.len(), 7);
        for (name, value) in RAW_FIELDS.iter().zip(values) {
            assert_eq!(mapped.primary.get(name), Some(value));
        }
        assert!(mapped.merges.is_empty());

        // Second sighting maps the same way.
        let again = mapper.map(&record(0x6FF, values, FormatTag::New), SystemTime::now());
        assert_eq!(again.primary.fields, mapped.primary.fields);
    }

    #[test]
    fn new_format_power_bus_aliases() {
        let mut mapper = SemanticMapper::default();
        let mapped = mapper.map(
            &record(IMU_REAR, [390.0, 12.0, 5400.0, 80.0, 3.61, 0.4, 0.5], FormatTag::New),
            SystemTime::now(),
        );

        assert_eq!(mapped.primary.channel_key, "0x600");
        assert_eq!(mapped.primary.channel_name, Some("POWER_BUS"));
        assert_eq!(mapped.primary.get("rpm"), Some(5400.0));
        assert_eq!(mapped.key_count(), 3);

        let powertrain = &mapped.merges[0];
        assert_eq!(powertrain.channel_key, "0x620");
        assert_eq!(powertrain.channel_name, Some("POWERTRAIN"));
        assert_eq!(
            powertrain.fields,
            BTreeMap::from([
                ("dc_bus_voltage", 390.0),
                ("dc_bus_power", 12.0),
                ("motor_rpm", 5400.0),
            ])
        );

        let accumulator = &mapped.merges[1];
        assert_eq!(accumulator.channel_key, "0x640");
        assert_eq!(accumulator.fields, BTreeMap::from([("cell_min_v", 3.61)]));
    }

    #[test]
    fn legacy_format_0x600_is_imu() {
        let mut mapper = SemanticMapper::default();
        let mapped = mapper.map(
            &record(IMU_REAR, [0.1, 0.2, 9.8, 0.0, 0.0, 0.3, 99.0], FormatTag::Legacy),
            SystemTime::now(),
        );
        assert_eq!(mapped.primary.channel_name, Some("IMU_REAR"));
        assert_eq!(mapped.primary.get("az"), Some(9.8));
        assert_eq!(mapped.primary.fields.len(), 6);
        assert!(mapped.merges.is_empty());
    }

    #[test]
    fn aliases_can_be_disabled() {
        let mut mapper = SemanticMapper::new(MapperConfig {
            compat_aliases: false,
            ..MapperConfig::default()
        });
        let mapped = mapper.map(
            &record(IMU_REAR, [1.0; 7], FormatTag::New),
            SystemTime::now(),
        );
        assert_eq!(mapped.primary.channel_name, Some("POWER_BUS"));
        assert!(mapped.merges.is_empty());
    }

    #[test]
    fn inverter_status_keeps_values_as_received() {
        let mut mapper = SemanticMapper::default();
        let mapped = mapper.map(
            &record(INVERTER_STATUS, [3.0, 2.7, 0.0, 0.0, 0.0, 0.0, 0.0], FormatTag::New),
            SystemTime::now(),
        );
        assert_eq!(mapped.primary.get("status"), Some(3.0));
        assert_eq!(mapped.primary.get("errors"), Some(2.7));
    }

    #[test]
    fn powertrain_uses_all_seven_values() {
        let mut mapper = SemanticMapper::default();
        let values = [60.0, 55.0, 40.0, 41.0, 400.0, 20.0, 6000.0];
        let mapped = mapper.map(&record(POWERTRAIN, values, FormatTag::New), SystemTime::now());
        assert_eq!(mapped.primary.fields.len(), 7);
        assert_eq!(mapped.primary.get("motor_rpm"), Some(6000.0));
    }
}
