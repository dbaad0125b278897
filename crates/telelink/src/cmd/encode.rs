use bytes::BytesMut;
use telelink_frame::{
    encode_frame, encode_legacy, encode_new, PayloadLayout, FRAME_LEN, VALUE_COUNT,
};
use telelink_schema::{channel_key, parse_channel_key, schema_by_name};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let id = resolve_channel(&args.channel)?;
    let values = pad_values(&args.values)?;

    let (payload, sequence) = match args.layout {
        PayloadLayout::Legacy => (encode_legacy(id, &values), None),
        PayloadLayout::New | PayloadLayout::Auto => {
            (encode_new(id, args.seq, &values), Some(args.seq))
        }
    };

    let mut frame = BytesMut::with_capacity(FRAME_LEN);
    encode_frame(&payload, &mut frame).map_err(|err| frame_error("encode failed", err))?;

    let layout = match args.layout {
        PayloadLayout::Legacy => "legacy",
        PayloadLayout::New | PayloadLayout::Auto => "new",
    };
    print_encoded(channel_key(id), layout, sequence, &frame, format);
    Ok(SUCCESS)
}

/// Numeric id or table name (`ACCUMULATOR`, case-insensitive).
fn resolve_channel(input: &str) -> CliResult<u16> {
    if let Ok(id) = parse_channel_key(input) {
        return Ok(id);
    }
    schema_by_name(input)
        .map(|schema| schema.id)
        .map_err(|err| CliError::new(USAGE, err.to_string()))
}

fn pad_values(values: &[f32]) -> CliResult<[f32; VALUE_COUNT]> {
    if values.len() > VALUE_COUNT {
        return Err(CliError::new(
            USAGE,
            format!(
                "at most {VALUE_COUNT} values fit in a frame, got {}",
                values.len()
            ),
        ));
    }
    let mut out = [0.0f32; VALUE_COUNT];
    out[..values.len()].copy_from_slice(values);
    Ok(out)
}
