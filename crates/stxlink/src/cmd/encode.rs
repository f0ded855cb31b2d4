use serde::Serialize;
use stxlink_frame::encode;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{hex, payload_preview, print_fields, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    payload_len: usize,
    checksum: u8,
    wire_size: usize,
    wire_hex: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.bytes()?;
    let frame =
        encode(&payload, args.max_frame_size).map_err(|err| frame_error("encode failed", err))?;

    let out = EncodeOutput {
        payload_len: frame.payload().len(),
        checksum: frame.checksum(),
        wire_size: frame.wire_size(),
        wire_hex: hex(frame.as_bytes()),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_fields(&[
            ("payload", payload_preview(frame.payload())),
            ("payload_len", out.payload_len.to_string()),
            ("checksum", format!("0x{:02x}", out.checksum)),
            ("wire_size", out.wire_size.to_string()),
            ("wire", out.wire_hex.clone()),
        ]),
        OutputFormat::Pretty => println!("{}", out.wire_hex),
        OutputFormat::Raw => print_raw(frame.as_bytes()),
    }

    Ok(SUCCESS)
}
