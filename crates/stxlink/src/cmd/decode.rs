use std::fs::File;
use std::io::{self, Cursor, Read};

use serde::Serialize;
use stxlink_frame::{FrameError, FrameReader, Outcome};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{hex, payload_preview, print_json, print_raw, print_table, OutputFormat};

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum DecodeEvent {
    Frame {
        len: usize,
        payload_hex: String,
        payload: String,
    },
    Rejected {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
struct DecodeOutput {
    events: Vec<DecodeEvent>,
    frames_completed: u64,
    frames_rejected: u64,
    bytes_discarded: u64,
    zero_length_drops: u64,
    /// Parser state at end of input; anything but awaiting-start is a truncated frame.
    final_state: String,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (out, payloads) = match (&args.hex, &args.file) {
        (Some(text), _) => {
            let bytes = parse_hex(text).map_err(|msg| CliError::new(USAGE, format!("--hex: {msg}")))?;
            decode_stream(Cursor::new(bytes))?
        }
        (None, Some(path)) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            decode_stream(file)?
        }
        (None, None) => decode_stream(io::stdin().lock())?,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => print_events(&out),
        OutputFormat::Raw => {
            for payload in &payloads {
                print_raw(payload);
            }
        }
    }

    if out.frames_rejected > 0 {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}

fn decode_stream<R: Read>(input: R) -> CliResult<(DecodeOutput, Vec<Vec<u8>>)> {
    let mut reader = FrameReader::new(input);
    let mut events = Vec::new();
    let mut payloads = Vec::new();

    loop {
        match reader.next_outcome() {
            Ok(Outcome::Complete(payload)) => {
                events.push(DecodeEvent::Frame {
                    len: payload.len(),
                    payload_hex: hex(&payload),
                    payload: payload_preview(&payload),
                });
                payloads.push(payload.to_vec());
            }
            Ok(Outcome::Rejected(reason)) => events.push(DecodeEvent::Rejected {
                reason: reason.to_string(),
            }),
            Ok(Outcome::Waiting) => {}
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        }
    }

    let parser = reader.parser();
    let out = DecodeOutput {
        events,
        frames_completed: parser.frames_completed(),
        frames_rejected: parser.frames_rejected(),
        bytes_discarded: parser.bytes_discarded(),
        zero_length_drops: parser.zero_length_drops(),
        final_state: parser.state().to_string(),
    };
    Ok((out, payloads))
}

fn print_events(out: &DecodeOutput) {
    let rows = out
        .events
        .iter()
        .enumerate()
        .map(|(i, event)| match event {
            DecodeEvent::Frame {
                len,
                payload_hex,
                payload,
            } => vec![
                (i + 1).to_string(),
                "frame".to_string(),
                len.to_string(),
                format!("{payload} [{payload_hex}]"),
            ],
            DecodeEvent::Rejected { reason } => vec![
                (i + 1).to_string(),
                "rejected".to_string(),
                "-".to_string(),
                reason.clone(),
            ],
        })
        .collect();
    print_table(&["#", "EVENT", "LEN", "DETAIL"], rows);
    println!(
        "frames={} rejected={} discarded={} final_state={}",
        out.frames_completed, out.frames_rejected, out.bytes_discarded, out.final_state
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_frames_and_rejections() {
        let wire = parse_hex("ff 02 01 41 41 03 02 01 41 40 03 02 02 68 69 d1 03").unwrap();
        let (out, payloads) = decode_stream(Cursor::new(wire)).unwrap();

        assert_eq!(out.frames_completed, 2);
        assert_eq!(out.frames_rejected, 1);
        assert_eq!(out.bytes_discarded, 1);
        assert_eq!(payloads, vec![b"A".to_vec(), b"hi".to_vec()]);
        assert!(matches!(out.events[1], DecodeEvent::Rejected { .. }));
        assert_eq!(out.final_state, "awaiting-start");
    }

    #[test]
    fn reports_truncated_tail() {
        let wire = parse_hex("02 05 68 65").unwrap();
        let (out, payloads) = decode_stream(Cursor::new(wire)).unwrap();
        assert!(payloads.is_empty());
        assert_eq!(out.final_state, "awaiting-payload");
    }
}
