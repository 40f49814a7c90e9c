use framesync::config::ParserConfig;
use framesync::frame::{DataLength, Driver};
use serde::Serialize;

use crate::cmd::CheckArgs;
use crate::exit::{config_error, frame_error, CliResult, SUCCESS};
use crate::output::{hex, new_table, payload_preview, print_json, OutputFormat};

#[derive(Serialize)]
struct CheckOutput {
    buffer_capacity: usize,
    longest_frame_len: usize,
    frames: Vec<FrameShape>,
}

#[derive(Serialize)]
struct FrameShape {
    id: u32,
    name: String,
    header: String,
    header_hex: String,
    /// `None` for payloads that run to the terminator.
    length: Option<usize>,
    terminator: Option<u8>,
    min_frame_len: usize,
}

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let config = ParserConfig::from_path(&args.config)
        .map_err(|err| config_error("failed to load config", err))?;
    let driver = config
        .driver_builder()
        .map_err(|err| config_error("invalid frame definition", err))?
        .build()
        .map_err(|err| frame_error("invalid frame config", err))?;

    let output = describe(&config, &driver);
    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "ID",
                "NAME",
                "HEADER",
                "LENGTH",
                "TERMINATOR",
                "MIN LEN",
            ]);
            for shape in &output.frames {
                table.add_row(vec![
                    shape.id.to_string(),
                    shape.name.clone(),
                    shape.header.clone(),
                    length_label(shape.length),
                    terminator_label(shape.terminator),
                    shape.min_frame_len.to_string(),
                ]);
            }
            println!("{table}");
            println!(
                "buffer capacity: {} (longest frame {})",
                output.buffer_capacity, output.longest_frame_len
            );
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for shape in &output.frames {
                println!(
                    "frame={} ({}) header={} length={} terminator={}",
                    shape.id,
                    shape.name,
                    shape.header_hex,
                    length_label(shape.length),
                    terminator_label(shape.terminator)
                );
            }
            println!(
                "capacity={} longest={}",
                output.buffer_capacity, output.longest_frame_len
            );
        }
    }

    Ok(SUCCESS)
}

fn describe(config: &ParserConfig, driver: &Driver) -> CheckOutput {
    let frames = driver
        .frames()
        .iter()
        .map(|spec| {
            let name = config
                .frame(spec.id())
                .map(|def| def.display_name())
                .unwrap_or_else(|| spec.id().to_string());
            FrameShape {
                id: spec.id(),
                name,
                header: payload_preview(spec.header()),
                header_hex: hex(spec.header()),
                length: match spec.data_length() {
                    DataLength::Fixed(n) => Some(n),
                    DataLength::Variable => None,
                },
                terminator: spec.terminator(),
                min_frame_len: spec.min_frame_len(),
            }
        })
        .collect();

    CheckOutput {
        buffer_capacity: driver.buffer().capacity(),
        longest_frame_len: driver.longest_frame_len(),
        frames,
    }
}

fn length_label(length: Option<usize>) -> String {
    length.map_or_else(|| DataLength::Variable.to_string(), |n| n.to_string())
}

fn terminator_label(terminator: Option<u8>) -> String {
    terminator.map_or_else(|| "-".to_string(), |byte| format!("0x{byte:02x}"))
}
