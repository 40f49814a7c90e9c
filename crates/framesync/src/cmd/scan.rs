use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::rc::Rc;

use framesync::config::ParserConfig;
use framesync::frame::{Driver, Frame, FrameId};

use crate::cmd::ScanArgs;
use crate::exit::{config_error, frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

type Matched = Rc<RefCell<Vec<Frame>>>;

/// Which matched frames get printed, and how many.
#[derive(Debug, Default)]
struct Selection {
    frames: Option<Vec<FrameId>>,
    count: Option<usize>,
}

impl Selection {
    fn wants(&self, id: FrameId) -> bool {
        self.frames.as_ref().map_or(true, |ids| ids.contains(&id))
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ScanSummary {
    bytes_read: u64,
    printed: usize,
}

pub fn run(args: ScanArgs, format: OutputFormat) -> CliResult<i32> {
    if args.read_size == 0 {
        return Err(CliError::usage("--read-size must be greater than zero"));
    }
    if args.count == Some(0) {
        return Err(CliError::usage("--count must be greater than zero"));
    }

    let config = ParserConfig::from_path(&args.config)
        .map_err(|err| config_error("failed to load config", err))?;
    if let Some(ids) = &args.frames {
        if let Some(unknown) = ids.iter().find(|id| config.frame(**id).is_none()) {
            return Err(CliError::usage(format!(
                "--frames: no frame with id {unknown} in config"
            )));
        }
    }

    let names: HashMap<FrameId, String> = config
        .frames
        .iter()
        .map(|def| (def.id, def.display_name()))
        .collect();

    let matched: Matched = Rc::default();
    let sink = {
        let matched = Rc::clone(&matched);
        move |frame: &Frame| matched.borrow_mut().push(frame.clone())
    };
    let mut driver = config
        .build_driver(sink)
        .map_err(|err| config_error("invalid frame config", err))?;

    let input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed to open {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    let selection = Selection {
        frames: args.frames,
        count: args.count,
    };
    let summary = scan(
        input,
        &mut driver,
        &matched,
        &selection,
        args.read_size,
        |frame| {
            let name = names.get(&frame.id).map_or("", String::as_str);
            print_frame(frame, name, format);
        },
    )?;

    let stats = driver.stats();
    tracing::info!(
        bytes_read = summary.bytes_read,
        frames_matched = stats.frames_matched,
        frames_printed = summary.printed,
        bytes_dropped = stats.bytes_dropped,
        bytes_pending = driver.buffer().len(),
        "scan finished"
    );

    Ok(SUCCESS)
}

/// Feed `input` through the driver in `read_size` blocks until end of input
/// or until the selection's count is reached.
fn scan<R, F>(
    mut input: R,
    driver: &mut Driver,
    matched: &Matched,
    selection: &Selection,
    read_size: usize,
    mut emit: F,
) -> CliResult<ScanSummary>
where
    R: Read,
    F: FnMut(&Frame),
{
    let mut block = vec![0u8; read_size];
    let mut summary = ScanSummary::default();

    loop {
        let read = match input.read(&mut block) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("failed to read input", err)),
        };
        summary.bytes_read += read as u64;

        driver
            .add(&block[..read])
            .map_err(|err| frame_error("frame processing failed", err))?;

        let frames = std::mem::take(&mut *matched.borrow_mut());
        for frame in frames.iter().filter(|frame| selection.wants(frame.id)) {
            emit(frame);
            summary.printed += 1;
            if selection.count.is_some_and(|count| summary.printed >= count) {
                return Ok(summary);
            }
        }
    }

    Ok(summary)
}
