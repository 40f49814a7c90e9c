//! Serial loop example: a simulated device emits telemetry with line noise,
//! delivered in uneven blocks the way a UART read loop sees it.
//!
//! Run with:
//!   cargo run --example serial-loop

use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;

use framesync::frame::{Driver, Frame, FrameSpec};

const TEMPERATURE: u32 = 1;
const STATUS: u32 = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>();

    let device = thread::spawn(move || {
        let mut wire = Vec::new();
        for reading in 0..5u8 {
            wire.extend_from_slice(b"\x00\xff");
            wire.extend_from_slice(format!("$T{};", 200 + u16::from(reading)).as_bytes());
            wire.extend_from_slice(&[0xA5, 0x5A, reading, 0x10 + reading, 0x0D]);
        }
        for (index, block) in wire.chunks(7).enumerate() {
            let split = index % block.len().max(1);
            let (left, right) = block.split_at(split);
            for part in [left, right] {
                if !part.is_empty() && tx.send(part.to_vec()).is_err() {
                    return;
                }
            }
        }
    });

    let statuses = Rc::new(Cell::new(0usize));
    let mut driver = Driver::builder()
        .buffer_size(32)
        .frame(
            FrameSpec::builder(TEMPERATURE, "$T")
                .terminator(b';')
                .listener(|frame: &Frame| {
                    eprintln!(
                        "[temperature] {}",
                        String::from_utf8_lossy(&frame.payload)
                    );
                })
                .build()?,
        )
        .frame({
            let statuses = Rc::clone(&statuses);
            FrameSpec::builder(STATUS, vec![0xA5u8, 0x5A])
                .fixed(2)
                .terminator(0x0D)
                .listener(move |frame: &Frame| {
                    statuses.set(statuses.get() + 1);
                    eprintln!("[status] {:02x?}", frame.payload.as_ref());
                })
                .build()?
        })
        .build()?;

    for block in rx {
        driver.add(&block)?;

        // Stop logging temperatures once three status frames have arrived.
        if statuses.get() == 3 {
            if let Some(spec) = driver.frame_mut(TEMPERATURE) {
                spec.listeners_mut().clear();
            }
        }
    }

    let _ = device.join();
    let stats = driver.stats();
    eprintln!(
        "matched={} dropped={} pending={}",
        stats.frames_matched,
        stats.bytes_dropped,
        driver.buffer().len()
    );
    Ok(())
}
