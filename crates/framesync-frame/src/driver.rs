use std::collections::HashSet;

use framesync_ring::RingBuffer;

use crate::error::{FrameError, Result};
use crate::spec::{FrameId, FrameSpec, MatchOutcome};

/// Counters kept by a [`Driver`] over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Frames recognized and dispatched to listeners.
    pub frames_matched: u64,
    /// Bytes discarded while resynchronizing on noise.
    pub bytes_dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// A frame was emitted or a byte dropped; try again.
    Progress,
    /// Some spec could still complete once more bytes arrive.
    NeedInput,
}

/// Feeds a byte stream through a ring buffer and the registered frame specs.
///
/// Build with [`Driver::builder`]. Specs are tested in registration order;
/// the first one that matches wins. When none can match at the current
/// position the oldest byte is dropped and matching resumes on the next one.
///
/// Every mutating call takes `&mut self` and runs to completion, listeners
/// included, before returning.
#[derive(Debug)]
pub struct Driver {
    buffer: RingBuffer,
    frames: Vec<FrameSpec>,
    longest_frame_len: usize,
    stats: DriverStats,
}

impl Driver {
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Feed a single byte.
    pub fn add_byte(&mut self, byte: u8) -> Result<()> {
        self.add(&[byte])
    }

    /// Feed a block of bytes of any length.
    ///
    /// Input longer than the longest registered frame is split into chunks of
    /// that length so a single call can never overflow the buffer.
    pub fn add(&mut self, bytes: &[u8]) -> Result<()> {
        for chunk in bytes.chunks(self.longest_frame_len) {
            self.push_chunk(chunk)?;
        }
        Ok(())
    }

    /// The buffer holding bytes not yet matched or dropped.
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    /// Registered specs, in registration order.
    pub fn frames(&self) -> &[FrameSpec] {
        &self.frames
    }

    pub fn frame(&self, id: FrameId) -> Option<&FrameSpec> {
        self.frames.iter().find(|frame| frame.id() == id)
    }

    /// A registered spec, for changing its listeners.
    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut FrameSpec> {
        self.frames.iter_mut().find(|frame| frame.id() == id)
    }

    /// Longest fixed frame length, or shortest possible length for
    /// variable-length frames, across all registered specs.
    pub fn longest_frame_len(&self) -> usize {
        self.longest_frame_len
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    fn push_chunk(&mut self, mut chunk: &[u8]) -> Result<()> {
        while !chunk.is_empty() {
            let take = chunk.len().min(self.buffer.space());
            let (piece, rest) = chunk.split_at(take);
            self.buffer.push_slice(piece)?;
            self.process()?;
            chunk = rest;
        }
        Ok(())
    }

    // Leaves the buffer either empty or not full.
    fn process(&mut self) -> Result<()> {
        while !self.buffer.is_empty() {
            if self.step()? == Step::NeedInput {
                break;
            }
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Step> {
        let mut can_drop = true;

        for frame in &mut self.frames {
            match frame.try_match(&mut self.buffer)? {
                MatchOutcome::NoMatch => {}
                MatchOutcome::Indeterminate => can_drop = false,
                MatchOutcome::Matched(matched) => {
                    tracing::trace!(
                        frame_id = matched.id,
                        payload_len = matched.payload.len(),
                        "frame matched"
                    );
                    self.stats.frames_matched += 1;
                    frame.notify(&matched);
                    return Ok(Step::Progress);
                }
            }
        }

        if !can_drop && !self.buffer.is_full() {
            return Ok(Step::NeedInput);
        }

        let byte = self.buffer.pop()?;
        self.stats.bytes_dropped += 1;
        tracing::trace!(byte, "resynchronizing, dropped leading byte");
        Ok(Step::Progress)
    }
}

/// Assembles a [`Driver`] from frame specs and a buffer size.
#[derive(Debug, Default)]
pub struct DriverBuilder {
    buffer_size: Option<usize>,
    frames: Vec<FrameSpec>,
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested buffer capacity.
    ///
    /// The effective capacity is never smaller than the longest fixed frame.
    /// Required when any variable-length frame is registered, and must then be
    /// large enough for the longest frame expected on the stream. Zero counts
    /// as unset.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size).filter(|&size| size > 0);
        self
    }

    /// Register a frame spec. Registration order is matching order.
    pub fn frame(mut self, spec: FrameSpec) -> Self {
        self.frames.push(spec);
        self
    }

    pub fn build(self) -> Result<Driver> {
        if self.frames.is_empty() {
            return Err(FrameError::NoFrames);
        }

        let mut ids = HashSet::with_capacity(self.frames.len());
        for frame in &self.frames {
            if !ids.insert(frame.id()) {
                return Err(FrameError::DuplicateFrameId(frame.id()));
            }
        }

        if self.buffer_size.is_none() {
            if let Some(frame) = self
                .frames
                .iter()
                .find(|frame| frame.data_length().is_variable())
            {
                return Err(FrameError::BufferSizeRequired { id: frame.id() });
            }
        }

        let longest_frame_len = self
            .frames
            .iter()
            .map(FrameSpec::min_frame_len)
            .max()
            .unwrap_or(1);
        let capacity = self
            .buffer_size
            .map_or(longest_frame_len, |size| size.max(longest_frame_len));
        let buffer = RingBuffer::new(capacity)?;

        tracing::debug!(
            capacity,
            frames = self.frames.len(),
            longest_frame_len,
            "frame driver built"
        );

        Ok(Driver {
            buffer,
            frames: self.frames,
            longest_frame_len,
            stats: DriverStats::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::spec::{DataLength, Frame};

    type Seen = Rc<RefCell<Vec<(FrameId, Vec<u8>)>>>;

    fn recorder(seen: &Seen) -> impl FnMut(&Frame) + 'static {
        let seen = Rc::clone(seen);
        move |frame: &Frame| {
            seen.borrow_mut()
                .push((frame.id, frame.payload.to_vec()))
        }
    }

    fn plus_variable(seen: &Seen) -> FrameSpec {
        FrameSpec::builder(1, "+")
            .terminator(b';')
            .listener(recorder(seen))
            .build()
            .unwrap()
    }

    fn pairs(seen: &Seen) -> Vec<(FrameId, Vec<u8>)> {
        seen.borrow().clone()
    }

    #[test]
    fn mixed_fixed_and_variable_frames() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(20)
            .frame(
                FrameSpec::builder(0, "-")
                    .fixed(6)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver.add(b"+123;+45;  -asdfjk;").unwrap();

        assert_eq!(
            pairs(&seen),
            vec![
                (1, b"123".to_vec()),
                (1, b"45".to_vec()),
                (0, b"asdfjk".to_vec()),
            ]
        );
        assert_eq!(driver.stats().frames_matched, 3);
        assert_eq!(driver.stats().bytes_dropped, 3);
        assert!(driver.buffer().is_empty());
    }

    #[test]
    fn mixed_frames_with_terminated_fixed_frame() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(20)
            .frame(
                FrameSpec::builder(0, "-")
                    .terminator(b';')
                    .fixed(6)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver.add(b"+123;+45;  -asdfjk;").unwrap();

        assert_eq!(
            pairs(&seen),
            vec![
                (1, b"123".to_vec()),
                (1, b"45".to_vec()),
                (0, b"asdfjk".to_vec()),
            ]
        );
        assert_eq!(driver.stats().bytes_dropped, 2);
    }

    #[test]
    fn noisy_prefix_is_skipped() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(11)
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver
            .add(b" something that will not be matched  +123456789;")
            .unwrap();

        assert_eq!(pairs(&seen), vec![(1, b"123456789".to_vec())]);
        assert_eq!(driver.stats().bytes_dropped, 37);
    }

    #[test]
    fn single_bytes_accumulate_into_frames() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(8)
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        for &byte in b"x+ab;" {
            driver.add_byte(byte).unwrap();
        }

        assert_eq!(pairs(&seen), vec![(1, b"ab".to_vec())]);
    }

    #[test]
    fn duplicate_frame_id_is_rejected() {
        let err = Driver::builder()
            .frame(FrameSpec::builder(0, "-").fixed(1).build().unwrap())
            .frame(FrameSpec::builder(0, "+").fixed(1).build().unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err, FrameError::DuplicateFrameId(0));
    }

    #[test]
    fn variable_frame_requires_buffer_size() {
        let err = Driver::builder()
            .frame(FrameSpec::builder(0, "-").fixed(1).build().unwrap())
            .frame(FrameSpec::builder(9, "+").terminator(b';').build().unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err, FrameError::BufferSizeRequired { id: 9 });

        let err = Driver::builder()
            .buffer_size(0)
            .frame(FrameSpec::builder(9, "+").terminator(b';').build().unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err, FrameError::BufferSizeRequired { id: 9 });
    }

    #[test]
    fn empty_builder_is_rejected() {
        let err = Driver::builder().buffer_size(16).build().unwrap_err();
        assert_eq!(err, FrameError::NoFrames);
    }

    #[test]
    fn oversized_fixed_frames_fail_without_panicking() {
        let err = FrameSpec::builder(0, "-").fixed(usize::MAX).build().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLong { id: 0, .. }));

        let err = Driver::builder()
            .frame(FrameSpec::builder(1, "AB").fixed(usize::MAX - 2).build().unwrap())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            FrameError::Buffer(framesync_ring::BufferError::AllocationFailed {
                capacity: usize::MAX
            })
        );
    }

    #[test]
    fn capacity_covers_longest_fixed_frame() {
        let driver = Driver::builder()
            .buffer_size(4)
            .frame(FrameSpec::builder(0, "AB").fixed(8).build().unwrap())
            .frame(FrameSpec::builder(1, "C").fixed(2).build().unwrap())
            .build()
            .unwrap();
        assert_eq!(driver.longest_frame_len(), 10);
        assert_eq!(driver.buffer().capacity(), 10);

        let driver = Driver::builder()
            .frame(FrameSpec::builder(0, "AB").fixed(3).terminator(b'!').build().unwrap())
            .build()
            .unwrap();
        assert_eq!(driver.buffer().capacity(), 6);

        let driver = Driver::builder()
            .buffer_size(64)
            .frame(FrameSpec::builder(0, "AB").fixed(3).build().unwrap())
            .build()
            .unwrap();
        assert_eq!(driver.buffer().capacity(), 64);
    }

    #[test]
    fn oversized_input_is_chunked() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .frame(
                FrameSpec::builder(3, "#")
                    .fixed(2)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(driver.buffer().capacity(), 3);

        let mut input = Vec::new();
        for i in 0..50u8 {
            input.extend_from_slice(&[b'.', b'#', i, i.wrapping_mul(3)]);
        }
        driver.add(&input).unwrap();

        let seen = pairs(&seen);
        assert_eq!(seen.len(), 50);
        for (i, (id, payload)) in seen.iter().enumerate() {
            let i = i as u8;
            assert_eq!(*id, 3);
            assert_eq!(payload, &vec![i, i.wrapping_mul(3)]);
        }
        assert_eq!(driver.stats().bytes_dropped, 50);
    }

    #[test]
    fn later_spec_can_match_while_earlier_is_indeterminate() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(8)
            .frame(
                FrameSpec::builder(0, "AB")
                    .fixed(4)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .frame(
                FrameSpec::builder(1, "A")
                    .terminator(b';')
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        driver.add(b"AB1;").unwrap();
        assert_eq!(pairs(&seen), vec![(1, b"B1".to_vec())]);
    }

    #[test]
    fn first_registered_spec_wins() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .frame(
                FrameSpec::builder(0, "A")
                    .fixed(1)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .frame(
                FrameSpec::builder(1, "A")
                    .fixed(1)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        driver.add(b"AxAy").unwrap();
        assert_eq!(pairs(&seen), vec![(0, b"x".to_vec()), (0, b"y".to_vec())]);
    }

    #[test]
    fn step_waits_while_a_spec_is_indeterminate() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(4)
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver.buffer.push_slice(b"+12").unwrap();
        assert_eq!(driver.step().unwrap(), Step::NeedInput);
        assert_eq!(driver.buffer().len(), 3);

        driver.buffer.push(b'3').unwrap();
        assert!(driver.buffer().is_full());
        assert_eq!(driver.step().unwrap(), Step::Progress);
        assert_eq!(driver.buffer().peek_all().as_ref(), b"123");
        assert_eq!(driver.stats().bytes_dropped, 1);
    }

    #[test]
    fn step_drops_when_nothing_matches() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(4)
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver.buffer.push_slice(b"ab").unwrap();
        assert_eq!(driver.step().unwrap(), Step::Progress);
        assert_eq!(driver.buffer().peek_all().as_ref(), b"b");
    }

    #[test]
    fn variable_frame_filling_buffer_exactly_matches() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(5)
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver.add(b"+123;").unwrap();
        assert_eq!(pairs(&seen), vec![(1, b"123".to_vec())]);
    }

    #[test]
    fn variable_frame_longer_than_buffer_is_lost() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(4)
            .frame(plus_variable(&seen))
            .build()
            .unwrap();

        driver.add(b"+123;").unwrap();
        assert!(pairs(&seen).is_empty());
        assert_eq!(driver.stats().bytes_dropped, 5);
        assert!(driver.buffer().is_empty());

        driver.add(b"+9;").unwrap();
        assert_eq!(pairs(&seen), vec![(1, b"9".to_vec())]);
    }

    #[test]
    fn full_buffer_with_several_indeterminate_specs_drops_one_byte() {
        let seen = Seen::default();
        let build = |size: usize| {
            Driver::builder()
                .buffer_size(size)
                .frame(
                    FrameSpec::builder(0, "AB")
                        .terminator(b';')
                        .listener(recorder(&seen))
                        .build()
                        .unwrap(),
                )
                .frame(
                    FrameSpec::builder(1, "A")
                        .terminator(b'!')
                        .listener(recorder(&seen))
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap()
        };

        // One byte short: both specs wait until the buffer fills, then the
        // header byte is dropped and the rest is noise. The trailing ';' is
        // still too short to rule out the two-byte header.
        let mut short = build(5);
        short.add(b"AB123;").unwrap();
        assert!(pairs(&seen).is_empty());
        assert_eq!(short.stats().bytes_dropped, 5);
        assert_eq!(short.buffer().peek_all().as_ref(), b";");

        short.add(b"A1!").unwrap();
        assert_eq!(pairs(&seen), vec![(1, b"1".to_vec())]);

        seen.borrow_mut().clear();
        let mut exact = build(6);
        exact.add(b"AB123;").unwrap();
        assert_eq!(pairs(&seen), vec![(0, b"123".to_vec())]);
    }

    #[test]
    fn zero_length_fixed_frame_emits_empty_payload() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .frame(
                FrameSpec::builder(7, "ACK")
                    .data_length(DataLength::Fixed(0))
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(driver.longest_frame_len(), 3);

        driver.add(b"..ACKACK.AC").unwrap();
        driver.add(b"K").unwrap();
        assert_eq!(
            pairs(&seen),
            vec![(7, Vec::new()), (7, Vec::new()), (7, Vec::new())]
        );
    }

    #[test]
    fn disjoint_specs_do_not_interfere() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .buffer_size(16)
            .frame(
                FrameSpec::builder(10, "$GP")
                    .terminator(b'\n')
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .frame(
                FrameSpec::builder(20, vec![0xAAu8, 0x55])
                    .fixed(2)
                    .listener(recorder(&seen))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();

        let mut stream = Vec::new();
        stream.extend_from_slice(b"$GPfix1\n");
        stream.extend_from_slice(&[0xAA, 0x55, 0x01, 0x02]);
        stream.extend_from_slice(b"$GPfix2\n");
        stream.extend_from_slice(&[0xAA, 0x55, 0x03, 0x04]);
        driver.add(&stream).unwrap();

        assert_eq!(
            pairs(&seen),
            vec![
                (10, b"fix1".to_vec()),
                (20, vec![0x01, 0x02]),
                (10, b"fix2".to_vec()),
                (20, vec![0x03, 0x04]),
            ]
        );
        assert_eq!(driver.stats().bytes_dropped, 0);
    }

    #[test]
    fn listeners_can_change_after_registration() {
        let seen = Seen::default();
        let mut driver = Driver::builder()
            .frame(FrameSpec::builder(0, "-").fixed(1).build().unwrap())
            .build()
            .unwrap();

        driver.add(b"-a").unwrap();
        assert!(pairs(&seen).is_empty());

        let handle = driver
            .frame_mut(0)
            .unwrap()
            .listeners_mut()
            .add(recorder(&seen));
        driver.add(b"-b").unwrap();

        assert!(driver.frame_mut(0).unwrap().listeners_mut().remove(handle));
        driver.add(b"-c").unwrap();

        assert_eq!(pairs(&seen), vec![(0, b"b".to_vec())]);
        assert_eq!(driver.stats().frames_matched, 3);
        assert!(driver.frame(1).is_none());
        assert!(driver.frame_mut(1).is_none());
    }

    #[test]
    fn spec_lookup_preserves_registration_order() {
        let driver = Driver::builder()
            .frame(FrameSpec::builder(5, "x").fixed(1).build().unwrap())
            .frame(FrameSpec::builder(2, "y").fixed(1).build().unwrap())
            .build()
            .unwrap();

        let ids: Vec<FrameId> = driver.frames().iter().map(FrameSpec::id).collect();
        assert_eq!(ids, vec![5, 2]);
        assert_eq!(driver.frame(2).unwrap().header(), b"y");
    }
}
