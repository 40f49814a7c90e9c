use std::fmt;

use bytes::Bytes;
use framesync_ring::{BufferError, RingBuffer};

use crate::error::{FrameError, Result};
use crate::listener::{FrameListener, Listeners};

/// Identifies a frame spec within a driver.
pub type FrameId = u32;

/// How the payload length of a frame is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLength {
    /// Exactly this many payload bytes follow the header. Zero is allowed.
    Fixed(usize),
    /// The payload runs until the frame's terminating byte.
    Variable,
}

impl DataLength {
    pub fn is_variable(self) -> bool {
        matches!(self, DataLength::Variable)
    }
}

impl fmt::Display for DataLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataLength::Fixed(n) => write!(f, "{n}"),
            DataLength::Variable => f.write_str("variable"),
        }
    }
}

/// A matched frame: the id of the spec that recognized it and its payload.
///
/// The payload is an owned copy taken out of the ring buffer; header and
/// terminator bytes are not included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The spec that matched.
    pub id: FrameId,
    /// The payload bytes between header and terminator.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: FrameId, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }
}

/// Result of testing one frame spec against the head of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The buffered bytes cannot start this frame. Nothing was consumed.
    NoMatch,
    /// Not enough bytes are buffered to decide. Nothing was consumed.
    Indeterminate,
    /// The frame was recognized and its full byte span consumed.
    Matched(Frame),
}

/// The immutable shape of one frame plus its listeners.
///
/// Built with [`FrameSpecBuilder`]. Header, data length and terminator cannot
/// change once built; the listener set stays mutable.
pub struct FrameSpec {
    id: FrameId,
    header: Bytes,
    length: DataLength,
    terminator: Option<u8>,
    listeners: Listeners,
}

impl FrameSpec {
    /// Start building a spec with the given id and header bytes.
    pub fn builder(id: FrameId, header: impl Into<Bytes>) -> FrameSpecBuilder {
        FrameSpecBuilder::new(id, header)
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn data_length(&self) -> DataLength {
        self.length
    }

    pub fn terminator(&self) -> Option<u8> {
        self.terminator
    }

    /// Total length on the wire, known only for fixed-length frames.
    ///
    /// [`FrameSpecBuilder::build`] rejects lengths whose sum overflows.
    pub fn frame_len(&self) -> Option<usize> {
        match self.length {
            DataLength::Fixed(n) => Some(self.header.len() + n + self.terminator_len()),
            DataLength::Variable => None,
        }
    }

    /// Shortest possible length on the wire. For variable-length frames this
    /// is the header plus the terminator.
    pub fn min_frame_len(&self) -> usize {
        self.frame_len()
            .unwrap_or_else(|| self.header.len() + self.terminator_len())
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    /// Test this spec against the oldest buffered bytes.
    ///
    /// Only a `Matched` outcome consumes bytes, and it consumes exactly the
    /// frame's header, payload and terminator. Listeners are not invoked here.
    pub fn try_match(
        &self,
        buffer: &mut RingBuffer,
    ) -> std::result::Result<MatchOutcome, BufferError> {
        let header_len = self.header.len();
        if buffer.len() < header_len {
            return Ok(MatchOutcome::Indeterminate);
        }
        if !buffer.starts_with(&self.header) {
            return Ok(MatchOutcome::NoMatch);
        }

        let data_len = match (self.length, self.terminator) {
            (DataLength::Variable, Some(terminator)) => {
                match buffer.position_from(header_len, terminator) {
                    Some(offset) => offset - header_len,
                    None => return Ok(MatchOutcome::Indeterminate),
                }
            }
            // FrameSpecBuilder::build rejects this combination.
            (DataLength::Variable, None) => return Ok(MatchOutcome::NoMatch),
            (DataLength::Fixed(n), terminator) => {
                let frame_len = header_len + n + self.terminator_len();
                if buffer.len() < frame_len {
                    return Ok(MatchOutcome::Indeterminate);
                }
                if let Some(terminator) = terminator {
                    if buffer.peek_at(frame_len - 1)? != terminator {
                        return Ok(MatchOutcome::NoMatch);
                    }
                }
                n
            }
        };

        buffer.discard(header_len)?;
        let payload = buffer.pop_many(data_len)?;
        if self.terminator.is_some() {
            buffer.discard(1)?;
        }

        Ok(MatchOutcome::Matched(Frame {
            id: self.id,
            payload,
        }))
    }

    pub(crate) fn notify(&mut self, frame: &Frame) {
        self.listeners.dispatch(frame);
    }

    fn terminator_len(&self) -> usize {
        usize::from(self.terminator.is_some())
    }
}

impl fmt::Debug for FrameSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSpec")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("length", &self.length)
            .field("terminator", &self.terminator)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Assembles a [`FrameSpec`].
///
/// Data length defaults to [`DataLength::Variable`], which requires a
/// terminator before [`build`](Self::build) succeeds.
pub struct FrameSpecBuilder {
    id: FrameId,
    header: Bytes,
    length: DataLength,
    terminator: Option<u8>,
    listeners: Listeners,
}

impl FrameSpecBuilder {
    pub fn new(id: FrameId, header: impl Into<Bytes>) -> Self {
        Self {
            id,
            header: header.into(),
            length: DataLength::Variable,
            terminator: None,
            listeners: Listeners::new(),
        }
    }

    pub fn data_length(mut self, length: DataLength) -> Self {
        self.length = length;
        self
    }

    /// Payload of exactly `n` bytes.
    pub fn fixed(self, n: usize) -> Self {
        self.data_length(DataLength::Fixed(n))
    }

    /// Payload delimited by the terminator.
    pub fn variable(self) -> Self {
        self.data_length(DataLength::Variable)
    }

    pub fn terminator(mut self, byte: u8) -> Self {
        self.terminator = Some(byte);
        self
    }

    /// Attach a listener invoked for every frame this spec matches.
    pub fn listener<L: FrameListener + 'static>(mut self, listener: L) -> Self {
        self.listeners.add(listener);
        self
    }

    pub fn build(self) -> Result<FrameSpec> {
        if self.header.is_empty() {
            return Err(FrameError::EmptyHeader { id: self.id });
        }
        if self.length.is_variable() && self.terminator.is_none() {
            return Err(FrameError::MissingTerminator { id: self.id });
        }
        if let DataLength::Fixed(length) = self.length {
            self.header
                .len()
                .checked_add(length)
                .and_then(|len| len.checked_add(usize::from(self.terminator.is_some())))
                .ok_or(FrameError::FrameTooLong { id: self.id, length })?;
        }
        Ok(FrameSpec {
            id: self.id,
            header: self.header,
            length: self.length,
            terminator: self.terminator,
            listeners: self.listeners,
        })
    }
}
