use crate::bridge::dispatch::InferReply;
use crate::status::LogicStatus;

/// Caller-provided output region with a fixed capacity.
///
/// Data is written whole or not at all: when the result does not fit, only
/// the required size is reported and the region is left untouched.
pub struct OutputBuffer<'a> {
    buf: &'a mut [u8],
}

impl<'a> OutputBuffer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    /// Copy `data` in if it fits and report the outcome.
    pub fn fill(self, data: &[u8]) -> InferReply {
        let required = data.len();
        if required > self.buf.len() {
            return InferReply {
                status: LogicStatus::BufferTooSmall,
                required,
            };
        }
        self.buf[..required].copy_from_slice(data);
        InferReply {
            status: LogicStatus::Ok,
            required,
        }
    }
}
