use std::io::{self, Read};
use std::sync::Arc;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    CachingCons, CachingProd, HeapRb,
};

/// Fixed-size byte buffer reused for every chunk read from the source.
pub struct SampleBuffer {
    bytes: Box<[u8]>,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Reads from `source` until the buffer is full or the input ends.
    /// Returns how many bytes were read; zero means end of input.
    pub fn fill_from<R: Read>(&mut self, source: &mut R) -> io::Result<usize> {
        let mut filled = 0;
        while filled < self.bytes.len() {
            match source.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// The first `len` bytes of the last fill.
    pub fn filled(&self, len: usize) -> &[u8] {
        &self.bytes[..len]
    }
}

/// Producer half of the sample queue. Fed by `write` on the caller's thread.
pub struct SampleProducer {
    inner: CachingProd<Arc<HeapRb<f32>>>,
}

/// Consumer half of the sample queue. Drained by the output callback.
pub struct SampleConsumer {
    inner: CachingCons<Arc<HeapRb<f32>>>,
}

impl SampleProducer {
    /// Pushes as many samples as fit. Returns the number pushed.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.inner.push_slice(samples)
    }

    pub fn vacant_len(&self) -> usize {
        self.inner.vacant_len()
    }
}

impl SampleConsumer {
    /// Returns None if the queue is empty.
    pub fn pop(&mut self) -> Option<f32> {
        self.inner.try_pop()
    }
}

/// Creates a sample queue holding up to `capacity` samples.
pub fn create_sample_queue(capacity: usize) -> (SampleProducer, SampleConsumer) {
    let rb = HeapRb::<f32>::new(capacity);
    let (prod, cons) = rb.split();
    (
        SampleProducer { inner: prod },
        SampleConsumer { inner: cons },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn fill_stops_at_capacity() {
        let mut buffer = SampleBuffer::new(4);
        let mut source = Cursor::new(vec![1u8, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.fill_from(&mut source).unwrap(), 4);
        assert_eq!(buffer.filled(4), &[1, 2, 3, 4]);
        assert_eq!(buffer.fill_from(&mut source).unwrap(), 2);
        assert_eq!(buffer.filled(2), &[5, 6]);
        assert_eq!(buffer.fill_from(&mut source).unwrap(), 0);
    }

    #[test]
    fn fill_gathers_short_reads() {
        let data: Vec<u8> = (0..10).collect();
        let mut source = Trickle { data: &data, step: 3 };
        let mut buffer = SampleBuffer::new(8);
        assert_eq!(buffer.fill_from(&mut source).unwrap(), 8);
        assert_eq!(buffer.filled(8), &data[..8]);
    }

    #[test]
    fn queue_is_bounded_and_fifo() {
        let (mut producer, mut consumer) = create_sample_queue(3);
        assert_eq!(producer.push_slice(&[0.1, 0.2, 0.3, 0.4]), 3);
        assert_eq!(producer.vacant_len(), 0);
        assert_eq!(consumer.pop(), Some(0.1));
        assert_eq!(consumer.pop(), Some(0.2));
        assert_eq!(consumer.pop(), Some(0.3));
        assert_eq!(consumer.pop(), None);
    }
}
