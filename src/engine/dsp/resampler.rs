use rubato::{Resampler as RubatoResampler, Fft, FixedSync};
use audioadapter_buffers::direct::SequentialSliceOfVecs;

/// Converts interleaved samples from the file rate to the device rate.
///
/// Input is collected until a whole chunk is available, so output lags the
/// input by up to one chunk until [`Resampler::flush`] is called.
pub struct Resampler {
    resampler: Fft<f32>,
    channels: usize,
    chunk_size: usize,
    pending: Vec<f32>,
    input: Vec<Vec<f32>>,
    output: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: usize,
        chunk_size: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let resampler = Fft::<f32>::new(
            source_sample_rate as usize,
            target_sample_rate as usize,
            chunk_size,
            2,
            channels,
            FixedSync::Input,
        )?;

        Ok(Self {
            resampler,
            channels,
            chunk_size,
            pending: Vec::with_capacity(chunk_size * channels),
            input: vec![vec![0.0; chunk_size]; channels],
            output: vec![Vec::new(); channels],
        })
    }

    /// Feeds interleaved `input` and appends every completed chunk to `out`.
    pub fn process(
        &mut self,
        input: &[f32],
        out: &mut Vec<f32>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.pending.extend_from_slice(input);

        let chunk_len = self.chunk_size * self.channels;
        let mut start = 0;
        while self.pending.len() - start >= chunk_len {
            let chunk = &self.pending[start..start + chunk_len];
            for (i, frame) in chunk.chunks_exact(self.channels).enumerate() {
                for (ch, sample) in frame.iter().enumerate() {
                    self.input[ch][i] = *sample;
                }
            }

            let out_len = self.resampler.output_frames_next();
            for channel in self.output.iter_mut() {
                channel.resize(out_len, 0.0);
            }

            let input_adapter =
                SequentialSliceOfVecs::new(&self.input, self.channels, self.chunk_size)?;
            let mut output_adapter =
                SequentialSliceOfVecs::new_mut(&mut self.output, self.channels, out_len)?;
            self.resampler
                .process_into_buffer(&input_adapter, &mut output_adapter, None)?;

            for i in 0..out_len {
                for ch in 0..self.channels {
                    out.push(self.output[ch][i]);
                }
            }
            start += chunk_len;
        }
        self.pending.drain(..start);
        Ok(())
    }

    /// Pads the partial chunk with silence and pushes it through.
    pub fn flush(&mut self, out: &mut Vec<f32>) -> Result<(), Box<dyn std::error::Error>> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let remaining_frames = self.pending.len() / self.channels;
        let padding_needed = (self.chunk_size - remaining_frames) * self.channels;
        self.pending.resize(self.pending.len() + padding_needed, 0.0);

        self.process(&[], out)
    }
}
