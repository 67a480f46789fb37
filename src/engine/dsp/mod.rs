pub mod resampler;
