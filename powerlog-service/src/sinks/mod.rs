pub mod raw_samples;

pub use raw_samples::RawSampleSink;
