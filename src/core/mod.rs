pub mod codec;
pub mod dsp;
pub mod filter;
pub mod noise;
pub mod normalize;
pub mod pipeline;
pub mod silence;
