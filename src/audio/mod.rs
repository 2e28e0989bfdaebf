pub mod pcm;

#[cfg(feature = "wav")]
pub mod wav;

pub use pcm::{decimate, decimation_factor, mix_to_mono};

#[cfg(feature = "wav")]
pub use wav::{read_wav_mono, write_wav};
