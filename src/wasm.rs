use wasm_bindgen::prelude::*;

use crate::hash::{find_hashes, Hash};
use crate::matcher::Matcher;
use crate::peaks::find_peaks;
use crate::spectrogram::build_spectrogram;

/// Fingerprint mono PCM at 11025 Hz into a hash list.
/// Returns an array of `{ time, key }` objects.
#[wasm_bindgen]
pub fn fingerprint(pcm: &js_sys::Float32Array) -> Result<JsValue, JsValue> {
    let samples = pcm.to_vec();
    let spectrogram =
        build_spectrogram(&samples).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let hashes = find_hashes(&find_peaks(&spectrogram));

    serde_wasm_bindgen::to_value(&hashes).map_err(JsValue::from)
}

/// Match two fingerprints produced by `fingerprint`.
/// Returns `{ score, offset_secs, summary }`.
#[wasm_bindgen]
pub fn match_fingerprints(a: JsValue, b: JsValue) -> Result<JsValue, JsValue> {
    let mut song_a: Vec<Hash> = serde_wasm_bindgen::from_value(a)?;
    let mut song_b: Vec<Hash> = serde_wasm_bindgen::from_value(b)?;

    let result = Matcher::new().match_hashes(&mut song_a, &mut song_b);
    serde_wasm_bindgen::to_value(&result).map_err(JsValue::from)
}
