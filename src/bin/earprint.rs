use std::env;
use std::process;

use earprint::audio::read_wav_mono;
use earprint::{build_spectrogram, find_hashes, find_peaks, Hash, Matcher};

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  earprint cmp <a.wav> <b.wav>   Fingerprint both tracks and print similarity");
    eprintln!("  earprint hash <track.wav>      Print the track's hash list as JSON");
    process::exit(1);
}

fn fingerprint_file(path: &str) -> Result<Vec<Hash>, Box<dyn std::error::Error>> {
    let pcm = read_wav_mono(path)?;
    let spectrogram = build_spectrogram(&pcm)?;
    let peaks = find_peaks(&spectrogram);
    Ok(find_hashes(&peaks))
}

/// Map the raw match percentage onto a friendlier similarity curve:
/// cube root, re-centered and clamped to [0, 100].
fn eq_to_percent(eq: f64) -> f64 {
    if eq <= 0.0 {
        return 0.0;
    }

    let perc = (eq / 100.0).powf(1.0 / 3.0) - 0.3;
    100.0 * (1.4 * perc.max(0.0)).min(1.0)
}

fn cmd_cmp(path_a: &str, path_b: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut hashes_a = fingerprint_file(path_a)?;
    let mut hashes_b = fingerprint_file(path_b)?;

    let shorter = hashes_a.len().min(hashes_b.len());
    if shorter == 0 {
        println!("0 (no data)");
        return Ok(());
    }

    let result = Matcher::new().match_hashes(&mut hashes_a, &mut hashes_b);

    let eq = 100.0 * result.score / shorter as f64;
    println!("{:.3} (offset {:.2} sec)", eq_to_percent(eq), result.offset_secs);
    Ok(())
}

fn cmd_hash(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let hashes = fingerprint_file(path)?;
    println!("{}", serde_json::to_string(&hashes)?);
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }

    let result = match args[1].as_str() {
        "cmp" => {
            if args.len() < 4 {
                usage();
            }
            cmd_cmp(&args[2], &args[3])
        }
        "hash" => cmd_hash(&args[2]),
        _ => {
            eprintln!("Unknown command: {}", args[1]);
            usage();
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
