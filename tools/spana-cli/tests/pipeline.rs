//! Compile a voice pack from WAV files, then inspect, decode, extract and patch it

use std::num::NonZeroU32;
use std::path::Path;

use spana_cli::commands::compile::{CompileOptions, compile};
use spana_cli::commands::decode::decode_all;
use spana_cli::commands::extract::extract_matching;
use spana_cli::commands::patch::{PatchEdit, patch_image};
use spana_cli::read_wav;
use spana_image::{
    ENTRY_SIZE, FLASH_SIZE, HEADER_SIZE, LabelTable, OffsetTableDb, SOUND_SECTION_START,
    TABLE_LENGTH,
};

fn write_wav(path: &Path, amplitude: f64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 10_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..30 {
        let s = amplitude * (i as f64 * 0.3).sin();
        writer.write_sample(s as i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// One WAV per index except the default alias 220
fn wav_dir(dir: &Path) {
    for index in 0..TABLE_LENGTH as usize {
        if index == 220 {
            continue;
        }
        write_wav(&dir.join(format!("{index:03}.wav")), 1000.0 + index as f64 * 10.0);
    }
}

fn options(root: &Path) -> CompileOptions {
    let wavs = root.join("wavs");
    std::fs::create_dir(&wavs).unwrap();
    wav_dir(&wavs);

    CompileOptions {
        wav_dir: wavs,
        output: root.join("pack.bin"),
        sample_rate: NonZeroU32::new(10_000).unwrap(),
        jobs: Some(2),
        gain: None,
        aliases: vec![(220, 217)],
    }
}

#[test]
fn test_compile_then_decode() {
    let root = tempfile::tempdir().unwrap();
    let options = options(root.path());

    let compiled = compile(&options).unwrap();
    let image = std::fs::read(&options.output).unwrap();
    assert_eq!(image, compiled.image);
    assert_eq!(image.len(), FLASH_SIZE as usize);

    let db = OffsetTableDb::parse(&image).into_value();
    assert_eq!(db[0].sound_data_start_addr, SOUND_SECTION_START);
    assert_eq!(db[220].sound_data_start_addr, db[217].sound_data_start_addr);
    assert_eq!(compiled.addresses.len(), TABLE_LENGTH as usize - 1);
    assert!(db.iter().all(|e| e.sample_rate_hz() == Some(10_000)));

    let out = root.path().join("decoded");
    let decoded = decode_all(&image, &db, &out).unwrap();
    assert_eq!(decoded.len(), TABLE_LENGTH as usize);
    // 219's inferred end is the aliased 220's start, which is behind it, so
    // it decodes up to its own trailer instead
    assert!(db.byte_range(219, image.len()).is_some_and(|r| r.is_empty()));
    for entry in &decoded {
        assert_eq!(entry.samples, 46, "entry {}", entry.index);
    }

    let wav = read_wav(&out.join("ss_000_???.wav")).unwrap();
    assert_eq!(wav.sample_rate, 10_000);
    assert_eq!(wav.samples.len(), 46);
    assert_eq!(wav.samples.iter().map(|s| s.abs()).max(), Some(32767));
}

#[test]
fn test_compile_requires_every_index() {
    let root = tempfile::tempdir().unwrap();
    let options = options(root.path());
    std::fs::remove_file(options.wav_dir.join("100.wav")).unwrap();

    let err = compile(&options).unwrap_err().to_string();
    assert!(err.contains("*100*.wav"), "{err}");
    assert!(!options.output.exists());
}

#[test]
fn test_extract_and_patch_compiled_image() {
    let root = tempfile::tempdir().unwrap();
    let options = options(root.path());
    let image = compile(&options).unwrap().image;

    let mut db = OffsetTableDb::parse(&image).into_value();
    let labels = LabelTable::from_toml_str(
        "[[phrase]]\nindex = 42\nlabel = \"Angel\"\n[[phrase]]\nindex = 43\nlabel = \"Another\"\n",
    )
    .unwrap();
    db.apply_labels(&labels);

    let out = root.path().join("extracted");
    let written = extract_matching(&image, &db, "Angel", &out).unwrap();
    assert_eq!(written, vec![out.join("sound_data_042_Angel.bin")]);
    let payload = std::fs::read(&written[0]).unwrap();
    let range = db.byte_range(42, image.len()).unwrap();
    assert_eq!(payload, image[range]);

    let patched_path = root.path().join("patched.bin");
    let patched = patch_image(
        &image,
        5,
        PatchEdit::Rate(NonZeroU32::new(8_000).unwrap()),
        &patched_path,
    )
    .unwrap();
    let record = HEADER_SIZE + ENTRY_SIZE * 5;
    let changed: Vec<usize> = (0..image.len()).filter(|&i| image[i] != patched[i]).collect();
    assert!(!changed.is_empty());
    assert!(changed.iter().all(|&i| (record..record + 2).contains(&i)));
    assert_eq!(std::fs::read(&patched_path).unwrap(), patched);
}
