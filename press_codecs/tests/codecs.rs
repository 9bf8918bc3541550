/// Tests for the bundled codecs and the file-level `Compression` API.
///
/// External-process tests look for `xz` in `PATH`; when it is missing they
/// print a skip message and return instead of failing.
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use press_codecs::{codec_for, Compression, ExternalCodec, GzipCodec, Lz4Codec, SnappyCodec, ZstdCodec};
use press_core::config::find_in_path;
use press_core::{Codec, CompressionConfig, Error, Mode};

fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

fn compressible_bytes(len: usize) -> Vec<u8> {
    let pattern = b"lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
    (0..len).map(|i| pattern[i % pattern.len()]).collect()
}

// ── codecs ─────────────────────────────────────────────────────────────────

#[test]
fn test_block_roundtrip_every_in_process_codec() {
    let codecs: Vec<Box<dyn Codec>> = vec![
        Box::new(GzipCodec::new(0)),
        Box::new(GzipCodec::new(9)),
        Box::new(Lz4Codec),
        Box::new(SnappyCodec),
        Box::new(ZstdCodec::new(19)),
    ];
    let block = compressible_bytes(70_000);
    for codec in codecs {
        let compressed = codec.compress_block(&block).unwrap();
        assert_eq!(codec.decompress_block(&compressed).unwrap(), block, "{}", codec.name());
        assert_eq!(codec.decompress_block(&codec.compress_block(&[]).unwrap()).unwrap(), b"");
    }
}

#[test]
fn test_garbage_input_is_corrupt() {
    let codecs: Vec<Box<dyn Codec>> =
        vec![Box::new(GzipCodec::default()), Box::new(SnappyCodec), Box::new(ZstdCodec::default())];
    let garbage = pseudo_random_bytes(300, 42);
    for codec in codecs {
        let err = codec.decompress_block(&garbage).unwrap_err();
        assert!(err.is_corrupt(), "{}: {err}", codec.name());
    }
}

#[test]
fn test_gzip_store_keeps_bytes_verbatim() {
    let raw = pseudo_random_bytes(1000, 1);
    let stored = GzipCodec::new(0).compress_block(&raw).unwrap();
    assert!(stored.windows(raw.len()).any(|w| w == raw.as_slice()));
}

#[test]
fn test_codec_for_every_mode_name() {
    for mode in Mode::ALL {
        assert_eq!(mode.name().parse::<Mode>().unwrap(), mode);
        if mode.external_command().is_none() {
            let codec = codec_for(&CompressionConfig::new(mode, 1024)).unwrap();
            assert!(!codec.name().is_empty());
        }
    }
    assert!(matches!("brotli".parse::<Mode>(), Err(Error::Config(_))));
}

#[test]
fn test_file_extensions() {
    let ext = |mode| Compression::new(CompressionConfig::new(mode, 1024)).unwrap().file_extension();
    assert_eq!(ext(Mode::GzipStore), ".gz");
    assert_eq!(ext(Mode::GzipMax), ".gz");
    assert_eq!(ext(Mode::Lz4), ".lz4");
    assert_eq!(ext(Mode::Snappy), ".snap");
    assert_eq!(ext(Mode::Zstd), ".zst");
    assert_eq!(Mode::Xz.extension(), ".xzgz");
}

// ── configuration ──────────────────────────────────────────────────────────

#[test]
fn test_invalid_configuration_fails_fast() {
    let zero_block = CompressionConfig::new(Mode::Lz4, 0);
    assert!(matches!(Compression::new(zero_block), Err(Error::Config(_))));

    let zero_workers = CompressionConfig::new(Mode::Lz4, 1024).with_worker_count(0);
    assert!(matches!(Compression::new(zero_workers), Err(Error::Config(_))));
}

#[test]
fn test_missing_external_backend_fails_at_construction() {
    let config = CompressionConfig::new(Mode::Xz, 1 << 20).with_backend_path("/definitely/not/here/xz");
    assert!(matches!(Compression::new(config), Err(Error::BackendNotFound(_))));
}

#[test]
fn test_failing_backend_is_a_backend_error() {
    // `false` exits non-zero without reading its input.
    let Some(binary) = find_in_path("false") else {
        println!("SKIP test_failing_backend_is_a_backend_error: no `false` binary");
        return;
    };
    let codec = ExternalCodec::xz(&binary, false);
    assert_eq!(codec.binary(), binary.as_path());
    let err = codec.compress_block(&compressible_bytes(200_000)).unwrap_err();
    assert!(matches!(err, Error::Backend(_)), "{err}");
}

// ── heuristic ──────────────────────────────────────────────────────────────

#[test]
fn test_heuristic_separates_zeros_from_noise() {
    let config = CompressionConfig::new(Mode::GzipDefault, 1 << 17)
        .with_heuristic_bytes(256 * 1024)
        .with_max_compression_ratio(0.9);
    let press = Compression::new(config).unwrap();

    let zeros = vec![0u8; 300 * 1024];
    let info = press.compression_info(&zeros[..]).unwrap();
    assert!(info.compressible);
    assert_eq!(info.extension, ".gz");
    assert!(info.ratio < 0.01);

    let noise = pseudo_random_bytes(300 * 1024, 0xC0FFEE);
    let info = press.compression_info(&noise[..]).unwrap();
    assert!(!info.compressible, "ratio {}", info.ratio);
    assert_eq!(info.extension, ".bin");
}

#[test]
fn test_heuristic_short_input_is_an_error() {
    let config = CompressionConfig::new(Mode::Lz4, 4096).with_heuristic_bytes(1024);
    let press = Compression::new(config).unwrap();
    let err = press.compression_info(&[1u8; 100][..]).unwrap_err();
    match err {
        Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("expected an I/O error, got {other}"),
    }
}

// ── file API ───────────────────────────────────────────────────────────────

#[test]
fn test_compress_and_decompress_files() {
    let config = CompressionConfig::new(Mode::Zstd, 64 * 1024).with_worker_count(4);
    let press = Compression::new(config).unwrap();
    let data = compressible_bytes(1_000_000);

    let mut source = tempfile::tempfile().unwrap();
    source.write_all(&data).unwrap();
    source.seek(SeekFrom::Start(0)).unwrap();

    let mut artifact = tempfile::NamedTempFile::new().unwrap();
    let summary = press.compress_file(&mut source, artifact.as_file_mut()).unwrap();
    assert_eq!(summary.blocks, 16);
    assert_eq!(summary.raw_bytes, data.len() as u64);

    let file = File::open(artifact.path()).unwrap();
    let total = file.metadata().unwrap().len();
    assert_eq!(total, summary.artifact_bytes);

    let (mut reader, size) = press.decompress_file(file, total).unwrap();
    assert_eq!(size, data.len() as u64);

    reader.seek(SeekFrom::Start(654_321)).unwrap();
    let mut window = [0u8; 100];
    reader.read_exact(&mut window).unwrap();
    assert_eq!(&window[..], &data[654_321..654_421]);

    reader.seek(SeekFrom::Start(0)).unwrap();
    let mut all = Vec::new();
    reader.read_to_end(&mut all).unwrap();
    assert_eq!(all, data);
}

#[test]
fn test_xz_roundtrip_when_available() {
    let config = CompressionConfig::new(Mode::XzMin, 16 * 1024).with_worker_count(3);
    let press = match Compression::new(config) {
        Ok(p) => p,
        Err(Error::BackendNotFound(_)) => {
            println!("SKIP test_xz_roundtrip_when_available: xz binary not found");
            return;
        }
        Err(e) => panic!("unexpected error: {e}"),
    };

    for len in [0usize, 16 * 1024, 50_001] {
        let data = compressible_bytes(len);
        let mut artifact = Vec::new();
        press.compress_file(&data[..], &mut artifact).unwrap();

        let total = artifact.len() as u64;
        let (mut reader, size) = press.decompress_file(Cursor::new(artifact), total).unwrap();
        assert_eq!(size, len as u64);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
