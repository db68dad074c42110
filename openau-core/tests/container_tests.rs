//! Container parsing tests
//!
//! Drives `read_layout` end to end over files written by hound and over
//! hand-assembled byte streams.

mod helpers;

use std::fs::File;
use std::io::{BufReader, Cursor, Read};

use helpers::wav_builder::pcm16_frames;
use helpers::{generate_pcm16_wav, generate_pcm8_wav, ramp_sample, WavBuilder};
use openau_core::{read_layout, Error, SampleFormat};
use tempfile::TempDir;

fn parse(bytes: Vec<u8>) -> openau_core::Result<openau_core::WavLayout> {
    read_layout(Cursor::new(bytes)).map(|(layout, _)| layout)
}

#[test]
fn test_hound_pcm16_stereo() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ramp.wav");
    generate_pcm16_wav(&path, 44100, 2, 1000).unwrap();

    let (layout, mut input) = read_layout(BufReader::new(File::open(&path).unwrap())).unwrap();
    let d = layout.descriptor;
    assert_eq!(d.sample_rate, 44100);
    assert_eq!(d.channel_count, 2);
    assert_eq!(d.sample_format, SampleFormat::Int16);
    assert_eq!(usize::from(d.bytes_per_sample * d.channel_count), usize::from(d.block_align));
    assert_eq!(layout.total_frames(), 1000);

    // Reader is left on the first PCM byte
    let mut first = [0u8; 4];
    input.read_exact(&mut first).unwrap();
    assert_eq!(i16::from_le_bytes([first[0], first[1]]), ramp_sample(0, 0));
    assert_eq!(i16::from_le_bytes([first[2], first[3]]), ramp_sample(0, 1));
}

#[test]
fn test_hound_pcm8_mono() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saw.wav");
    generate_pcm8_wav(&path, 22050, 1, 300).unwrap();

    let (layout, _) = read_layout(BufReader::new(File::open(&path).unwrap())).unwrap();
    assert_eq!(layout.descriptor.sample_format, SampleFormat::Int8);
    assert_eq!(layout.descriptor.bytes_per_sample, 1);
    assert_eq!(layout.descriptor.block_align, 1);
    assert_eq!(layout.total_frames(), 300);
}

#[test]
fn test_block_align_matches_descriptor_for_many_formats() {
    let cases = [
        (1u16, 8u16),
        (2, 16),
        (6, 24),
        (4, 32),
        (8, 16),
    ];
    for (channels, bits) in cases {
        let layout = parse(
            WavBuilder::new()
                .pcm_fmt(channels, 48000, bits)
                .data(&vec![0u8; usize::from(channels * bits / 8) * 3])
                .build(),
        )
        .unwrap();
        let d = layout.descriptor;
        assert_eq!(d.bytes_per_sample * d.channel_count, channels * bits / 8);
        assert_eq!(d.block_align, channels * bits / 8);
        assert_eq!(layout.total_frames(), 3);
    }
}

#[test]
fn test_ieee_float_stereo() {
    let layout = parse(
        WavBuilder::new()
            .fmt(3, 2, 96000, 96000 * 8, 8, 32)
            .data(&[0u8; 80])
            .build(),
    )
    .unwrap();
    assert_eq!(layout.descriptor.sample_format, SampleFormat::Float32);
    assert_eq!(layout.total_frames(), 10);
}

#[test]
fn test_unknown_chunks_skipped_with_padding() {
    let pcm = pcm16_frames(5, 2);
    let layout = parse(
        WavBuilder::new()
            .chunk(b"JUNK", &[0xAA; 7])
            .pcm_fmt(2, 44100, 16)
            .chunk(b"LIST", b"INFOISFT")
            .chunk(b"odd ", &[1, 2, 3])
            .data(&pcm)
            .build(),
    )
    .unwrap();
    assert_eq!(layout.total_frames(), 5);
    // 12 preamble + JUNK 16 + fmt 24 + LIST 16 + odd 12 + data header 8
    assert_eq!(layout.data.offset, 88);
}

#[test]
fn test_chunk_length_past_end_is_truncated_input() {
    let bytes = WavBuilder::new()
        .pcm_fmt(2, 44100, 16)
        .chunk_with_len(b"JUNK", 10_000, &[0u8; 10])
        .build();
    match parse(bytes) {
        Err(Error::TruncatedInput { needed, available, .. }) => {
            assert_eq!(needed, 10_000);
            assert_eq!(available, 10);
        }
        other => panic!("Expected TruncatedInput, got {:?}", other),
    }
}

#[test]
fn test_data_length_past_end_is_truncated_input() {
    let bytes = WavBuilder::new()
        .pcm_fmt(2, 44100, 16)
        .chunk_with_len(b"data", 4000, &pcm16_frames(10, 2))
        .build();
    assert!(matches!(parse(bytes), Err(Error::TruncatedInput { .. })));
}

#[test]
fn test_fmt_length_past_end_is_truncated_input() {
    let bytes = WavBuilder::new()
        .chunk_with_len(b"fmt ", 16, &[1, 0, 2, 0])
        .build();
    assert!(matches!(parse(bytes), Err(Error::TruncatedInput { .. })));
}

#[test]
fn test_every_truncation_point_fails_cleanly() {
    let full = WavBuilder::new()
        .chunk(b"JUNK", &[0; 6])
        .pcm_fmt(2, 44100, 16)
        .data(&pcm16_frames(4, 2))
        .build();
    let data_header_end = full.len() - 16;

    for cut in 0..data_header_end {
        let result = parse(full[..cut].to_vec());
        assert!(result.is_err(), "prefix of {} bytes parsed", cut);
        assert!(result.unwrap_err().is_parse_error());
    }
}

#[test]
fn test_streaming_sentinel_plays_to_end_of_file() {
    let pcm = pcm16_frames(25, 2);
    let layout = parse(
        WavBuilder::new()
            .pcm_fmt(2, 44100, 16)
            .chunk_with_len(b"data", u32::MAX, &pcm)
            .build(),
    )
    .unwrap();
    assert_eq!(layout.data.len, pcm.len() as u64);
    assert_eq!(layout.total_frames(), 25);
}

#[test]
fn test_12_bit_pcm_is_unsupported_sample_format() {
    let bytes = WavBuilder::new()
        .fmt(1, 2, 44100, 44100 * 4, 4, 12)
        .data(&[0u8; 8])
        .build();
    match parse(bytes) {
        Err(Error::UnsupportedSampleFormat {
            format_tag,
            bits_per_sample,
        }) => {
            assert_eq!(format_tag, 1);
            assert_eq!(bits_per_sample, 12);
        }
        other => panic!("Expected UnsupportedSampleFormat, got {:?}", other),
    }
}

#[test]
fn test_byte_rate_mismatch_is_inconsistent_header() {
    // Each field is plausible on its own; together they disagree
    let bytes = WavBuilder::new()
        .fmt(1, 2, 44100, 88200, 4, 16)
        .data(&[0u8; 8])
        .build();
    assert!(matches!(parse(bytes), Err(Error::InconsistentHeader(_))));
}

#[test]
fn test_block_align_mismatch_is_inconsistent_header() {
    let bytes = WavBuilder::new()
        .fmt(1, 2, 44100, 44100 * 6, 6, 16)
        .data(&[0u8; 12])
        .build();
    assert!(matches!(parse(bytes), Err(Error::InconsistentHeader(_))));
}

#[test]
fn test_compressed_format_rejected() {
    // WAVE_FORMAT_ADPCM
    let bytes = WavBuilder::new()
        .fmt(2, 1, 8000, 4096, 256, 4)
        .data(&[0u8; 256])
        .build();
    assert!(matches!(parse(bytes), Err(Error::UnsupportedFormat(2))));
}

#[test]
fn test_data_before_fmt() {
    let bytes = WavBuilder::new()
        .data(&pcm16_frames(2, 2))
        .pcm_fmt(2, 44100, 16)
        .build();
    assert!(matches!(parse(bytes), Err(Error::DataBeforeFormat)));
}

#[test]
fn test_missing_data_chunk() {
    let bytes = WavBuilder::new().pcm_fmt(2, 44100, 16).build();
    assert!(matches!(parse(bytes), Err(Error::TruncatedInput { .. })));
}

#[test]
fn test_not_a_riff_file() {
    let mut bytes = WavBuilder::new().pcm_fmt(1, 8000, 8).data(&[0; 4]).build();
    bytes[8..12].copy_from_slice(b"AVI ");
    assert!(matches!(parse(bytes), Err(Error::NotAContainer(_))));

    assert!(matches!(
        parse(b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00".to_vec()),
        Err(Error::NotAContainer(_))
    ));
}

#[test]
fn test_wrong_riff_size_tolerated() {
    let layout = parse(
        WavBuilder::new()
            .pcm_fmt(1, 8000, 16)
            .data(&[0u8; 20])
            .riff_size(0)
            .build(),
    )
    .unwrap();
    assert_eq!(layout.total_frames(), 10);
}

#[test]
fn test_last_fmt_chunk_wins() {
    let layout = parse(
        WavBuilder::new()
            .pcm_fmt(1, 8000, 8)
            .pcm_fmt(2, 48000, 16)
            .data(&pcm16_frames(3, 2))
            .build(),
    )
    .unwrap();
    assert_eq!(layout.descriptor.sample_rate, 48000);
    assert_eq!(layout.descriptor.channel_count, 2);
}
