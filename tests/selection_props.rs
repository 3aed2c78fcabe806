use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use picture_uploader::image_handler::{
    ImageBuffer as SourceBuffer, ImageConfig, ImageHandler, ImageSource, MAX_SELECTION,
    ResizeMode, ResizePolicy, format_size, merge_selection,
};
use proptest::prelude::*;

fn sources(names: &[u8]) -> Vec<ImageSource> {
    names
        .iter()
        .map(|n| ImageSource::FilePath(PathBuf::from(format!("photo-{}.jpg", n))))
        .collect()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 251) as u8, (y % 251) as u8, 90]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("encode png");
    cursor.into_inner()
}

proptest! {
    #[test]
    fn format_size_is_deterministic(bytes in any::<u64>()) {
        prop_assert_eq!(format_size(bytes), format_size(bytes));
    }

    #[test]
    fn format_size_picks_unit_by_threshold(bytes in 0u64..(64 * 1024 * 1024)) {
        let text = format_size(bytes);
        if bytes < 1024 {
            prop_assert_eq!(text, format!("{} bytes", bytes));
        } else if bytes < 1024 * 1024 {
            prop_assert!(text.ends_with(" KB"));
            let value: f64 = text.trim_end_matches(" KB").parse().expect("numeric KB");
            prop_assert!((value * 1024.0 - bytes as f64).abs() <= 0.005 * 1024.0 + 1e-6);
        } else {
            prop_assert!(text.ends_with(" MB"));
            let value: f64 = text.trim_end_matches(" MB").parse().expect("numeric MB");
            prop_assert!((value * 1048576.0 - bytes as f64).abs() <= 0.005 * 1048576.0 + 1e-3);
        }
    }

    #[test]
    fn merge_keeps_first_occurrences_up_to_cap(
        a in prop::collection::vec(0u8..24, 0..16),
        b in prop::collection::vec(0u8..24, 0..16),
    ) {
        let existing = sources(&a);
        let incoming = sources(&b);
        let outcome = merge_selection(&existing, &incoming, MAX_SELECTION);

        prop_assert!(outcome.selected.len() <= MAX_SELECTION);

        let identities: HashSet<String> = outcome.selected.iter().map(ImageSource::identity).collect();
        prop_assert_eq!(identities.len(), outcome.selected.len());

        let mut expected = Vec::new();
        let mut seen = HashSet::new();
        for source in existing.iter().chain(&incoming) {
            if seen.insert(source.identity()) {
                expected.push(source.clone());
            }
        }
        let unique = expected.len();
        expected.truncate(MAX_SELECTION);

        prop_assert_eq!(&outcome.selected, &expected);
        prop_assert_eq!(outcome.dropped, unique.saturating_sub(MAX_SELECTION));
        prop_assert_eq!(outcome.duplicates, a.len() + b.len() - unique);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn transform_always_yields_target_square(
        width in 1u32..400,
        height in 1u32..400,
        stretch in any::<bool>(),
    ) {
        let mode = if stretch { ResizeMode::StretchToFit } else { ResizeMode::CropToFill };
        let policy = ResizePolicy::new(64, 0.8, mode).expect("policy");
        let bytes = png_bytes(width, height);
        let buffer = SourceBuffer {
            bytes: bytes.clone().into(),
            format: "image/png".to_string(),
            source_hint: "memory",
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let handler = ImageHandler::new(ImageConfig::default());
        let resized = runtime
            .block_on(handler.transform_buffer(buffer, policy))
            .expect("transform");

        prop_assert_eq!((resized.width, resized.height), (64, 64));
        prop_assert_eq!(resized.original_size, bytes.len() as u64);
        prop_assert_eq!(resized.resized_size, resized.bytes.len() as u64);

        let decoded = image::load_from_memory(&resized.bytes).expect("decode jpeg");
        prop_assert_eq!((decoded.width(), decoded.height()), (64, 64));
    }
}
