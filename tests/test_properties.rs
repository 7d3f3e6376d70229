//! Property tests: signature ID allocation, stamp coverage and DER
//! round-trips of the seal and envelope structures.

mod common;

use common::ofd_workspace;
use der::{Decode, Encode};
use ofd_sign::gm::ses::{PictureInfo, SesHeader, SesVersion};
use ofd_sign::gm::sm2strut::ContentInfo;
use ofd_sign::signatures::{
    CuttingRideStampPos, NumberFormatSignId, OfdDocument, RidingStampPos, Side, SignIdProvider,
    StampAnnot, StampAppearance, StandFormatSignId,
};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![
        Just(Side::Left),
        Just(Side::Right),
        Just(Side::Top),
        Just(Side::Bottom),
    ]
}

/// Clipped extent along the axis the seal is cut on.
fn cut_extent(side: Side, annot: &StampAnnot) -> f64 {
    let clip = annot.clip.expect("fragments are clipped");
    match side {
        Side::Left | Side::Right => clip.width,
        Side::Top | Side::Bottom => clip.height,
    }
}

fn full_extent(side: Side, width: f64, height: f64) -> f64 {
    match side {
        Side::Left | Side::Right => width,
        Side::Top | Side::Bottom => height,
    }
}

fn per_page(annots: &[StampAnnot], pages: usize) -> Vec<Vec<&StampAnnot>> {
    (1..=pages)
        .map(|p| {
            let id = p.to_string();
            annots.iter().filter(|a| a.page_ref == id).collect()
        })
        .collect()
}

prop_compose! {
    fn ratios(len: usize)(r in prop::collection::vec(0.05f64..0.95, len)) -> Vec<f64> {
        r
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_number_ids_strictly_increase(n in 1usize..60) {
        let mut ids = NumberFormatSignId::new();
        let mut last = 0u32;
        for expected in 1..=n {
            let id = ids.increment_and_get().unwrap();
            prop_assert_eq!(&id, &expected.to_string());
            let value = ids.parse(&id).unwrap();
            prop_assert!(value > last);
            last = value;
        }
    }

    #[test]
    fn prop_standard_ids_strictly_increase(n in 1usize..60) {
        let mut ids = StandFormatSignId::new();
        for expected in 1..=n {
            prop_assert_eq!(ids.increment_and_get().unwrap(), format!("s{:03}", expected));
        }
    }

    #[test]
    fn prop_seeded_provider_continues(k in 0u32..5000) {
        let mut number = NumberFormatSignId::seeded(&k.to_string()).unwrap();
        prop_assert_eq!(number.increment_and_get().unwrap(), (k + 1).to_string());

        let mut standard = StandFormatSignId::seeded(&format!("s{:03}", k)).unwrap();
        prop_assert_eq!(standard.increment_and_get().unwrap(), format!("s{:03}", k + 1));
    }

    #[test]
    fn prop_cutting_stamp_halves_cover_seal(
        pages in 2usize..6,
        side in side(),
        width in 10.0f64..80.0,
        height in 10.0f64..80.0,
    ) {
        let ws = ofd_workspace(pages);
        let doc = OfdDocument::load(&ws).unwrap();
        let mut ids = NumberFormatSignId::new();
        let annots = CuttingRideStampPos::new(side, width, height)
            .appearance(&doc, &mut ids)
            .unwrap();
        prop_assert_eq!(annots.len(), 2 * (pages - 1));

        let full = full_extent(side, width, height);
        let by_page = per_page(&annots, pages);
        prop_assert_eq!(by_page[0].len(), 1);
        prop_assert_eq!(by_page[pages - 1].len(), 1);
        prop_assert!((cut_extent(side, by_page[0][0]) - full / 2.0).abs() < EPS);
        prop_assert!((cut_extent(side, by_page[pages - 1][0]) - full / 2.0).abs() < EPS);

        for i in 0..pages - 1 {
            let leading = by_page[i][0];
            let trailing = *by_page[i + 1].last().unwrap();
            let sum = cut_extent(side, leading) + cut_extent(side, trailing);
            prop_assert!((sum - full).abs() < EPS, "boundary {} covers {}", i, sum);
        }
        for annot in &annots {
            prop_assert!((annot.boundary.width - width).abs() < EPS);
            prop_assert!((annot.boundary.height - height).abs() < EPS);
        }
    }

    #[test]
    fn prop_cutting_stamp_ratios_cover_seal(
        (pages, split) in (2usize..6).prop_flat_map(|p| (Just(p), ratios(p - 1))),
        side in side(),
    ) {
        let (width, height) = (40.0, 30.0);
        let ws = ofd_workspace(pages);
        let doc = OfdDocument::load(&ws).unwrap();
        let mut ids = NumberFormatSignId::new();
        let annots = CuttingRideStampPos::new(side, width, height)
            .with_ratios(split.clone())
            .appearance(&doc, &mut ids)
            .unwrap();

        let full = full_extent(side, width, height);
        let by_page = per_page(&annots, pages);
        for (i, ratio) in split.iter().enumerate() {
            let leading = cut_extent(side, by_page[i][0]);
            let trailing = cut_extent(side, by_page[i + 1].last().unwrap());
            prop_assert!((leading - full * ratio).abs() < EPS);
            prop_assert!((leading + trailing - full).abs() < EPS);
        }
    }

    #[test]
    fn prop_riding_stamp_slices_cover_seal(
        pages in 1usize..8,
        side in side(),
        width in 10.0f64..80.0,
        height in 10.0f64..80.0,
    ) {
        let ws = ofd_workspace(pages);
        let doc = OfdDocument::load(&ws).unwrap();
        let mut ids = NumberFormatSignId::new();
        let annots = RidingStampPos::new(side, width, height)
            .appearance(&doc, &mut ids)
            .unwrap();
        prop_assert_eq!(annots.len(), pages);

        let full = full_extent(side, width, height);
        let total: f64 = annots.iter().map(|a| cut_extent(side, a)).sum();
        prop_assert!((total - full).abs() < 1e-6);
        for annot in &annots {
            prop_assert!((cut_extent(side, annot) - full / pages as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn prop_stamp_ids_unique(pages in 2usize..6) {
        let ws = ofd_workspace(pages);
        let doc = OfdDocument::load(&ws).unwrap();
        let mut ids = NumberFormatSignId::new();
        let annots = CuttingRideStampPos::new(Side::Right, 40.0, 40.0)
            .appearance(&doc, &mut ids)
            .unwrap();
        let mut seen: Vec<&str> = annots.iter().map(|a| a.id.as_str()).collect();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), annots.len());
    }

    #[test]
    fn prop_ses_header_roundtrip(vid in "[A-Za-z0-9]{1,16}", v4 in any::<bool>()) {
        let version = if v4 { SesVersion::V4 } else { SesVersion::V1 };
        let header = SesHeader::new(version, &vid).unwrap();
        let der = header.to_der().unwrap();
        prop_assert_eq!(SesHeader::from_der(&der).unwrap(), header);
    }

    #[test]
    fn prop_picture_info_roundtrip(
        data in prop::collection::vec(any::<u8>(), 0..512),
        width in any::<u32>(),
        height in any::<u32>(),
    ) {
        let picture = PictureInfo::new("PNG", data, width, height).unwrap();
        let der = picture.to_der().unwrap();
        prop_assert_eq!(PictureInfo::from_der(&der).unwrap(), picture);
    }

    #[test]
    fn prop_content_info_carries_plaintext(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let info = ContentInfo::data(&data).unwrap();
        let decoded = ContentInfo::from_der(&info.to_der().unwrap()).unwrap();
        prop_assert_eq!(decoded.plaintext().unwrap(), Some(data));
    }
}
