//! Group selection from moduli databases on disk and in memory.


use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;

use dhgex::moduli::{ModuliReader, ModuliSelector, ModuliSource};
use dhgex::{Error, GroupSizeBounds, ParseWarningKind};
use gex_common::*;

#[test]
fn selects_from_file() {
    let _ = env_logger::try_init();

    let path = std::env::temp_dir().join(format!("dhgex-moduli-{}", std::process::id()));
    fs::write(&path, moduli_db()).expect("write moduli file");

    let selector = ModuliSelector::new(GroupSizeBounds::new(1024, 3072, 8192));
    let mut rng = StdRng::seed_from_u64(1);
    let selection = selector
        .select_from(&ModuliSource::File(path.clone()), &mut rng)
        .expect("select");

    let _ = fs::remove_file(&path);

    // Nothing at 3072; 2048 is the closest below.
    let selected = selection.group.expect("a group");
    assert_eq!(selected.bits, 2048);
    assert_eq!(selected.group.bits(), 2048);
    assert_eq!(selection.candidates, 1);
    assert_eq!(selection.records, 2);
    // The header comment counts as a line.
    assert_eq!(selection.lines, 3);
    assert!(selection.warnings.is_empty());
}

#[test]
fn missing_file_is_unavailable() {
    let selector = ModuliSelector::new(GroupSizeBounds::default());
    let mut rng = StdRng::seed_from_u64(1);
    let err = selector
        .select_from(
            &ModuliSource::File("/nonexistent/dhgex/moduli".into()),
            &mut rng,
        )
        .unwrap_err();
    assert!(matches!(err, Error::SourceUnavailable { .. }));
}

#[test]
fn damaged_lines_are_skipped() {
    let db = format!(
        "# header\n\
         \n\
         20240101000000 2 6 100\n\
         20240101000000 x 6 100 2047 2 FF\n\
         {}\n",
        group14_line()
    );

    let records: Vec<_> = ModuliReader::new(db.as_bytes()).collect();
    assert_eq!(records.len(), 3);

    let warnings: Vec<_> = records
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(|w| (w.line, w.kind.clone()))
        .collect();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0], (3, ParseWarningKind::FieldCount(4)));
    assert_eq!(warnings[1].0, 4);

    let selector = ModuliSelector::new(GroupSizeBounds::default());
    let mut rng = StdRng::seed_from_u64(1);
    let selection = selector.select(records, &mut rng).unwrap();
    assert_eq!(selection.group.unwrap().bits, 2048);
    assert_eq!(selection.warnings.len(), 2);
}
