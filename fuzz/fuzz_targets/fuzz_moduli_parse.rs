#![no_main]

//! Fuzz target for moduli database parsing and group selection.

use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::SeedableRng;

use dhgex::moduli::{ModuliReader, ModuliSelector};
use dhgex::GroupSizeBounds;

fuzz_target!(|data: &[u8]| {
    for line in ModuliReader::new(data) {
        if let Ok(record) = line {
            let _ = record.effective_size();
        }
    }

    let mut rng = StdRng::seed_from_u64(0);
    let selector = ModuliSelector::new(GroupSizeBounds::new(0, 1024, u32::MAX));
    let _ = selector.select(ModuliReader::new(data), &mut rng);
});
