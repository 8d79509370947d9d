//! Single pass group selection over the moduli database.
//!
//! The policy is applied one record at a time: the best size seen so far is
//! tracked under the ordering in [`is_better_size`], and among the records tied
//! at that size one is kept by reservoir sampling, so each of `k` tied records
//! ends up selected with probability `1/k` regardless of file order.

use rand::{CryptoRng, Rng};

use super::{ModuliRecord, ModuliSource};
use crate::error::ParseWarning;
use crate::group::{DhGroup, GroupSizeBounds};
use crate::Error;

/// Whether a modulus of `proposed` bits is a better fit for `bounds` than the
/// current best of `current` bits.
pub fn is_better_size(bounds: &GroupSizeBounds, current: Option<u64>, proposed: u64) -> bool {
    let pmin = bounds.min as u64;
    let pn = bounds.preferred as u64;
    let pmax = bounds.max as u64;

    if proposed < pmin || proposed > pmax {
        return false;
    }

    let Some(current) = current else {
        return true;
    };

    if current == proposed {
        return false;
    }

    if current == pn {
        // can't do better
        return false;
    }

    if proposed >= pn && proposed < current {
        return true;
    }

    if proposed <= pn && proposed > current {
        return true;
    }

    if proposed >= pn && current < pn {
        return true;
    }

    false
}

/// Accumulator for one selection scan.
#[derive(Debug, Default)]
pub struct SelectionState {
    best_size: Option<u64>,
    held_generator: Option<String>,
    held_modulus: Option<String>,
    count_at_best: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_size(&self) -> Option<u64> {
        self.best_size
    }

    /// Number of candidates seen at the current best size.
    pub fn count_at_best(&self) -> usize {
        self.count_at_best
    }

    /// Apply the selection policy to one record.
    pub fn offer<R>(
        &mut self,
        bounds: &GroupSizeBounds,
        record: &ModuliRecord,
        rng: &mut R,
    ) -> Result<(), Error>
    where
        R: Rng + CryptoRng,
    {
        // we only want safe primes that were tested
        if !record.is_candidate() {
            return Ok(());
        }

        let proposed = record.effective_size();

        if self.best_size != Some(proposed) && is_better_size(bounds, self.best_size, proposed) {
            self.best_size = Some(proposed);
            self.held_generator = None;
            self.held_modulus = None;
            self.count_at_best = 0;
        }

        if self.best_size != Some(proposed) {
            return Ok(());
        }

        self.count_at_best += 1;

        // Replace with probability 1/n for the n:th record at this size.
        if rng.gen_range(0..self.count_at_best) == 0 {
            self.held_generator = Some(try_copy(&record.generator)?);
            self.held_modulus = Some(try_copy(&record.modulus)?);
        }

        Ok(())
    }

    /// Turn the held hex strings into a group.
    pub fn finish(self) -> Result<Option<SelectedGroup>, Error> {
        let (Some(bits), Some(generator), Some(modulus)) =
            (self.best_size, self.held_generator, self.held_modulus)
        else {
            return Ok(None);
        };

        let group = DhGroup::from_hex(&modulus, &generator)?;
        Ok(Some(SelectedGroup { bits, group }))
    }
}

fn try_copy(s: &str) -> Result<String, Error> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|_| Error::Allocation)?;
    out.push_str(s);
    Ok(out)
}

/// A group picked from the moduli database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedGroup {
    /// Size of the modulus as recorded in the database.
    pub bits: u64,
    pub group: DhGroup,
}

/// Outcome of a scan.
///
/// `group` is `None` when nothing in the database fit the bounds, which is
/// a valid answer and not an error.
#[derive(Debug, Default)]
pub struct Selection {
    pub group: Option<SelectedGroup>,
    /// Records tied at the chosen size.
    pub candidates: usize,
    /// Records (well formed or not) looked at.
    pub records: usize,
    /// Lines read from the source.
    pub lines: usize,
    pub warnings: Vec<ParseWarning>,
}

/// Picks a group for a `(min, preferred, max)` request.
#[derive(Debug, Clone, Copy)]
pub struct ModuliSelector {
    bounds: GroupSizeBounds,
}

impl ModuliSelector {
    pub fn new(bounds: GroupSizeBounds) -> Self {
        ModuliSelector { bounds }
    }

    pub fn bounds(&self) -> &GroupSizeBounds {
        &self.bounds
    }

    /// Scan `records` once and pick a group.
    ///
    /// Malformed records are logged and collected in
    /// [`Selection::warnings`]. Only allocation failure aborts the scan.
    /// Each record counts as one line.
    pub fn select<I, R>(&self, records: I, rng: &mut R) -> Result<Selection, Error>
    where
        I: IntoIterator<Item = Result<ModuliRecord, ParseWarning>>,
        R: Rng + CryptoRng,
    {
        let mut selection = self.scan(records, rng)?;
        selection.lines = selection.records;
        self.log_outcome(&selection);
        Ok(selection)
    }

    /// Open `source` and scan it.
    ///
    /// [`Selection::lines`] includes the comment and blank lines read.
    pub fn select_from<R>(&self, source: &ModuliSource, rng: &mut R) -> Result<Selection, Error>
    where
        R: Rng + CryptoRng,
    {
        let mut reader = source.open()?;
        let mut selection = self.scan(&mut reader, rng)?;
        selection.lines = reader.lines_read();
        self.log_outcome(&selection);
        Ok(selection)
    }

    fn scan<I, R>(&self, records: I, rng: &mut R) -> Result<Selection, Error>
    where
        I: IntoIterator<Item = Result<ModuliRecord, ParseWarning>>,
        R: Rng + CryptoRng,
    {
        let mut state = SelectionState::new();
        let mut warnings = Vec::new();
        let mut count = 0;

        for item in records {
            count += 1;
            match item {
                Ok(record) => state.offer(&self.bounds, &record, rng)?,
                Err(warning) => {
                    info!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        let candidates = state.count_at_best();
        let group = state.finish()?;

        Ok(Selection {
            group,
            candidates,
            records: count,
            lines: 0,
            warnings,
        })
    }

    fn log_outcome(&self, selection: &Selection) {
        let b = &self.bounds;
        match &selection.group {
            Some(selected) => info!(
                "Selected {} bits modulus out of {} candidates in {} lines",
                selected.bits, selection.candidates, selection.lines
            ),
            None => warn!("No moduli found for [{}:{}:{}]", b.min, b.preferred, b.max),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::error::ParseWarningKind;

    fn record(bits: u64, modulus: &str) -> ModuliRecord {
        ModuliRecord {
            timestamp: "20230101000000".into(),
            record_type: 2,
            tests: 6,
            tries: 100,
            size_minus_one: bits - 1,
            generator: "2".into(),
            modulus: modulus.into(),
        }
    }

    fn ok(records: Vec<ModuliRecord>) -> Vec<Result<ModuliRecord, ParseWarning>> {
        records.into_iter().map(Ok).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn better_size_ordering() {
        let b = GroupSizeBounds::new(1024, 2048, 8192);

        // out of range
        assert!(!is_better_size(&b, None, 512));
        assert!(!is_better_size(&b, None, 9000));
        assert!(!is_better_size(&b, Some(4096), 512));

        // first in range
        assert!(is_better_size(&b, None, 1024));

        // same size
        assert!(!is_better_size(&b, Some(3072), 3072));

        // exact match is never replaced
        assert!(!is_better_size(&b, Some(2048), 3072));
        assert!(!is_better_size(&b, Some(2048), 1536));

        // closer from above
        assert!(is_better_size(&b, Some(4096), 3072));
        assert!(is_better_size(&b, Some(4096), 2048));
        assert!(!is_better_size(&b, Some(3072), 4096));

        // closer from below
        assert!(is_better_size(&b, Some(1024), 1536));
        assert!(!is_better_size(&b, Some(1536), 1024));

        // crossing from below to above
        assert!(is_better_size(&b, Some(1536), 8192));

        // above never loses to below
        assert!(!is_better_size(&b, Some(3072), 1536));
    }

    #[test]
    fn preferred_size_wins_over_full_range() {
        let b = GroupSizeBounds::new(1024, 2048, 4096);
        let records: Vec<_> = (1024..=4096u64)
            .step_by(512)
            .map(|bits| record(bits, &format!("{:X}", bits)))
            .collect();

        let sel = ModuliSelector::new(b).select(ok(records), &mut rng()).unwrap();
        let chosen = sel.group.unwrap();
        assert_eq!(chosen.bits, 2048);
        assert_eq!(chosen.group.p, num_bigint::BigUint::from(2048u32));
        assert_eq!(sel.candidates, 1);
    }

    #[test]
    fn every_size_in_range_yields_preferred() {
        let b = GroupSizeBounds::new(20, 27, 40);
        let records: Vec<_> = (20..=40u64)
            .rev()
            .map(|bits| record(bits, &format!("{:X}", bits)))
            .collect();

        let sel = ModuliSelector::new(b).select(ok(records), &mut rng()).unwrap();
        assert_eq!(sel.group.unwrap().bits, 27);
    }

    #[test]
    fn nothing_in_range_is_no_group() {
        let b = GroupSizeBounds::new(2048, 3072, 4096);
        let records = vec![record(1024, "A"), record(1536, "B"), record(8192, "C")];

        let sel = ModuliSelector::new(b).select(ok(records), &mut rng()).unwrap();
        assert!(sel.group.is_none());
        assert_eq!(sel.candidates, 0);
        assert_eq!(sel.records, 3);
    }

    #[test]
    fn closest_above_beats_below() {
        let b = GroupSizeBounds::new(1024, 2048, 8192);
        let records = vec![
            record(1536, "A"),
            record(4096, "B"),
            record(3072, "C"),
            record(1024, "D"),
        ];

        let sel = ModuliSelector::new(b).select(ok(records), &mut rng()).unwrap();
        assert_eq!(sel.group.unwrap().bits, 3072);
    }

    #[test]
    fn closest_below_when_nothing_above() {
        let b = GroupSizeBounds::new(1024, 2048, 8192);
        let records = vec![record(1024, "A"), record(1536, "B"), record(1024, "C")];

        let sel = ModuliSelector::new(b).select(ok(records), &mut rng()).unwrap();
        let chosen = sel.group.unwrap();
        assert_eq!(chosen.bits, 1536);
        assert_eq!(sel.candidates, 1);
    }

    #[test]
    fn better_size_resets_tie_count() {
        let b = GroupSizeBounds::new(1024, 2048, 8192);
        let mut state = SelectionState::new();
        let mut r = rng();

        for m in ["A", "B", "C"] {
            state.offer(&b, &record(4096, m), &mut r).unwrap();
        }
        assert_eq!(state.best_size(), Some(4096));
        assert_eq!(state.count_at_best(), 3);

        state.offer(&b, &record(3072, "D"), &mut r).unwrap();
        assert_eq!(state.best_size(), Some(3072));
        assert_eq!(state.count_at_best(), 1);

        let chosen = state.finish().unwrap().unwrap();
        assert_eq!(chosen.group.p, num_bigint::BigUint::from(0xDu32));
    }

    #[test]
    fn non_candidates_are_ignored() {
        let b = GroupSizeBounds::new(1024, 2048, 8192);
        let mut untested = record(2048, "A");
        untested.tests = 2;
        let mut unsafe_prime = record(2048, "B");
        unsafe_prime.record_type = 1;

        let records = vec![untested, unsafe_prime, record(4096, "C")];
        let sel = ModuliSelector::new(b).select(ok(records), &mut rng()).unwrap();
        assert_eq!(sel.group.unwrap().bits, 4096);
    }

    #[test]
    fn ties_are_uniform() {
        let b = GroupSizeBounds::new(1024, 2048, 8192);
        let moduli = ["A1", "B3", "C5", "D7"];
        let selector = ModuliSelector::new(b);
        let mut r = rng();

        let runs = 4000;
        let mut seen: HashMap<String, usize> = HashMap::new();
        for _ in 0..runs {
            let records = ok(moduli.iter().map(|m| record(2048, m)).collect());
            let sel = selector.select(records, &mut r).unwrap();
            assert_eq!(sel.candidates, 4);
            let p = sel.group.unwrap().group.p.to_str_radix(16).to_uppercase();
            *seen.entry(p).or_default() += 1;
        }

        assert_eq!(seen.len(), 4);
        for m in moduli {
            let freq = seen[m] as f64 / runs as f64;
            assert!((freq - 0.25).abs() < 0.05, "{} chosen with {}", m, freq);
        }
    }

    #[test]
    fn end_to_end_picks_2048() {
        let db = "\
# Time Type Tests Tries Size Generator Modulus
20230101000000 2 6 100 1023 2 A1
20230101000000 2 6 100 2047 5 B3
20230101000000 2 6 100 4095 2 C5
";
        let source = ModuliSource::memory(db);
        let selector = ModuliSelector::new(GroupSizeBounds::new(1024, 2048, 8192));

        let sel = selector.select_from(&source, &mut rng()).unwrap();
        let chosen = sel.group.unwrap();
        assert_eq!(chosen.bits, 2048);
        assert_eq!(chosen.group.g, num_bigint::BigUint::from(5u32));
        assert!(sel.warnings.is_empty());
    }

    #[test]
    fn summary_counts_lines_read() {
        let db = "\
# Time Type Tests Tries Size Generator Modulus

20230101000000 2 6 100 2047 5 B3
# trailing comment
";
        let selector = ModuliSelector::new(GroupSizeBounds::new(1024, 2048, 8192));

        let sel = selector
            .select_from(&ModuliSource::memory(db), &mut rng())
            .unwrap();
        assert_eq!(sel.records, 1);
        assert_eq!(sel.lines, 4);

        // Without a source every record is one line.
        let sel = selector
            .select(ok(vec![record(2048, "B3"), record(1024, "A1")]), &mut rng())
            .unwrap();
        assert_eq!(sel.lines, 2);
    }

    #[test]
    fn malformed_line_does_not_abort_scan() {
        let db = "\
20230101000000 2 6 100 2047
20230101000000 2 6 100 2047 2 B3
";
        let source = ModuliSource::memory(db);
        let selector = ModuliSelector::new(GroupSizeBounds::new(1024, 2048, 8192));

        let sel = selector.select_from(&source, &mut rng()).unwrap();
        assert_eq!(sel.group.unwrap().bits, 2048);
        assert_eq!(sel.warnings.len(), 1);
        assert_eq!(sel.warnings[0].line, 1);
        assert_eq!(sel.warnings[0].kind, ParseWarningKind::FieldCount(5));
    }

    #[test]
    fn unavailable_source_is_an_error() {
        let source = ModuliSource::File("/nonexistent/dhgex/moduli".into());
        let selector = ModuliSelector::new(GroupSizeBounds::default());
        let err = selector.select_from(&source, &mut rng()).unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }
}
