use crate::merge::MergedRecord;
use crate::period::Period;
use tracing::debug;

/// Append-only, order-preserving collection of merged rows across periods.
#[derive(Debug, Default)]
pub struct Accumulator {
    records: Vec<MergedRecord>,
}

impl Accumulator {
    pub fn append(&mut self, period: Period, merged: Vec<MergedRecord>) {
        debug!(%period, rows = merged.len(), total = self.records.len() + merged.len(), "appending");
        self.records.extend(merged);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MergedRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Quarter;

    fn row(zip: &str, quarter: Quarter) -> MergedRecord {
        MergedRecord {
            code: "01001".into(),
            name: "Autauga".into(),
            zip: zip.into(),
            year: 2020,
            quarter,
        }
    }

    #[test]
    fn length_is_sum_of_appends_and_order_is_kept() {
        let mut acc = Accumulator::default();
        assert!(acc.is_empty());
        acc.append(
            Period::new(2020, Quarter::Mar),
            vec![row("00501", Quarter::Mar), row("00502", Quarter::Mar)],
        );
        acc.append(Period::new(2020, Quarter::Jun), vec![]);
        acc.append(Period::new(2020, Quarter::Sep), vec![row("00503", Quarter::Sep)]);

        assert!(!acc.is_empty());
        assert_eq!(acc.len(), 3);
        let zips: Vec<_> = acc.records().iter().map(|r| r.zip.as_str()).collect();
        assert_eq!(zips, vec!["00501", "00502", "00503"]);
    }
}
