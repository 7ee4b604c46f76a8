use std::fmt::Display;

use rust_decimal::Decimal;
use time::Date;

use super::split_ratio::SplitRatio;

pub const DEFAULT_SHARE_SCALE: u32 = 6;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct StockSplit {
    pub date: Date,
    pub ratio: SplitRatio,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Security {
    pub id: u64,
    pub name: String,
    // Decimal places kept for share quantities.
    pub scale: u32,
    // Sorted by date
    splits: Vec<StockSplit>,
}

impl Security {
    pub fn new(id: u64, name: &str) -> Security {
        Security {
            id,
            name: name.to_string(),
            scale: DEFAULT_SHARE_SCALE,
            splits: Vec::new(),
        }
    }

    pub fn with_splits(mut self, splits: Vec<StockSplit>) -> Security {
        self.set_splits(splits);
        self
    }

    pub fn splits(&self) -> &[StockSplit] {
        &self.splits
    }

    pub fn set_splits(&mut self, mut splits: Vec<StockSplit>) {
        splits.sort_by_key(|s| s.date);
        self.splits = splits;
    }

    /// The combined ratio of all splits on or after `from` and on or before
    /// `to` (unbounded if `to` is None). Identity when `from` is None.
    pub fn split_ratio(&self, from: Option<Date>, to: Option<Date>) -> SplitRatio {
        let from = match from {
            Some(d) => d,
            None => return SplitRatio::identity(),
        };
        self.splits
            .iter()
            .filter(|s| s.date >= from && to.map_or(true, |to| s.date <= to))
            .fold(SplitRatio::identity(), |acc, s| acc.multiply(&s.ratio))
    }

    pub fn apply_splits(&self, shares: Decimal, from: Option<Date>, to: Option<Date>) -> Decimal {
        self.split_ratio(from, to).apply(shares, self.scale)
    }

    pub fn revert_splits(&self, shares: Decimal, from: Option<Date>, to: Option<Date>) -> Decimal {
        self.split_ratio(from, to).revert(shares, self.scale)
    }
}

impl Display for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::util::date::pub_testlib::ymd;

    use super::{Security, SplitRatio, StockSplit};

    fn split(y: i32, m: u8, d: u8, ratio: &str) -> StockSplit {
        StockSplit { date: ymd(y, m, d), ratio: SplitRatio::parse(ratio).unwrap() }
    }

    fn security_with_splits() -> Security {
        // Deliberately out of order
        Security::new(1, "SECURITY 123").with_splits(vec![
            split(2002, 6, 1, "2-for-1"),
            split(1995, 6, 1, "2-for-1"),
        ])
    }

    #[test]
    fn test_splits_sorted() {
        let sec = security_with_splits();
        assert_eq!(sec.splits()[0].date, ymd(1995, 6, 1));
        assert_eq!(sec.splits()[1].date, ymd(2002, 6, 1));
    }

    #[test]
    fn test_split_ratio_range() {
        let sec = security_with_splits();
        let r = |from, to| sec.split_ratio(from, to).ratio_as_decimal(6);

        assert_eq!(r(None, Some(ymd(2005, 1, 1))), dec!(1));
        assert_eq!(r(Some(ymd(1991, 1, 20)), Some(ymd(2005, 2, 28))), dec!(4));
        assert_eq!(r(Some(ymd(2000, 1, 20)), Some(ymd(2005, 2, 28))), dec!(2));
        assert_eq!(r(Some(ymd(1991, 1, 20)), Some(ymd(1999, 1, 1))), dec!(2));
        assert_eq!(r(Some(ymd(1991, 1, 20)), None), dec!(4));
        assert_eq!(r(Some(ymd(2003, 1, 1)), None), dec!(1));
        // Both ends are inclusive
        assert_eq!(r(Some(ymd(1995, 6, 1)), Some(ymd(2002, 6, 1))), dec!(4));
    }

    #[test]
    fn test_apply_revert_splits() {
        let sec = security_with_splits();
        let bought = Some(ymd(1991, 1, 20));
        let sold = Some(ymd(2005, 2, 28));
        assert_eq!(sec.apply_splits(dec!(6), bought, sold), dec!(24));
        assert_eq!(sec.revert_splits(dec!(16), bought, sold), dec!(4));
        assert_eq!(sec.revert_splits(dec!(16), Some(ymd(2000, 1, 20)), sold), dec!(8));

        let no_splits = Security::new(2, "SECURITY ABC");
        assert_eq!(no_splits.apply_splits(dec!(10.5), bought, sold), dec!(10.5));
    }
}
