use std::{cmp::Ordering, fmt::Display};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util::decimal::{is_positive, sum};

use super::model::SecurityLot;

/// Order in which candidate lots are consumed when allocating a sale.
#[derive(
    PartialEq, Eq, Clone, Copy, Debug, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum LotAllocationStrategy {
    /// Earliest purchase first
    #[default]
    FirstIn,
    /// Latest purchase first
    LastIn,
    /// Cheapest split-adjusted purchase price first
    LowestPrice,
    /// Most expensive split-adjusted purchase price first
    HighestPrice,
}

type LotComparator = fn(&SecurityLot, &SecurityLot) -> Ordering;

fn by_purchase_date(a: &SecurityLot, b: &SecurityLot) -> Ordering {
    a.purchase_date().cmp(&b.purchase_date())
}

fn by_purchase_price(a: &SecurityLot, b: &SecurityLot) -> Ordering {
    a.purchase_price().cmp(&b.purchase_price())
}

impl LotAllocationStrategy {
    pub const ALL: [LotAllocationStrategy; 4] = [
        LotAllocationStrategy::FirstIn,
        LotAllocationStrategy::LastIn,
        LotAllocationStrategy::LowestPrice,
        LotAllocationStrategy::HighestPrice,
    ];

    fn comparator(&self) -> (LotComparator, bool) {
        match self {
            LotAllocationStrategy::FirstIn => (by_purchase_date, false),
            LotAllocationStrategy::LastIn => (by_purchase_date, true),
            LotAllocationStrategy::LowestPrice => (by_purchase_price, false),
            LotAllocationStrategy::HighestPrice => (by_purchase_price, true),
        }
    }

    pub fn compare(&self, a: &SecurityLot, b: &SecurityLot) -> Ordering {
        let (cmp, reversed) = self.comparator();
        let ord = cmp(a, b);
        if reversed {
            ord.reverse()
        } else {
            ord
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LotAllocationStrategy::FirstIn => "first-in",
            LotAllocationStrategy::LastIn => "last-in",
            LotAllocationStrategy::LowestPrice => "lowest-price",
            LotAllocationStrategy::HighestPrice => "highest-price",
        }
    }

    /// Greedily fills `total_shares` (sale-date terms) from `lots`, in this
    /// strategy's order. Shares already on the lots count towards the total.
    /// The slice keeps its order. Returns the shares left unallocated, which
    /// is non-zero when the lots do not have enough capacity.
    pub fn allocate_lots(&self, lots: &mut [SecurityLot], total_shares: Decimal) -> Decimal {
        let mut remaining = total_shares - sum(lots, |l| l.sale_shares());

        let mut order: Vec<usize> = (0..lots.len()).collect();
        // sort_by is stable, so equal lots keep the caller's order
        order.sort_by(|a, b| self.compare(&lots[*a], &lots[*b]));

        for i in order {
            if !is_positive(&remaining) {
                break;
            }
            let lot = &mut lots[i];
            if !is_positive(&lot.remaining_purchase_shares()) {
                continue;
            }
            remaining = lot.allocate_shares(remaining);
        }
        tracing::debug!("{} allocation left {} of {} shares unallocated",
                        self, remaining, total_shares);
        remaining
    }
}

impl Display for LotAllocationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::lots::model::{DetailRef, Security, SecurityLot, TransactionDetail};
    use crate::util::date::pub_testlib::ymd;

    use super::LotAllocationStrategy;

    struct Fixture {
        sale: DetailRef,
        lots: Vec<SecurityLot>,
    }

    // Purchases (date, cost, shares), in an order that matches no strategy.
    fn fixture(sale_shares: Decimal) -> Fixture {
        let sec = Rc::new(Security::new(1, "SECURITY 123"));
        let sale = TransactionDetail::new(
            100, "Brokerage", sec.clone(), ymd(2005, 2, 28), dec!(500), -sale_shares);
        let purchases = [
            (ymd(2001, 1, 20), dec!(-60), dec!(10)), // 6.00
            (ymd(1999, 1, 20), dec!(-80), dec!(10)), // 8.00
            (ymd(2003, 1, 20), dec!(-20), dec!(10)), // 2.00
        ];
        let lots = purchases
            .iter()
            .enumerate()
            .map(|(i, (date, amount, qty))| {
                let p = TransactionDetail::new(
                    i as u64 + 1, "Brokerage", sec.clone(), *date, *amount, *qty);
                SecurityLot::new(p, sale.clone(), dec!(0)).unwrap()
            })
            .collect();
        Fixture { sale, lots }
    }

    fn shares(lots: &[SecurityLot]) -> Vec<Decimal> {
        lots.iter().map(|l| l.sale_shares()).collect()
    }

    #[test]
    fn test_strategies() {
        let cases = [
            (LotAllocationStrategy::FirstIn, vec![dec!(5), dec!(10), dec!(0)]),
            (LotAllocationStrategy::LastIn, vec![dec!(5), dec!(0), dec!(10)]),
            (LotAllocationStrategy::LowestPrice, vec![dec!(5), dec!(0), dec!(10)]),
            (LotAllocationStrategy::HighestPrice, vec![dec!(5), dec!(10), dec!(0)]),
        ];
        for (strategy, expected) in cases {
            let mut f = fixture(dec!(15));
            let remaining = strategy.allocate_lots(&mut f.lots, dec!(15));
            assert_eq!(remaining, dec!(0), "{}", strategy);
            assert_eq!(shares(&f.lots), expected, "{}", strategy);
            assert_eq!(f.sale.remaining_shares(), dec!(0));
        }
    }

    #[test]
    fn test_shortfall_is_returned() {
        let mut f = fixture(dec!(40));
        let remaining = LotAllocationStrategy::FirstIn.allocate_lots(&mut f.lots, dec!(40));
        assert_eq!(remaining, dec!(10));
        assert_eq!(shares(&f.lots), vec![dec!(10), dec!(10), dec!(10)]);
    }

    #[test]
    fn test_existing_shares_count() {
        let mut f = fixture(dec!(15));
        f.lots[2].set_sale_shares(dec!(4));
        let remaining = LotAllocationStrategy::FirstIn.allocate_lots(&mut f.lots, dec!(15));
        assert_eq!(remaining, dec!(0));
        assert_eq!(shares(&f.lots), vec![dec!(1), dec!(10), dec!(4)]);
    }

    #[test]
    fn test_exhausted_purchases_skipped() {
        let mut f = fixture(dec!(15));
        // Another sale already took all of the 1999 purchase
        let other_sale = TransactionDetail::new(
            200, "Brokerage", f.sale.security.clone(), ymd(2004, 1, 1), dec!(100), dec!(-10));
        let mut other_lot = SecurityLot::new(
            f.lots[1].purchase().clone(), other_sale, dec!(10)).unwrap();

        let remaining = LotAllocationStrategy::HighestPrice.allocate_lots(&mut f.lots, dec!(15));
        assert_eq!(remaining, dec!(0));
        assert_eq!(shares(&f.lots), vec![dec!(10), dec!(0), dec!(5)]);
        other_lot.release();
    }

    #[test]
    fn test_names() {
        let names: Vec<String> = LotAllocationStrategy::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["first-in", "last-in", "lowest-price", "highest-price"]);
        assert_eq!(LotAllocationStrategy::default(), LotAllocationStrategy::FirstIn);
        assert_eq!(
            serde_json::to_string(&LotAllocationStrategy::LowestPrice).unwrap(),
            "\"lowest-price\""
        );
        let parsed: LotAllocationStrategy = serde_json::from_str("\"highest-price\"").unwrap();
        assert_eq!(parsed, LotAllocationStrategy::HighestPrice);
    }
}
