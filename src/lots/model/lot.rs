use std::cmp::min;

use rust_decimal::Decimal;
use time::Date;

use crate::util::basic::SError;

use super::detail::DetailRef;
use super::security::Security;
use super::split_ratio::SplitRatio;

/// Links shares of one purchase to one sale of the same security.
///
/// `sale_shares` are in sale-date terms. `purchase_shares` are derived from
/// them by reverting any splits between the purchase and the sale. Every
/// change to the share counts is mirrored into both details, so their
/// remaining shares always account for this lot.
#[derive(Debug)]
pub struct SecurityLot {
    purchase: DetailRef,
    sale: DetailRef,
    purchase_shares: Decimal,
    sale_shares: Decimal,
}

impl SecurityLot {
    pub fn new(
        purchase: DetailRef,
        sale: DetailRef,
        sale_shares: Decimal,
    ) -> Result<SecurityLot, SError> {
        if purchase.security.id != sale.security.id {
            return Err(format!(
                "Purchase {} of {} and sale {} of {} are not the same security",
                purchase.id, purchase.security, sale.id, sale.security
            ));
        }
        if !purchase.is_purchase() || !sale.is_sale() {
            return Err(format!(
                "Lot requires a purchase and a sale (got details {} and {})",
                purchase.id, sale.id
            ));
        }
        let mut lot = SecurityLot {
            purchase,
            sale,
            purchase_shares: Decimal::ZERO,
            sale_shares: Decimal::ZERO,
        };
        lot.set_sale_shares(sale_shares);
        Ok(lot)
    }

    /// Rebuilds a previously saved lot with its exact share counts.
    pub fn from_saved(
        purchase: DetailRef,
        sale: DetailRef,
        purchase_shares: Decimal,
        sale_shares: Decimal,
    ) -> Result<SecurityLot, SError> {
        let mut lot = SecurityLot::new(purchase, sale, Decimal::ZERO)?;
        lot.update_shares(purchase_shares, sale_shares);
        Ok(lot)
    }

    pub fn purchase(&self) -> &DetailRef {
        &self.purchase
    }

    pub fn sale(&self) -> &DetailRef {
        &self.sale
    }

    pub fn security(&self) -> &Security {
        &self.sale.security
    }

    pub fn purchase_date(&self) -> Date {
        self.purchase.date
    }

    pub fn sale_date(&self) -> Date {
        self.sale.date
    }

    /// Lot shares as of the purchase date (unadjusted for splits).
    pub fn purchase_shares(&self) -> Decimal {
        self.purchase_shares
    }

    /// Lot shares as of the sale date.
    pub fn sale_shares(&self) -> Decimal {
        self.sale_shares
    }

    pub fn is_empty(&self) -> bool {
        self.sale_shares.is_zero()
    }

    pub fn split_ratio(&self) -> SplitRatio {
        self.security()
            .split_ratio(Some(self.purchase_date()), Some(self.sale_date()))
    }

    fn apply_splits(&self, shares: Decimal) -> Decimal {
        self.split_ratio().apply(shares, self.security().scale)
    }

    fn revert_splits(&self, shares: Decimal) -> Decimal {
        self.split_ratio().revert(shares, self.security().scale)
    }

    /// Purchase shares in sale-date terms.
    pub fn total_purchase_shares(&self) -> Decimal {
        self.apply_splits(self.purchase.shares())
    }

    /// Cost per share of the purchase, adjusted for splits up to the sale.
    pub fn purchase_price(&self) -> Decimal {
        self.purchase.purchase_price(self.sale_date())
    }

    /// Shares the purchase can still give to this lot, in sale-date terms.
    pub fn remaining_purchase_shares(&self) -> Decimal {
        self.apply_splits(self.purchase.remaining_shares())
    }

    pub fn remaining_sale_shares(&self) -> Decimal {
        self.sale.remaining_shares()
    }

    /// Takes up to `max_shares` (sale-date terms) from the purchase's
    /// remaining shares. Returns the portion of `max_shares` not allocated.
    pub fn allocate_shares(&mut self, max_shares: Decimal) -> Decimal {
        let taken = min(max_shares, self.remaining_purchase_shares()).max(Decimal::ZERO);
        self.set_sale_shares(self.sale_shares + taken);
        max_shares - taken
    }

    pub fn set_sale_shares(&mut self, shares: Decimal) {
        let purchase_shares = self.revert_splits(shares);
        self.update_shares(purchase_shares, shares);
    }

    pub fn set_purchase_shares(&mut self, shares: Decimal) {
        let sale_shares = self.apply_splits(shares);
        self.update_shares(shares, sale_shares);
    }

    /// Gives all of this lot's shares back to the purchase and the sale.
    pub fn release(&mut self) {
        self.update_shares(Decimal::ZERO, Decimal::ZERO);
    }

    fn update_shares(&mut self, purchase_shares: Decimal, sale_shares: Decimal) {
        self.purchase.add_lot_shares(purchase_shares - self.purchase_shares);
        self.sale.add_lot_shares(sale_shares - self.sale_shares);
        self.purchase_shares = purchase_shares;
        self.sale_shares = sale_shares;
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::lots::model::{DetailRef, Security, SplitRatio, StockSplit, TransactionDetail};
    use crate::util::date::pub_testlib::ymd;

    use super::SecurityLot;

    fn split_security() -> Rc<Security> {
        Rc::new(Security::new(1, "SECURITY 123").with_splits(vec![
            StockSplit { date: ymd(1995, 6, 1), ratio: SplitRatio::parse("2-for-1").unwrap() },
            StockSplit { date: ymd(2002, 6, 1), ratio: SplitRatio::parse("2-for-1").unwrap() },
        ]))
    }

    fn detail(id: u64, sec: &Rc<Security>, date: time::Date, amount: Decimal, qty: Decimal) -> DetailRef {
        TransactionDetail::new(id, "Brokerage", sec.clone(), date, amount, qty)
    }

    #[test]
    fn test_new_rejects_mismatch() {
        let sec1 = Rc::new(Security::new(1, "SECURITY 123"));
        let sec2 = Rc::new(Security::new(2, "SECURITY ABC"));
        let purchase = detail(1, &sec1, ymd(2000, 1, 20), dec!(-75), dec!(15));
        let sale = detail(2, &sec2, ymd(2005, 2, 28), dec!(200), dec!(-20));
        let err = SecurityLot::new(purchase.clone(), sale, dec!(0)).unwrap_err();
        assert!(err.contains("not the same security"), "{}", err);

        let other_purchase = detail(3, &sec1, ymd(2001, 1, 20), dec!(-10), dec!(5));
        assert!(SecurityLot::new(purchase, other_purchase, dec!(0)).is_err());
    }

    #[test]
    fn test_shares_with_splits() {
        let sec = split_security();
        let purchase = detail(1, &sec, ymd(1991, 1, 20), dec!(-30), dec!(6));
        let sale = detail(2, &sec, ymd(2005, 2, 28), dec!(320), dec!(-32));

        let mut lot = SecurityLot::new(purchase.clone(), sale.clone(), dec!(16)).unwrap();
        assert_eq!(lot.sale_shares(), dec!(16));
        assert_eq!(lot.purchase_shares(), dec!(4));
        assert_eq!(purchase.remaining_shares(), dec!(2));
        assert_eq!(sale.remaining_shares(), dec!(16));
        assert_eq!(lot.total_purchase_shares(), dec!(24));
        assert_eq!(lot.remaining_purchase_shares(), dec!(8));
        assert_eq!(lot.remaining_sale_shares(), dec!(16));
        // 30 / 24
        assert_eq!(lot.purchase_price(), dec!(1.25));

        lot.set_purchase_shares(dec!(6));
        assert_eq!(lot.sale_shares(), dec!(24));
        assert_eq!(purchase.remaining_shares(), dec!(0));
        assert_eq!(sale.remaining_shares(), dec!(8));

        lot.release();
        assert!(lot.is_empty());
        assert_eq!(purchase.remaining_shares(), dec!(6));
        assert_eq!(sale.remaining_shares(), dec!(32));
    }

    #[test]
    fn test_allocate_shares() {
        let sec = Rc::new(Security::new(1, "SECURITY 123"));
        let purchase = detail(1, &sec, ymd(2000, 1, 20), dec!(-150), dec!(30));
        let sale = detail(2, &sec, ymd(2005, 2, 28), dec!(400), dec!(-40));

        let mut lot = SecurityLot::new(purchase.clone(), sale.clone(), dec!(0)).unwrap();
        assert_eq!(lot.allocate_shares(dec!(12)), dec!(0));
        assert_eq!(lot.sale_shares(), dec!(12));
        assert_eq!(lot.allocate_shares(dec!(28)), dec!(10));
        assert_eq!(lot.sale_shares(), dec!(30));
        assert_eq!(lot.remaining_purchase_shares(), dec!(0));
        assert_eq!(lot.allocate_shares(dec!(5)), dec!(5));
        assert_eq!(sale.remaining_shares(), dec!(10));
    }

    #[test]
    fn test_purchase_price_zero_amount() {
        let sec = Rc::new(Security::new(1, "SECURITY 123"));
        let purchase = detail(1, &sec, ymd(2000, 1, 20), dec!(0), dec!(20));
        let sale = detail(2, &sec, ymd(2005, 2, 28), dec!(0), dec!(-32));
        let lot = SecurityLot::new(purchase, sale, dec!(0)).unwrap();
        assert_eq!(lot.purchase_price(), dec!(0));
        assert!(lot.is_empty());
    }
}
