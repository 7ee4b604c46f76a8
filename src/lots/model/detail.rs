use std::{cell::Cell, rc::Rc};

use rust_decimal::Decimal;
use time::Date;

use crate::util::decimal::{is_negative, is_positive};

use super::security::Security;

/// One purchase or sale leg of a security transaction.
///
/// `asset_quantity` is signed: positive for purchases and negative for
/// sales. The number of shares already committed to lots is tracked here
/// (in purchase-date terms for purchases, sale-date terms for sales), and
/// is only changed through `SecurityLot`.
#[derive(Debug)]
pub struct TransactionDetail {
    pub id: u64,
    pub account: String,
    pub security: Rc<Security>,
    pub date: Date,
    pub amount: Decimal,
    pub asset_quantity: Decimal,
    lot_shares: Cell<Decimal>,
}

pub type DetailRef = Rc<TransactionDetail>;

impl TransactionDetail {
    pub fn new(
        id: u64,
        account: &str,
        security: Rc<Security>,
        date: Date,
        amount: Decimal,
        asset_quantity: Decimal,
    ) -> DetailRef {
        Rc::new(TransactionDetail {
            id,
            account: account.to_string(),
            security,
            date,
            amount,
            asset_quantity,
            lot_shares: Cell::new(Decimal::ZERO),
        })
    }

    pub fn is_sale(&self) -> bool {
        is_negative(&self.asset_quantity)
    }

    pub fn is_purchase(&self) -> bool {
        is_positive(&self.asset_quantity)
    }

    /// Magnitude of the share quantity.
    pub fn shares(&self) -> Decimal {
        self.asset_quantity.abs()
    }

    pub fn lot_shares(&self) -> Decimal {
        self.lot_shares.get()
    }

    pub fn remaining_shares(&self) -> Decimal {
        self.shares() - self.lot_shares.get()
    }

    /// Cost per share of a purchase, with its share count adjusted for any
    /// splits between the purchase and `as_of`.
    pub fn purchase_price(&self, as_of: Date) -> Decimal {
        let shares = self.security.apply_splits(self.shares(), Some(self.date), Some(as_of));
        if shares.is_zero() {
            return Decimal::ZERO;
        }
        self.amount.abs() / shares
    }

    pub fn has_lots(&self) -> bool {
        !self.lot_shares.get().is_zero()
    }

    pub fn is_same(&self, other: &TransactionDetail) -> bool {
        self.id == other.id
    }

    pub(crate) fn add_lot_shares(&self, delta: Decimal) {
        self.lot_shares.set(self.lot_shares.get() + delta);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use rust_decimal_macros::dec;

    use crate::lots::model::Security;
    use crate::util::date::pub_testlib::ymd;

    use super::TransactionDetail;

    #[test]
    fn test_remaining_shares() {
        let sec = Rc::new(Security::new(1, "SECURITY 123"));
        let purchase = TransactionDetail::new(
            1, "Brokerage", sec.clone(), ymd(2000, 1, 20), dec!(-150), dec!(30));
        let sale = TransactionDetail::new(
            2, "Brokerage", sec, ymd(2005, 2, 28), dec!(200), dec!(-20));

        assert!(purchase.is_purchase());
        assert!(!purchase.is_sale());
        assert!(sale.is_sale());
        assert_eq!(sale.shares(), dec!(20));

        assert!(!purchase.has_lots());
        purchase.add_lot_shares(dec!(12.5));
        assert!(purchase.has_lots());
        assert_eq!(purchase.remaining_shares(), dec!(17.5));
        purchase.add_lot_shares(dec!(-12.5));
        assert_eq!(purchase.remaining_shares(), dec!(30));
        assert!(!purchase.is_same(&sale));
        assert_eq!(purchase.purchase_price(ymd(2005, 2, 28)), dec!(5));
    }
}
