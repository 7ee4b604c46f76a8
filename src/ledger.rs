use std::rc::Rc;

use rust_decimal::Decimal;
use time::Date;

use crate::lots::model::{DetailRef, Security, SecurityLot, TransactionDetail};
use crate::util::basic::SError;

pub mod file;

/// The parts of the ledger used by lot reconciliation.
pub trait Ledger {
    /// Sales on `sale_date` of securities whose name starts with
    /// `security_name_prefix` (case-insensitive) and that have no lots yet.
    fn find_security_sales_without_lots(
        &mut self,
        security_name_prefix: &str,
        sale_date: Date,
    ) -> Result<Vec<DetailRef>, SError>;

    /// Purchases of `security` in `account` on `purchase_date` that still
    /// have shares not assigned to any lot.
    fn find_purchases_with_remaining_lots(
        &mut self,
        account: &str,
        security: &Security,
        purchase_date: Date,
    ) -> Result<Vec<DetailRef>, SError>;

    fn save_security_lots(&mut self, lots: Vec<SecurityLot>) -> Result<(), SError>;
}

/// A ledger held entirely in memory. Backs the CLI (through the JSON
/// ledger file) and tests.
#[derive(Default)]
pub struct MemoryLedger {
    securities: Vec<Rc<Security>>,
    details: Vec<DetailRef>,
    lots: Vec<SecurityLot>,
}

impl MemoryLedger {
    pub fn new() -> MemoryLedger {
        MemoryLedger::default()
    }

    pub fn add_security(&mut self, security: Security) -> Result<Rc<Security>, SError> {
        if self.security(security.id).is_some() {
            return Err(format!("Duplicate security id {}", security.id));
        }
        let security = Rc::new(security);
        self.securities.push(security.clone());
        Ok(security)
    }

    pub fn add_detail(&mut self, detail: DetailRef) -> Result<DetailRef, SError> {
        if self.detail(detail.id).is_some() {
            return Err(format!("Duplicate transaction detail id {}", detail.id));
        }
        match self.security(detail.security.id) {
            Some(s) if Rc::ptr_eq(&s, &detail.security) => (),
            _ => return Err(format!(
                "Transaction detail {} refers to unknown security {}",
                detail.id, detail.security.id)),
        }
        self.details.push(detail.clone());
        Ok(detail)
    }

    pub fn securities(&self) -> &[Rc<Security>] {
        &self.securities
    }

    pub fn security(&self, id: u64) -> Option<Rc<Security>> {
        self.securities.iter().find(|s| s.id == id).cloned()
    }

    pub fn details(&self) -> &[DetailRef] {
        &self.details
    }

    pub fn detail(&self, id: u64) -> Option<DetailRef> {
        self.details.iter().find(|d| d.id == id).cloned()
    }

    pub fn lots(&self) -> &[SecurityLot] {
        &self.lots
    }

    pub fn find_sale(&self, id: u64) -> Option<DetailRef> {
        self.detail(id).filter(|d| d.is_sale())
    }

    /// Purchases of the sale's security in its account, on or before the
    /// sale date, that still have shares to give. Oldest first.
    pub fn find_purchases_for_sale(&self, sale: &TransactionDetail) -> Vec<DetailRef> {
        let mut purchases: Vec<DetailRef> = self
            .details
            .iter()
            .filter(|d| {
                d.is_purchase()
                    && d.account == sale.account
                    && d.security.id == sale.security.id
                    && d.date <= sale.date
                    && d.remaining_shares() > Decimal::ZERO
            })
            .cloned()
            .collect();
        purchases.sort_by_key(|d| d.date);
        purchases
    }

    pub fn sale_lots(&self, sale_id: u64) -> Vec<&SecurityLot> {
        self.lots.iter().filter(|l| l.sale().id == sale_id).collect()
    }

    /// Removes the lots of a sale from the ledger, handing them to the
    /// caller. They keep their shares until released.
    pub fn take_sale_lots(&mut self, sale_id: u64) -> Vec<SecurityLot> {
        let (taken, kept): (Vec<SecurityLot>, Vec<SecurityLot>) = std::mem::take(&mut self.lots)
            .into_iter()
            .partition(|l| l.sale().id == sale_id);
        self.lots = kept;
        taken
    }

    /// Adds a lot that was already saved, without the checks of a new save.
    pub(crate) fn restore_lot(&mut self, lot: SecurityLot) {
        self.lots.push(lot);
    }
}

impl Ledger for MemoryLedger {
    fn find_security_sales_without_lots(
        &mut self,
        security_name_prefix: &str,
        sale_date: Date,
    ) -> Result<Vec<DetailRef>, SError> {
        let prefix = security_name_prefix.to_lowercase();
        Ok(self
            .details
            .iter()
            .filter(|d| {
                d.is_sale()
                    && d.date == sale_date
                    && !d.has_lots()
                    && d.security.name.to_lowercase().starts_with(&prefix)
            })
            .cloned()
            .collect())
    }

    fn find_purchases_with_remaining_lots(
        &mut self,
        account: &str,
        security: &Security,
        purchase_date: Date,
    ) -> Result<Vec<DetailRef>, SError> {
        Ok(self
            .details
            .iter()
            .filter(|d| {
                d.is_purchase()
                    && d.account == account
                    && d.security.id == security.id
                    && d.date == purchase_date
                    && d.remaining_shares() > Decimal::ZERO
            })
            .cloned()
            .collect())
    }

    fn save_security_lots(&mut self, lots: Vec<SecurityLot>) -> Result<(), SError> {
        for lot in &lots {
            if lot.sale().remaining_shares() < Decimal::ZERO {
                return Err(format!("Sale {} is over-allocated", lot.sale().id));
            }
            if lot.purchase().remaining_shares() < Decimal::ZERO {
                return Err(format!("Purchase {} is over-allocated", lot.purchase().id));
            }
        }
        let n_lots = lots.len();
        self.lots.extend(lots.into_iter().filter(|l| !l.is_empty()));
        tracing::debug!("MemoryLedger: saved {} lots ({} total)", n_lots, self.lots.len());
        Ok(())
    }
}
