use rust_decimal::Decimal;

use crate::util::basic::SError;
use crate::util::decimal::{is_negative, sum};

use super::allocation::LotAllocationStrategy;
use super::model::{DetailRef, SecurityLot};

/// Editable state behind a lot allocation dialog: one sale and the
/// candidate lots that may take shares for it.
pub struct AllocationSession {
    sale: DetailRef,
    lots: Vec<SecurityLot>,
    total_shares: Decimal,
    initial_shares: Vec<Decimal>,
}

pub enum DialogResult {
    /// The allocated (non-empty) lots, replacing any previous lots of the sale.
    Saved(Vec<SecurityLot>),
    Cancelled,
}

impl AllocationSession {
    pub fn new(sale: DetailRef, lots: Vec<SecurityLot>) -> Result<AllocationSession, SError> {
        if let Some(lot) = lots.iter().find(|l| !l.sale().is_same(&sale)) {
            return Err(format!(
                "Lot for sale {} does not belong to sale {}", lot.sale().id, sale.id));
        }
        let total_shares = sale.shares();
        let initial_shares = lots.iter().map(|l| l.sale_shares()).collect();
        Ok(AllocationSession { sale, lots, total_shares, initial_shares })
    }

    pub fn sale(&self) -> &DetailRef {
        &self.sale
    }

    pub fn lots(&self) -> &[SecurityLot] {
        &self.lots
    }

    pub fn total_shares(&self) -> Decimal {
        self.total_shares
    }

    pub fn allocated_shares(&self) -> Decimal {
        sum(&self.lots, |l| l.sale_shares())
    }

    pub fn unallocated_shares(&self) -> Decimal {
        self.total_shares - self.allocated_shares()
    }

    pub fn apply_strategy(&mut self, strategy: LotAllocationStrategy) -> Decimal {
        strategy.allocate_lots(&mut self.lots, self.total_shares)
    }

    /// Sets the sale shares of the lot at `row`. The value can not exceed
    /// what the lot already has plus what its purchase has left.
    pub fn set_lot_shares(&mut self, row: usize, shares: Decimal) -> Result<(), SError> {
        let n_lots = self.lots.len();
        let lot = self.lots.get_mut(row).ok_or_else(|| {
            format!("Row {} is out of range (there are {} lots)", row + 1, n_lots)
        })?;
        if is_negative(&shares) {
            return Err(format!("Shares can not be negative ({})", shares));
        }
        let max_shares = lot.sale_shares() + lot.remaining_purchase_shares();
        if shares > max_shares {
            return Err(format!(
                "{} shares exceeds the {} available from the purchase on {}",
                shares, max_shares, lot.purchase_date()
            ));
        }
        lot.set_sale_shares(shares);
        Ok(())
    }

    pub fn discard_lots(&mut self) {
        for lot in self.lots.iter_mut() {
            lot.release();
        }
    }

    pub fn is_changed(&self) -> bool {
        self.lots
            .iter()
            .zip(self.initial_shares.iter())
            .any(|(lot, initial)| lot.sale_shares() != *initial)
    }

    /// A sale is saved either fully allocated, or with no lots at all.
    pub fn can_save(&self) -> bool {
        let allocated = self.allocated_shares();
        self.is_changed() && (allocated.is_zero() || allocated == self.total_shares)
    }

    /// The lots that have shares. Empty candidates are dropped.
    pub fn into_lots(self) -> Vec<SecurityLot> {
        self.lots.into_iter().filter(|l| !l.is_empty()).collect()
    }

    pub fn save(self) -> Result<DialogResult, SError> {
        if !self.can_save() {
            return Err(format!(
                "Can not save: {} of {} shares allocated", self.allocated_shares(), self.total_shares));
        }
        Ok(DialogResult::Saved(self.into_lots()))
    }

    /// Releases every lot's shares back to its purchase and sale.
    pub fn cancel(mut self) -> DialogResult {
        self.discard_lots();
        DialogResult::Cancelled
    }
}

/// Presents an allocation session to the user, who either saves or cancels.
pub trait LotAllocationUi {
    fn show_allocation_dialog(&mut self, session: AllocationSession) -> Result<DialogResult, SError>;
}

/// Allocates with a fixed strategy, and saves only when that covers the
/// whole sale.
pub struct StrategyAllocationUi {
    pub strategy: LotAllocationStrategy,
}

impl LotAllocationUi for StrategyAllocationUi {
    fn show_allocation_dialog(&mut self, mut session: AllocationSession) -> Result<DialogResult, SError> {
        let remaining = session.apply_strategy(self.strategy);
        if remaining.is_zero() && session.can_save() {
            session.save()
        } else {
            tracing::info!(
                "{} allocation for sale {} of {} on {} left {} shares unallocated",
                self.strategy, session.sale().id, session.sale().security,
                session.sale().date, remaining);
            Ok(session.cancel())
        }
    }
}

/// Leaves every incomplete sale for later.
pub struct SkipAllocationUi {}

impl LotAllocationUi for SkipAllocationUi {
    fn show_allocation_dialog(&mut self, session: AllocationSession) -> Result<DialogResult, SError> {
        Ok(session.cancel())
    }
}
