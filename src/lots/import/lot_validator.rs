use rust_decimal::Decimal;

use crate::lots::model::SecurityLot;
use crate::lots::session::{AllocationSession, DialogResult, LotAllocationUi};
use crate::util::decimal::{is_negative, is_positive};

use super::error::ImportError;
use super::purchase_matcher::MatchedSale;

/// Checks that a sale's lots cover exactly its shares without taking more
/// than any purchase has. Sales that fall short go to the allocation UI.
pub struct LotValidator<'a> {
    ui: &'a mut dyn LotAllocationUi,
}

fn is_complete(m: &MatchedSale) -> bool {
    m.missing_purchases == 0
        && !m.lots.is_empty()
        && m.lot_shares() == m.sale.shares()
        && m.lots.iter().all(|l| !is_negative(&l.purchase().remaining_shares()))
}

impl<'a> LotValidator<'a> {
    pub fn new(ui: &'a mut dyn LotAllocationUi) -> LotValidator<'a> {
        LotValidator { ui }
    }

    /// Returns the lots to save for the sale, or None if the sale was left
    /// unresolved.
    pub fn validate(&mut self, m: MatchedSale) -> Result<Option<Vec<SecurityLot>>, ImportError> {
        if is_complete(&m) {
            return Ok(Some(m.lots));
        }
        tracing::info!(
            "Incomplete lots for sale {} of {} {} on {} ({} of {} shares, {} rows without a purchase)",
            m.sale.id, m.sale.shares(), m.sale.security, m.sale.date,
            m.lot_shares(), m.sale.shares(), m.missing_purchases);

        let MatchedSale { sale, mut lots, candidates, .. } = m;
        for p in candidates {
            let has_lot = lots.iter().any(|l| l.purchase().is_same(&p));
            if !has_lot && is_positive(&p.remaining_shares()) {
                lots.push(SecurityLot::new(p, sale.clone(), Decimal::ZERO)
                    .map_err(ImportError::Ledger)?);
            }
        }
        let session = AllocationSession::new(sale.clone(), lots).map_err(ImportError::Allocation)?;
        match self.ui.show_allocation_dialog(session).map_err(ImportError::Allocation)? {
            DialogResult::Saved(lots) => {
                tracing::info!("Saved {} lots for sale {}", lots.len(), sale.id);
                Ok(Some(lots))
            }
            DialogResult::Cancelled => {
                tracing::info!("Lot allocation for sale {} cancelled", sale.id);
                Ok(None)
            }
        }
    }
}
