use std::{fmt::Display, io};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::ledger::Ledger;

use self::lot_validator::LotValidator;
use self::purchase_matcher::{MatchedSale, PurchaseMatcher};
use self::report::read_capital_gains;
use self::sale_matcher::match_sales;

use super::session::LotAllocationUi;

pub mod error;
pub mod lot_validator;
pub mod purchase_matcher;
pub mod report;
pub mod sale_matcher;
pub mod subset_sum;

pub use self::error::ImportError;
pub use self::report::{CapitalGainRecord, REPORT_FORMAT};

/// Two share counts (or per-share prices) closer than this are the same.
/// Reports round shares, so 16.000001 in the ledger is 16 in the report.
pub const MATCH_EPSILON: Decimal = dec!(0.0005);
/// Allowed difference per row between reported sales prices and the
/// ledger's sale amount.
pub const SALE_AMOUNT_TOLERANCE: Decimal = dec!(0.005);

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct ImportSummary {
    pub records: usize,
    pub matched_records: usize,
    pub ignored_records: usize,
    pub lots_saved: usize,
    pub unresolved_sales: usize,
}

impl Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records: {} matched, {} ignored. {} lots saved, {} sales unresolved",
            self.records, self.matched_records, self.ignored_records,
            self.lots_saved, self.unresolved_sales
        )
    }
}

/// Links the sales and purchases in a ledger using a capital gains report.
///
/// Report rows are matched to sales by security and sale date, then to
/// purchases by bought date, share count and price. Sales whose lots do
/// not add up are handed to the allocation UI. All lots are saved to the
/// ledger in one batch at the end.
pub struct CapitalGainImport<'a> {
    ledger: &'a mut dyn Ledger,
    ui: &'a mut dyn LotAllocationUi,
}

impl<'a> CapitalGainImport<'a> {
    pub fn new(ledger: &'a mut dyn Ledger, ui: &'a mut dyn LotAllocationUi) -> CapitalGainImport<'a> {
        CapitalGainImport { ledger, ui }
    }

    pub fn import(&mut self, r: &mut dyn io::Read) -> Result<ImportSummary, ImportError> {
        let records = read_capital_gains(r)?;
        let mut summary = ImportSummary { records: records.len(), ..ImportSummary::default() };

        let sale_matches = match_sales(&mut *self.ledger, records)?;
        summary.ignored_records = sale_matches.ignored_records;
        summary.unresolved_sales = sale_matches.unmatched_sales.len();

        let matched: Vec<MatchedSale> = {
            let mut purchase_matcher = PurchaseMatcher::new(&mut *self.ledger);
            sale_matches
                .matches
                .into_iter()
                .map(|m| purchase_matcher.match_purchases(m))
                .collect::<Result<_, _>>()?
        };

        let mut validator = LotValidator::new(&mut *self.ui);
        let mut batch = Vec::new();
        for m in matched {
            let n_records = m.records.len();
            match validator.validate(m)? {
                Some(lots) if !lots.is_empty() => {
                    summary.matched_records += n_records;
                    batch.extend(lots);
                }
                _ => summary.unresolved_sales += 1,
            }
        }

        if !batch.is_empty() {
            summary.lots_saved = batch.len();
            self.ledger.save_security_lots(batch).map_err(ImportError::Ledger)?;
        }
        tracing::info!("Capital gains import: {}", summary);
        Ok(summary)
    }
}
