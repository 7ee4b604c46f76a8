use std::collections::HashMap;

use itertools::Itertools;
use rust_decimal::Decimal;
use time::Date;

use crate::ledger::Ledger;
use crate::lots::model::{DetailRef, SecurityLot, TransactionDetail};
use crate::util::decimal::{is_negative, is_positive, is_within, sum};

use super::error::ImportError;
use super::report::CapitalGainRecord;
use super::sale_matcher::SaleMatch;
use super::MATCH_EPSILON;

// Account, security id and purchase date
type PurchaseKey = (String, u64, Date);

/// A sale with the lots built for its report rows.
#[derive(Debug)]
pub struct MatchedSale {
    pub sale: DetailRef,
    pub records: Vec<CapitalGainRecord>,
    pub lots: Vec<SecurityLot>,
    // Every purchase looked up for this sale's rows
    pub candidates: Vec<DetailRef>,
    pub missing_purchases: usize,
}

impl MatchedSale {
    pub fn lot_shares(&self) -> Decimal {
        sum(&self.lots, |l| l.sale_shares())
    }
}

/// Finds the purchase behind each report row. Purchase lookups are cached
/// for the life of the matcher, so each (account, security, date) is only
/// queried once per import.
pub struct PurchaseMatcher<'a> {
    ledger: &'a mut dyn Ledger,
    cache: HashMap<PurchaseKey, Vec<DetailRef>>,
}

impl<'a> PurchaseMatcher<'a> {
    pub fn new(ledger: &'a mut dyn Ledger) -> PurchaseMatcher<'a> {
        PurchaseMatcher { ledger, cache: HashMap::new() }
    }

    fn purchases(&mut self, sale: &TransactionDetail, date: Date) -> Result<Vec<DetailRef>, ImportError> {
        let key = (sale.account.clone(), sale.security.id, date);
        if let Some(purchases) = self.cache.get(&key) {
            return Ok(purchases.clone());
        }
        let purchases = self
            .ledger
            .find_purchases_with_remaining_lots(&sale.account, &sale.security, date)
            .map_err(ImportError::Ledger)?;
        tracing::debug!("PurchaseMatcher: {} purchases of {} on {}",
                        purchases.len(), sale.security, date);
        self.cache.insert(key, purchases.clone());
        Ok(purchases)
    }

    pub fn match_purchases(&mut self, m: SaleMatch) -> Result<MatchedSale, ImportError> {
        let SaleMatch { sale, records } = m;
        let single_row = records.len() == 1;
        let mut lots: Vec<SecurityLot> = Vec::new();
        let mut candidates: Vec<DetailRef> = Vec::new();
        let mut missing_purchases = 0;

        // Largest rows first, so they get the first pick of purchases
        for row in records.iter().sorted_by(|a, b| b.shares.cmp(&a.shares)) {
            let purchases = self.purchases(&sale, row.purchase_date)?;
            for p in &purchases {
                if !candidates.iter().any(|c| c.is_same(p)) {
                    candidates.push(p.clone());
                }
            }

            let purchase_shares = sale.security.revert_splits(
                row.shares, Some(row.purchase_date), Some(sale.date));
            let purchase = match select_purchase(row, &sale, purchase_shares, &purchases) {
                Some(p) => p,
                None => {
                    tracing::info!("No purchase of {} {} on {} for line {}",
                                   purchase_shares, sale.security, row.purchase_date, row.line);
                    missing_purchases += 1;
                    continue;
                }
            };

            let mut lot = SecurityLot::new(purchase.clone(), sale.clone(), Decimal::ZERO)
                .map_err(ImportError::Ledger)?;
            if single_row {
                lot.set_sale_shares(sale.shares());
            } else {
                let remaining = purchase.remaining_shares();
                if is_within(purchase_shares, remaining, MATCH_EPSILON) {
                    lot.set_purchase_shares(remaining);
                } else {
                    lot.set_purchase_shares(purchase_shares);
                }
            }
            tracing::debug!("PurchaseMatcher: line {} -> purchase {} ({} shares) for sale {}",
                            row.line, purchase.id, lot.purchase_shares(), sale.id);
            lots.push(lot);
        }

        if missing_purchases == 0 {
            absorb_residual(&sale, &mut lots);
        }
        Ok(MatchedSale { sale, records, lots, candidates, missing_purchases })
    }
}

// Report shares are rounded, so the lots may end up a hair off the sale's
// shares. The last lot takes up the difference if its purchase allows it.
fn absorb_residual(sale: &TransactionDetail, lots: &mut [SecurityLot]) {
    let diff = sale.shares() - sum(lots, |l| l.sale_shares());
    if diff.is_zero() || !is_within(diff, Decimal::ZERO, MATCH_EPSILON) {
        return;
    }
    if let Some(last) = lots.last_mut() {
        if is_negative(&diff) || last.remaining_purchase_shares() >= diff {
            last.set_sale_shares(last.sale_shares() + diff);
        }
    }
}

/// Chooses the purchase for a report row among the purchases on its
/// bought date. A lone purchase only needs room for the row's shares.
/// Otherwise the purchase's split-adjusted price must match the row's cost
/// per share, unless either side has no amounts to compare. Among those an
/// exact share match wins, then the closest price with room for the row.
fn select_purchase(
    row: &CapitalGainRecord,
    sale: &TransactionDetail,
    purchase_shares: Decimal,
    purchases: &[DetailRef],
) -> Option<DetailRef> {
    let has_room = |p: &DetailRef| p.remaining_shares() + MATCH_EPSILON >= purchase_shares;

    if purchases.len() == 1 {
        return purchases.first().filter(|p| has_room(p)).cloned();
    }

    let row_price = row.price();
    let price_diff = |p: &DetailRef| -> Option<Decimal> {
        if p.amount.is_zero() || !row.has_amounts() {
            return Some(Decimal::ZERO);
        }
        let diff = (p.purchase_price(sale.date) - row_price).abs();
        if diff <= MATCH_EPSILON {
            Some(diff)
        } else {
            None
        }
    };
    let qualified: Vec<(&DetailRef, Decimal)> = purchases
        .iter()
        .filter(|p| is_positive(&p.remaining_shares()))
        .filter_map(|p| price_diff(p).map(|d| (p, d)))
        .collect();

    if let Some((p, _)) = qualified
        .iter()
        .find(|(p, _)| is_within(p.remaining_shares(), purchase_shares, MATCH_EPSILON))
    {
        return Some((*p).clone());
    }

    qualified
        .iter()
        .filter(|(p, _)| has_room(p))
        .min_by(|(p1, d1), (p2, d2)| {
            d1.cmp(d2).then_with(|| p2.remaining_shares().cmp(&p1.remaining_shares()))
        })
        .map(|(p, _)| (*p).clone())
}
