use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use time::Date;

use crate::ledger::Ledger;
use crate::lots::model::{DetailRef, TransactionDetail};
use crate::util::date::format_us_date;
use crate::util::decimal::is_within;

use super::error::ImportError;
use super::report::CapitalGainRecord;
use super::subset_sum::smallest_subset;
use super::{MATCH_EPSILON, SALE_AMOUNT_TOLERANCE};

/// A ledger sale and the report rows that make up its shares.
#[derive(Debug)]
pub struct SaleMatch {
    pub sale: DetailRef,
    pub records: Vec<CapitalGainRecord>,
}

#[derive(Debug, Default)]
pub struct SaleMatches {
    pub matches: Vec<SaleMatch>,
    // Sales found in the ledger that no set of rows adds up to
    pub unmatched_sales: Vec<DetailRef>,
    pub ignored_records: usize,
}

fn is_sale_amount_equal(rows: &[&CapitalGainRecord], sale: &TransactionDetail) -> bool {
    let total: Decimal = rows.iter().map(|r| r.sales_price).sum();
    is_within(total, sale.amount.abs(), SALE_AMOUNT_TOLERANCE * Decimal::from(rows.len()))
}

// Picks the rows for a sale. Fewer rows win, and rows whose sales prices add
// up to the sale amount win over rows that only match the share count.
fn choose_rows(sale: &TransactionDetail, rows: &[CapitalGainRecord]) -> Option<Vec<usize>> {
    let shares: Vec<Decimal> = rows.iter().map(|r| r.shares).collect();
    // Usually one sale takes the whole group
    if is_within(shares.iter().sum(), sale.shares(), MATCH_EPSILON) {
        return Some((0..rows.len()).collect());
    }
    smallest_subset(sale.shares(), MATCH_EPSILON, &shares, |idxs| {
        if sale.amount.is_zero() {
            return false;
        }
        let subset: Vec<&CapitalGainRecord> = idxs.iter().map(|i| &rows[*i]).collect();
        is_sale_amount_equal(&subset, sale)
    })
}

/// Groups report rows by security and sale date, and splits each group
/// between the ledger sales of that security on that date.
pub fn match_sales(
    ledger: &mut dyn Ledger,
    records: Vec<CapitalGainRecord>,
) -> Result<SaleMatches, ImportError> {
    let mut groups: BTreeMap<(String, Date), Vec<CapitalGainRecord>> = BTreeMap::new();
    for r in records {
        groups.entry((r.security_name.clone(), r.sale_date)).or_default().push(r);
    }

    let mut result = SaleMatches::default();
    let mut claimed_sales: HashSet<u64> = HashSet::new();

    for ((security_name, sale_date), mut rows) in groups {
        tracing::debug!("match_sales: {} on {}: {} rows", security_name, sale_date, rows.len());
        let mut sales = ledger
            .find_security_sales_without_lots(&security_name, sale_date)
            .map_err(ImportError::Ledger)?;
        sales.retain(|s| !claimed_sales.contains(&s.id));
        if sales.is_empty() {
            tracing::info!("No sale without lots found for {} on {}",
                           security_name, format_us_date(&sale_date));
            result.ignored_records += rows.len();
            continue;
        }

        // Zero amount sales can take any rows, so they go last.
        sales.sort_by_key(|s| s.amount.is_zero());

        for sale in sales {
            match choose_rows(&sale, &rows) {
                Some(idxs) => {
                    let mut taken = Vec::with_capacity(idxs.len());
                    // Remove back to front so the earlier indices stay valid
                    for i in idxs.iter().rev() {
                        taken.push(rows.remove(*i));
                    }
                    taken.reverse();
                    tracing::debug!("match_sales: sale {} ({} shares) takes lines {:?}",
                                    sale.id, sale.shares(),
                                    taken.iter().map(|r| r.line).collect::<Vec<_>>());
                    claimed_sales.insert(sale.id);
                    result.matches.push(SaleMatch { sale, records: taken });
                }
                None => {
                    tracing::info!("No report rows for sale {} of {} {} on {}",
                                   sale.id, sale.shares(), sale.security, sale.date);
                    result.unmatched_sales.push(sale);
                }
            }
        }

        if !rows.is_empty() {
            tracing::info!("Ignoring {} rows for {} on {} (lines {:?}), which match no sale",
                           rows.len(), security_name, format_us_date(&sale_date),
                           rows.iter().map(|r| r.line).collect::<Vec<_>>());
            result.ignored_records += rows.len();
        }
    }
    Ok(result)
}
