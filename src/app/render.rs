use itertools::Itertools;
use rust_decimal::Decimal;

use crate::lots::import::ImportSummary;
use crate::lots::model::SecurityLot;
use crate::lots::AllocationSession;
use crate::util::decimal::round_half_even;

use super::outfmt::model::RenderTable;

const PRICE_DISPLAY_SCALE: u32 = 4;

fn shares_str(d: Decimal) -> String {
    d.normalize().to_string()
}

fn price_str(d: Decimal) -> String {
    let mut price = round_half_even(d, PRICE_DISPLAY_SCALE);
    price.rescale(PRICE_DISPLAY_SCALE);
    price.to_string()
}

fn strings(vals: &[&str]) -> Vec<String> {
    vals.iter().map(|s| s.to_string()).collect()
}

/// The lots of an allocation session, numbered from 1 as the dialog
/// commands expect.
pub fn render_allocation_session(session: &AllocationSession) -> RenderTable {
    let sale = session.sale();
    let header = strings(&[
        "#", "Purchased", "Price", "Purchase Shares", "Available", "Sale Shares",
    ]);
    let rows = session
        .lots()
        .iter()
        .enumerate()
        .map(|(i, lot)| {
            vec![
                (i + 1).to_string(),
                lot.purchase_date().to_string(),
                price_str(lot.purchase_price()),
                shares_str(lot.purchase_shares()),
                shares_str(lot.remaining_purchase_shares()),
                shares_str(lot.sale_shares()),
            ]
        })
        .collect();

    let mut footer = vec![String::new(); header.len()];
    footer[4] = "Allocated".to_string();
    footer[5] = shares_str(session.allocated_shares());

    let mut notes = vec![format!(
        "Sale {} in {} on {}: {} shares, {} unallocated",
        sale.id,
        sale.account,
        sale.date,
        shares_str(session.total_shares()),
        shares_str(session.unallocated_shares())
    )];
    if session.lots().is_empty() {
        notes.push("No purchases are available for this sale".to_string());
    }

    RenderTable { header, rows, footer, notes, errors: Vec::new() }
}

/// All lots, ordered by sale and then purchase.
pub fn render_lots(lots: &[SecurityLot]) -> RenderTable {
    let header = strings(&[
        "Security", "Account", "Sold", "Sale Shares", "Purchased", "Purchase Shares", "Price",
    ]);
    let rows = lots
        .iter()
        .sorted_by_key(|l| (l.sale_date(), l.sale().id, l.purchase_date(), l.purchase().id))
        .map(|lot| {
            vec![
                lot.security().name.clone(),
                lot.sale().account.clone(),
                lot.sale_date().to_string(),
                shares_str(lot.sale_shares()),
                lot.purchase_date().to_string(),
                shares_str(lot.purchase_shares()),
                price_str(lot.purchase_price()),
            ]
        })
        .collect();

    let n_sales = lots.iter().map(|l| l.sale().id).unique().count();
    RenderTable {
        header,
        rows,
        notes: vec![format!("{} lots for {} sales", lots.len(), n_sales)],
        ..RenderTable::default()
    }
}

pub fn render_import_summary(summary: &ImportSummary) -> RenderTable {
    RenderTable {
        header: strings(&["Records", "Matched", "Ignored", "Lots Saved", "Unresolved Sales"]),
        rows: vec![vec![
            summary.records.to_string(),
            summary.matched_records.to_string(),
            summary.ignored_records.to_string(),
            summary.lots_saved.to_string(),
            summary.unresolved_sales.to_string(),
        ]],
        ..RenderTable::default()
    }
}
