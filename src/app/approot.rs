use std::path::Path;

use rust_decimal::Decimal;

use crate::ledger::file::{read_ledger_file, write_ledger_file};
use crate::lots::import::{CapitalGainImport, ImportSummary};
use crate::lots::model::SecurityLot;
use crate::lots::{AllocationSession, DialogResult, LotAllocationUi};
use crate::ledger::Ledger;
use crate::util::rw::{DescribedReader, WriteHandle};
use crate::write_errln;

use super::outfmt::model::{LotWriter, OutputType};
use super::outfmt::text::TextWriter;
use super::render::{render_import_summary, render_lots};

pub type Error = String;

/// Imports a capital gains report into the ledger file at `ledger_path`.
/// Sales the report does not settle go to `ui`. The file is rewritten
/// only if lots were saved, and never on a dry run.
pub fn run_import(
    report: &DescribedReader,
    ledger_path: &Path,
    dry_run: bool,
    ui: &mut dyn LotAllocationUi,
    mut out: WriteHandle,
) -> Result<ImportSummary, Error> {
    let mut ledger = read_ledger_file(ledger_path)?;

    let mut reader = report
        .reader()
        .map_err(|e| format!("Unable to open {}: {}", report.desc(), e))?;
    let summary = CapitalGainImport::new(&mut ledger, ui)
        .import(reader.as_mut())
        .map_err(|e| format!("{}: {}", report.desc(), e))?;

    TextWriter::new(out.clone()).print_render_table(
        OutputType::Summary,
        &format!("Import {}", report.desc()),
        &render_import_summary(&summary),
    )?;

    if summary.lots_saved == 0 {
        write_errln!(out, "No lots saved");
    } else if dry_run {
        write_errln!(out, "Dry run: {} not written", ledger_path.display());
    } else {
        write_ledger_file(&ledger, ledger_path)?;
        write_errln!(out, "Saved {} lots to {}", summary.lots_saved, ledger_path.display());
    }
    Ok(summary)
}

/// Opens the allocation dialog for one sale, with its current lots plus an
/// empty lot for every other purchase that could cover it. A saved dialog
/// replaces the sale's lots in the ledger file. Returns whether it saved.
pub fn run_allocate(
    sale_id: u64,
    ledger_path: &Path,
    ui: &mut dyn LotAllocationUi,
    mut out: WriteHandle,
) -> Result<bool, Error> {
    let mut ledger = read_ledger_file(ledger_path)?;
    let sale = ledger
        .find_sale(sale_id)
        .ok_or_else(|| format!("No sale with id {} in {}", sale_id, ledger_path.display()))?;

    let mut lots = ledger.take_sale_lots(sale_id);
    for purchase in ledger.find_purchases_for_sale(&sale) {
        if !lots.iter().any(|l| l.purchase().is_same(&purchase)) {
            lots.push(SecurityLot::new(purchase, sale.clone(), Decimal::ZERO)?);
        }
    }
    lots.sort_by_key(|l| (l.purchase_date(), l.purchase().id));

    let session = AllocationSession::new(sale, lots)?;
    match ui.show_allocation_dialog(session)? {
        DialogResult::Saved(lots) => {
            let n_lots = lots.len();
            ledger.save_security_lots(lots)?;
            write_ledger_file(&ledger, ledger_path)?;
            write_errln!(out, "Saved {} lots for sale {}", n_lots, sale_id);
            Ok(true)
        }
        DialogResult::Cancelled => {
            write_errln!(out, "Cancelled. {} is unchanged", ledger_path.display());
            Ok(false)
        }
    }
}

/// Prints every lot in the ledger file.
pub fn run_lots(ledger_path: &Path, out: WriteHandle) -> Result<(), Error> {
    let ledger = read_ledger_file(ledger_path)?;
    TextWriter::new(out).print_render_table(
        OutputType::Lots,
        &ledger_path.display().to_string(),
        &render_lots(ledger.lots()),
    )
}
