// Helpers shared by unit tests and the integration tests under tests/
// (through the "testlib" feature).
use std::{collections::HashMap, fmt::Debug, iter::zip, rc::Rc};

use regex::Regex;
use rust_decimal::Decimal;
use time::Date;

use crate::ledger::{Ledger, MemoryLedger};
use crate::lots::model::{DetailRef, Security, SecurityLot, StockSplit, TransactionDetail};
use crate::lots::{AllocationSession, DialogResult, LotAllocationUi};
use crate::util::basic::SError;

pub fn assert_re(pattern: &str, haystack: &str) {
    let re = Regex::new(pattern).unwrap();
    assert!(re.is_match(haystack), "{:?} did not match {:?}", haystack, re);
}

fn eprint_vecs<T: PartialEq + Debug>(left: &[T], right: &[T]) {
    let mut err_str = "left != right. left: [\n".to_string();
    for o in left {
        err_str += &format!("{:?},\n", o);
    }
    err_str += "] != right: [\n";
    for o in right {
        err_str += &format!("{:?},\n", o);
    }
    eprintln!("{}]", err_str);
}

pub fn assert_vec_eq<T: PartialEq + Debug>(left: Vec<T>, right: Vec<T>) {
    assert_vecr_eq(&left, &right);
}

pub fn assert_vecr_eq<T: PartialEq + Debug>(left: &[T], right: &[T]) {
    if left == right {
        return;
    }
    eprint_vecs(left, right);

    if left.len() != right.len() {
        panic!("size of left ({}) != size of right ({})", left.len(), right.len());
    }
    for (i, (l, r)) in zip(left, right).enumerate() {
        if l != r {
            eprintln!("Mismatch at index {}:", i);
            eprintln!("left: {:#?} != right: {:#?}", l, r);
        }
    }
    panic!();
}

pub const TEST_ACCOUNT: &str = "Brokerage";

/// Builds a MemoryLedger with generated detail ids, all in TEST_ACCOUNT
/// unless stated otherwise.
pub struct TestLedgerBuilder {
    ledger: MemoryLedger,
    next_id: u64,
}

impl Default for TestLedgerBuilder {
    fn default() -> Self {
        TestLedgerBuilder { ledger: MemoryLedger::new(), next_id: 1 }
    }
}

impl TestLedgerBuilder {
    pub fn new() -> TestLedgerBuilder {
        TestLedgerBuilder::default()
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn security(&mut self, name: &str) -> Rc<Security> {
        self.security_with_splits(name, Vec::new())
    }

    pub fn security_with_splits(&mut self, name: &str, splits: Vec<StockSplit>) -> Rc<Security> {
        let id = self.take_id();
        self.ledger
            .add_security(Security::new(id, name).with_splits(splits))
            .unwrap()
    }

    pub fn detail(
        &mut self,
        account: &str,
        security: &Rc<Security>,
        date: Date,
        amount: Decimal,
        asset_quantity: Decimal,
    ) -> DetailRef {
        let id = self.take_id();
        self.ledger
            .add_detail(TransactionDetail::new(
                id, account, security.clone(), date, amount, asset_quantity))
            .unwrap()
    }

    /// `amount` is the cash paid, so it is negative (or zero).
    pub fn purchase(
        &mut self, security: &Rc<Security>, date: Date, amount: Decimal, shares: Decimal,
    ) -> DetailRef {
        self.detail(TEST_ACCOUNT, security, date, amount, shares)
    }

    /// `shares` is the positive number of shares sold.
    pub fn sale(
        &mut self, security: &Rc<Security>, date: Date, amount: Decimal, shares: Decimal,
    ) -> DetailRef {
        self.detail(TEST_ACCOUNT, security, date, amount, -shares)
    }

    pub fn build(self) -> MemoryLedger {
        self.ledger
    }
}

/// A MemoryLedger that records every call made through the Ledger trait.
#[derive(Default)]
pub struct CountingLedger {
    pub ledger: MemoryLedger,
    pub sale_queries: Vec<(String, Date)>,
    // (account, security id, purchase date)
    pub purchase_queries: Vec<(String, u64, Date)>,
    // Number of lots in each save, including failed ones
    pub saves: Vec<usize>,
    // When set, saves fail with this message
    pub save_error: Option<String>,
}

impl CountingLedger {
    pub fn new(ledger: MemoryLedger) -> CountingLedger {
        CountingLedger { ledger, ..CountingLedger::default() }
    }

    pub fn failing_saves(ledger: MemoryLedger, err: &str) -> CountingLedger {
        CountingLedger { save_error: Some(err.to_string()), ..CountingLedger::new(ledger) }
    }

    pub fn purchase_query_count(&self, security: &Security) -> usize {
        self.purchase_queries.iter().filter(|q| q.1 == security.id).count()
    }

    /// Purchase queries per (account, security id, date). Each should be 1.
    pub fn purchase_queries_by_key(&self) -> HashMap<(String, u64, Date), usize> {
        let mut counts = HashMap::new();
        for q in &self.purchase_queries {
            *counts.entry(q.clone()).or_insert(0) += 1;
        }
        counts
    }
}

impl Ledger for CountingLedger {
    fn find_security_sales_without_lots(
        &mut self,
        security_name_prefix: &str,
        sale_date: Date,
    ) -> Result<Vec<DetailRef>, SError> {
        self.sale_queries.push((security_name_prefix.to_string(), sale_date));
        self.ledger.find_security_sales_without_lots(security_name_prefix, sale_date)
    }

    fn find_purchases_with_remaining_lots(
        &mut self,
        account: &str,
        security: &Security,
        purchase_date: Date,
    ) -> Result<Vec<DetailRef>, SError> {
        self.purchase_queries.push((account.to_string(), security.id, purchase_date));
        self.ledger.find_purchases_with_remaining_lots(account, security, purchase_date)
    }

    fn save_security_lots(&mut self, lots: Vec<SecurityLot>) -> Result<(), SError> {
        self.saves.push(lots.len());
        if let Some(err) = &self.save_error {
            return Err(err.clone());
        }
        self.ledger.save_security_lots(lots)
    }
}

type ScriptFn = Box<dyn FnMut(&mut AllocationSession) -> bool>;

/// Stands in for the allocation dialog. The script edits the session and
/// returns true to save it, or false to cancel.
pub struct ScriptedUi {
    script: ScriptFn,
    // Ids of the sales a dialog was shown for
    pub shown_sales: Vec<u64>,
}

impl ScriptedUi {
    pub fn new<F: FnMut(&mut AllocationSession) -> bool + 'static>(script: F) -> ScriptedUi {
        ScriptedUi { script: Box::new(script), shown_sales: Vec::new() }
    }

    pub fn cancelling() -> ScriptedUi {
        ScriptedUi::new(|_| false)
    }
}

impl LotAllocationUi for ScriptedUi {
    fn show_allocation_dialog(
        &mut self,
        mut session: AllocationSession,
    ) -> Result<DialogResult, SError> {
        self.shown_sales.push(session.sale().id);
        if (self.script)(&mut session) {
            session.save()
        } else {
            Ok(session.cancel())
        }
    }
}
