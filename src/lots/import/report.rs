use std::{io, str::FromStr};

use rust_decimal::Decimal;
use time::Date;

use crate::util::date::parse_mdy_date;
use crate::util::decimal::is_positive;

use super::error::ImportError;

pub const REPORT_FORMAT: &str = "TSV";
const N_FIELDS: usize = 8;

/// One row of a capital gains report.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct CapitalGainRecord {
    pub line: u64,
    pub security_name: String,
    pub shares: Decimal,
    pub purchase_date: Date,
    pub sale_date: Date,
    pub sales_price: Decimal,
    pub cost_basis: Decimal,
    pub gain_loss: Decimal,
}

impl CapitalGainRecord {
    /// Cost per share, as reported.
    pub fn price(&self) -> Decimal {
        self.cost_basis / self.shares
    }

    pub fn has_amounts(&self) -> bool {
        !self.cost_basis.is_zero() || !self.sales_price.is_zero()
    }
}

fn parse_amount(field: &str, name: &str) -> Result<Decimal, String> {
    let cleaned: String = field.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned)
        .map_err(|_| format!("Invalid {} \"{}\"", name, field))
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<CapitalGainRecord, String> {
    if record.len() != N_FIELDS {
        return Err(format!("Expected {} fields, found {}", N_FIELDS, record.len()));
    }
    // Field 0 is a record marker, which carries nothing we use.
    let security_name = record[1].trim().to_string();
    if security_name.is_empty() {
        return Err("Empty security name".to_string());
    }
    let shares = parse_amount(&record[2], "shares")?;
    if !is_positive(&shares) {
        return Err(format!("Shares must be positive (found {})", shares));
    }
    Ok(CapitalGainRecord {
        line,
        security_name,
        shares,
        purchase_date: parse_mdy_date(&record[3])?,
        sale_date: parse_mdy_date(&record[4])?,
        sales_price: parse_amount(&record[5], "sales price")?,
        cost_basis: parse_amount(&record[6], "cost basis")?,
        gain_loss: parse_amount(&record[7], "gain/loss")?,
    })
}

fn is_skipped(record: &csv::StringRecord) -> bool {
    record.get(0).map_or(true, |f| f.is_empty())
}

fn read_error(err: csv::Error, last_line: u64) -> ImportError {
    let line = err.position().map(|p| p.line()).unwrap_or(last_line + 1);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => ImportError::ImportFailed {
            format: REPORT_FORMAT,
            lines: last_line,
            source: e,
        },
        _ => ImportError::InvalidRecord {
            format: REPORT_FORMAT,
            line,
            reason,
        },
    }
}

/// Reads every data row of a tab separated capital gains report.
///
/// Blank lines and lines starting with a tab are skipped. The first other
/// line may be a header (or version marker), and is skipped if it does not
/// parse as a data row. Any later row that does not parse fails the read.
pub fn read_capital_gains(r: &mut dyn io::Read) -> Result<Vec<CapitalGainRecord>, ImportError> {
    let mut csv_r = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(r);

    let mut records = Vec::new();
    let mut seen_first = false;
    let mut last_line: u64 = 0;
    let mut record = csv::StringRecord::new();

    loop {
        match csv_r.read_record(&mut record) {
            Ok(true) => (),
            Ok(false) => break,
            Err(e) => return Err(read_error(e, last_line)),
        }
        let line = record.position().map(|p| p.line()).unwrap_or(last_line + 1);
        last_line = line;
        if is_skipped(&record) {
            continue;
        }

        match parse_record(&record, line) {
            Ok(r) => records.push(r),
            Err(reason) => {
                if !seen_first {
                    tracing::debug!("read_capital_gains: skipping header on line {}", line);
                } else {
                    return Err(ImportError::InvalidRecord {
                        format: REPORT_FORMAT,
                        line,
                        reason,
                    });
                }
            }
        }
        seen_first = true;
    }
    tracing::debug!("read_capital_gains: {} records from {} lines", records.len(), last_line);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io;

    use rust_decimal_macros::dec;

    use crate::util::date::{pub_testlib::ymd, set_todays_date_for_test};

    use super::{read_capital_gains, ImportError};

    const HEADER: &str = "Acct\tSecurity\tShares\tBought\tSold\tSales Price\tCost Basis\tGain/Loss\n";

    fn read(s: &str) -> Result<Vec<super::CapitalGainRecord>, ImportError> {
        set_todays_date_for_test(ymd(2024, 6, 1));
        read_capital_gains(&mut s.as_bytes())
    }

    #[test]
    fn test_read_records() {
        let recs = read(&format!(
            "{}X\tSecurity 1\t1,015.000\t01/20/00\t02/28/05\t1,150.00\t75.00\t1,075.00\n\
             \n\
             X\tSecurity A\t10.000\t1/20/91\t2/28/1999\t33.33\t11.10\t22.23\n",
            HEADER
        )).unwrap();

        assert_eq!(recs.len(), 2);
        let r = &recs[0];
        assert_eq!(r.line, 2);
        assert_eq!(r.security_name, "Security 1");
        assert_eq!(r.shares, dec!(1015));
        assert_eq!(r.purchase_date, ymd(2000, 1, 20));
        assert_eq!(r.sale_date, ymd(2005, 2, 28));
        assert_eq!(r.sales_price, dec!(1150));
        assert_eq!(r.cost_basis, dec!(75));
        assert_eq!(r.gain_loss, dec!(1075));

        assert_eq!(recs[1].purchase_date, ymd(1991, 1, 20));
        assert_eq!(recs[1].sale_date, ymd(1999, 2, 28));
        assert_eq!(recs[1].price(), dec!(1.11));
    }

    #[test]
    fn test_no_header() {
        let recs = read("X\tSecurity 1\t5\t01/20/01\t02/28/05\t50.00\t50.00\t0.00\n").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].line, 1);
    }

    #[test]
    fn test_header_only_and_empty() {
        assert!(read(HEADER).unwrap().is_empty());
        assert!(read("").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_line() {
        let err = read(&format!("{}\t\n\t\nAccount x\t\t\n", HEADER)).unwrap_err();
        match err {
            ImportError::InvalidRecord { format, line, .. } => {
                assert_eq!(format, "TSV");
                assert_eq!(line, 4);
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn test_invalid_values() {
        let bad_rows = [
            "X\tSecurity 1\tabc\t01/20/00\t02/28/05\t150.00\t75.00\t0.00",
            "X\tSecurity 1\t0\t01/20/00\t02/28/05\t150.00\t75.00\t0.00",
            "X\tSecurity 1\t15\t2000-01-20\t02/28/05\t150.00\t75.00\t0.00",
            "X\tSecurity 1\t15\t01/20/00\t02/28/05\t$150.00\t75.00\t0.00",
            "X\t\t15\t01/20/00\t02/28/05\t150.00\t75.00\t0.00",
        ];
        for row in bad_rows {
            let err = read(&format!("{}{}\n", HEADER, row)).unwrap_err();
            assert!(matches!(err, ImportError::InvalidRecord { line: 2, .. }), "{}", row);
            assert!(err.to_string().contains("line 2"), "{}", err);
        }
    }

    struct FailingReader {}

    impl io::Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_io_error() {
        let err = read_capital_gains(&mut FailingReader {}).unwrap_err();
        match err {
            ImportError::ImportFailed { format, lines, .. } => {
                assert_eq!(format, "TSV");
                assert_eq!(lines, 0);
            }
            e => panic!("unexpected error {:?}", e),
        }
    }
}
