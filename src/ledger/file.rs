//! JSON ledger file, holding securities, transaction details and lots.
//!
//! Dates are written as YYYY-MM-DD, and share quantities and amounts as
//! decimal strings so that no precision is lost.

use std::{fs, path::Path, str::FromStr};

use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use time::Date;

use crate::lots::model::{Security, SecurityLot, SplitRatio, StockSplit, TransactionDetail};
use crate::util::basic::SError;
use crate::util::date::{parse_standard_date, STANDARD_DATE_FORMAT};
use crate::util::decimal::is_negative;

use super::MemoryLedger;

fn serialize_date<S: Serializer>(d: &Date, s: S) -> Result<S::Ok, S::Error> {
    let text = d.format(STANDARD_DATE_FORMAT).map_err(serde::ser::Error::custom)?;
    s.serialize_str(&text)
}

fn deserialize_date<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
    let date_str = String::deserialize(d)?;
    parse_standard_date(&date_str)
        .map_err(|e| de::Error::custom(format!("Invalid date \"{}\": {}", date_str, e)))
}

fn serialize_decimal<S: Serializer>(d: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&d.to_string())
}

fn deserialize_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    let dec_str = String::deserialize(d)?;
    Decimal::from_str(dec_str.trim())
        .map_err(|e| de::Error::custom(format!("Invalid decimal \"{}\": {}", dec_str, e)))
}

fn serialize_ratio<S: Serializer>(r: &SplitRatio, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&r.to_string())
}

fn deserialize_ratio<'de, D: Deserializer<'de>>(d: D) -> Result<SplitRatio, D::Error> {
    let ratio_str = String::deserialize(d)?;
    SplitRatio::parse(&ratio_str).map_err(de::Error::custom)
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub struct SplitEntry {
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    pub date: Date,
    #[serde(serialize_with = "serialize_ratio", deserialize_with = "deserialize_ratio")]
    pub ratio: SplitRatio,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub struct SecurityEntry {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<SplitEntry>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub struct DetailEntry {
    pub id: u64,
    pub account: String,
    pub security_id: u64,
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    pub date: Date,
    #[serde(serialize_with = "serialize_decimal", deserialize_with = "deserialize_decimal")]
    pub amount: Decimal,
    #[serde(serialize_with = "serialize_decimal", deserialize_with = "deserialize_decimal")]
    pub asset_quantity: Decimal,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
pub struct LotEntry {
    pub purchase_id: u64,
    pub sale_id: u64,
    #[serde(serialize_with = "serialize_decimal", deserialize_with = "deserialize_decimal")]
    pub purchase_shares: Decimal,
    #[serde(serialize_with = "serialize_decimal", deserialize_with = "deserialize_decimal")]
    pub sale_shares: Decimal,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct LedgerFile {
    #[serde(default)]
    pub securities: Vec<SecurityEntry>,
    #[serde(default)]
    pub details: Vec<DetailEntry>,
    #[serde(default)]
    pub lots: Vec<LotEntry>,
}

impl LedgerFile {
    pub fn parse(json: &str) -> Result<LedgerFile, SError> {
        serde_json::from_str(json).map_err(|e| format!("Invalid ledger file: {}", e))
    }

    pub fn to_json(&self) -> Result<String, SError> {
        serde_json::to_string_pretty(self).map_err(|e| e.to_string())
    }

    pub fn into_ledger(self) -> Result<MemoryLedger, SError> {
        let mut ledger = MemoryLedger::new();
        for s in self.securities {
            let mut security = Security::new(s.id, &s.name);
            if let Some(scale) = s.scale {
                security.scale = scale;
            }
            security.set_splits(
                s.splits.into_iter().map(|e| StockSplit { date: e.date, ratio: e.ratio }).collect());
            ledger.add_security(security)?;
        }

        for d in self.details {
            let security = ledger.security(d.security_id).ok_or_else(|| {
                format!("Transaction detail {} refers to unknown security {}", d.id, d.security_id)
            })?;
            ledger.add_detail(TransactionDetail::new(
                d.id, &d.account, security, d.date, d.amount, d.asset_quantity))?;
        }

        let detail = |ledger: &MemoryLedger, id: u64| {
            ledger.detail(id).ok_or_else(|| format!("Lot refers to unknown transaction detail {}", id))
        };
        for l in self.lots {
            let purchase = detail(&ledger, l.purchase_id)?;
            let sale = detail(&ledger, l.sale_id)?;
            let lot = SecurityLot::from_saved(purchase, sale, l.purchase_shares, l.sale_shares)
                .map_err(|e| format!("Invalid lot {}-{}: {}", l.purchase_id, l.sale_id, e))?;
            ledger.restore_lot(lot);
        }

        if let Some(d) = ledger.details().iter().find(|d| is_negative(&d.remaining_shares())) {
            return Err(format!(
                "Transaction detail {} has more shares in lots ({}) than it has ({})",
                d.id, d.lot_shares(), d.shares()));
        }
        Ok(ledger)
    }

    pub fn from_ledger(ledger: &MemoryLedger) -> LedgerFile {
        LedgerFile {
            securities: ledger
                .securities()
                .iter()
                .map(|s| SecurityEntry {
                    id: s.id,
                    name: s.name.clone(),
                    scale: Some(s.scale),
                    splits: s.splits().iter()
                        .map(|sp| SplitEntry { date: sp.date, ratio: sp.ratio })
                        .collect(),
                })
                .collect(),
            details: ledger
                .details()
                .iter()
                .map(|d| DetailEntry {
                    id: d.id,
                    account: d.account.clone(),
                    security_id: d.security.id,
                    date: d.date,
                    amount: d.amount,
                    asset_quantity: d.asset_quantity,
                })
                .collect(),
            lots: ledger
                .lots()
                .iter()
                .map(|l| LotEntry {
                    purchase_id: l.purchase().id,
                    sale_id: l.sale().id,
                    purchase_shares: l.purchase_shares(),
                    sale_shares: l.sale_shares(),
                })
                .collect(),
        }
    }
}

pub fn read_ledger_file(path: &Path) -> Result<MemoryLedger, SError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Unable to read ledger {}: {}", path.display(), e))?;
    let ledger = LedgerFile::parse(&contents)?.into_ledger()?;
    tracing::debug!("read_ledger_file: {} details and {} lots from {}",
                    ledger.details().len(), ledger.lots().len(), path.display());
    Ok(ledger)
}

pub fn write_ledger_file(ledger: &MemoryLedger, path: &Path) -> Result<(), SError> {
    let json = LedgerFile::from_ledger(ledger).to_json()?;
    fs::write(path, json + "\n")
        .map_err(|e| format!("Unable to write ledger {}: {}", path.display(), e))
}
