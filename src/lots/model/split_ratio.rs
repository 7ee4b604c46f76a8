use std::fmt::Display;

use rust_decimal::Decimal;

use crate::util::basic::SError;
use crate::util::decimal::{round_half_even, PosDecimal};

/// Cumulative share multiplier of one or more stock splits.
///
/// `shares_in` is the pre-split share count and `shares_out` the post-split
/// count, so a 2-for-1 split has `shares_in = 1` and `shares_out = 2`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct SplitRatio {
    pub shares_in: PosDecimal,
    pub shares_out: PosDecimal,
}

impl SplitRatio {
    pub fn new(shares_in: PosDecimal, shares_out: PosDecimal) -> SplitRatio {
        SplitRatio { shares_in, shares_out }
    }

    pub fn identity() -> SplitRatio {
        SplitRatio::new(PosDecimal::one(), PosDecimal::one())
    }

    pub fn is_identity(&self) -> bool {
        *self.shares_in == *self.shares_out
    }

    /// Combines two ratios, as if both splits happened in sequence.
    pub fn multiply(&self, other: &SplitRatio) -> SplitRatio {
        SplitRatio {
            shares_in: self.shares_in * other.shares_in,
            shares_out: self.shares_out * other.shares_out,
        }
    }

    /// Converts a pre-split share count to post-split terms.
    pub fn apply(&self, shares: Decimal, scale: u32) -> Decimal {
        round_half_even(shares * *self.shares_out / *self.shares_in, scale)
    }

    /// Converts a post-split share count back to pre-split terms.
    pub fn revert(&self, shares: Decimal, scale: u32) -> Decimal {
        round_half_even(shares * *self.shares_in / *self.shares_out, scale)
    }

    pub fn ratio_as_decimal(&self, scale: u32) -> Decimal {
        round_half_even(*self.shares_out / *self.shares_in, scale)
    }

    /// Parses the "N-for-M" form, where N is shares out and M is shares in.
    pub fn parse(s: &str) -> Result<SplitRatio, SError> {
        let err = || format!("Invalid split ratio \"{}\" (expected N-for-M)", s);
        let (out_str, in_str) = s.trim().split_once("-for-").ok_or_else(err)?;
        let parse_part = |part: &str| -> Result<PosDecimal, SError> {
            let d = part.trim().parse::<Decimal>().map_err(|_| err())?;
            PosDecimal::try_from(d).map_err(|_| err())
        };
        Ok(SplitRatio {
            shares_in: parse_part(in_str)?,
            shares_out: parse_part(out_str)?,
        })
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        SplitRatio::identity()
    }
}

impl Display for SplitRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-for-{}", self.shares_out.normalize(), self.shares_in.normalize())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::pdec;

    use super::SplitRatio;

    fn ratio(shares_in: u32, shares_out: u32) -> SplitRatio {
        SplitRatio::parse(&format!("{}-for-{}", shares_out, shares_in)).unwrap()
    }

    #[test]
    fn test_default_is_identity() {
        let r = SplitRatio::default();
        assert!(r.is_identity());
        assert_eq!(r.apply(dec!(12.5), 6), dec!(12.5));
        assert_eq!(r.revert(dec!(12.5), 6), dec!(12.5));
        assert_eq!(r.ratio_as_decimal(6), dec!(1));
    }

    #[test]
    fn test_apply_revert() {
        let r = ratio(1, 2);
        assert_eq!(r.apply(dec!(16), 6), dec!(32));
        assert_eq!(r.revert(dec!(16), 6), dec!(8));
        assert_eq!(r.ratio_as_decimal(6), dec!(2));

        let reverse = ratio(3, 1);
        assert_eq!(reverse.apply(dec!(10), 6), dec!(3.333333));
        assert_eq!(reverse.revert(dec!(3.333333), 6), dec!(9.999999));
        assert_eq!(reverse.ratio_as_decimal(4), dec!(0.3333));
    }

    #[test]
    fn test_apply_revert_round_trip() {
        for r in [ratio(1, 2), ratio(2, 3), ratio(1, 4), ratio(5, 4)] {
            for shares in [dec!(1), dec!(7.5), dec!(16.000001), dec!(1000)] {
                let there = r.apply(shares, 6);
                let back = r.revert(there, 6);
                assert!((back - shares).abs() <= dec!(0.000002),
                        "{} {} -> {} -> {}", r, shares, there, back);
            }
        }
    }

    #[test]
    fn test_half_even_rounding() {
        // Halving an odd millionth lands exactly on a midpoint
        let r = ratio(2, 1);
        assert_eq!(r.apply(dec!(0.000001), 6), dec!(0.000000));
        assert_eq!(r.apply(dec!(0.000003), 6), dec!(0.000002));
    }

    #[test]
    fn test_multiply() {
        let a = ratio(1, 2);
        let b = ratio(2, 3);
        let c = ratio(1, 4);
        assert_eq!(a.multiply(&b).ratio_as_decimal(6), dec!(3));
        assert_eq!(a.multiply(&b).ratio_as_decimal(6), b.multiply(&a).ratio_as_decimal(6));
        assert_eq!(
            a.multiply(&b).multiply(&c).ratio_as_decimal(6),
            a.multiply(&b.multiply(&c)).ratio_as_decimal(6)
        );
        assert_eq!(a.multiply(&SplitRatio::identity()), a);
    }

    #[test]
    fn test_parse_and_display() {
        let r = SplitRatio::parse("2-for-1").unwrap();
        assert_eq!(r, SplitRatio::new(pdec!(1), pdec!(2)));
        assert_eq!(r.to_string(), "2-for-1");

        let r = SplitRatio::parse(" 3-for-2.5 ").unwrap();
        assert_eq!(r.to_string(), "3-for-2.5");

        assert!(SplitRatio::parse("2:1").is_err());
        assert!(SplitRatio::parse("0-for-1").is_err());
        assert!(SplitRatio::parse("2-for--1").is_err());
        assert!(SplitRatio::parse("x-for-1").is_err());
        assert!(SplitRatio::parse("").is_err());
    }
}
