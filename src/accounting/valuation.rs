//! Daily mark-to-market

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Symbol -> share count
pub type Holdings = BTreeMap<String, Decimal>;

/// Symbol -> native-currency close
pub type PriceMap = BTreeMap<String, Decimal>;

/// A single position marked above this many JPY is treated as corrupt data
pub const MAX_POSITION_VALUE: Decimal = dec!(10000000000000);

/// Value of `holdings` at `marks`, converted with `exchange_rate` when given.
///
/// Unpriced symbols contribute nothing.
pub fn portfolio_value(holdings: &Holdings, marks: &PriceMap, exchange_rate: Option<Decimal>) -> Decimal {
    holdings
        .iter()
        .filter_map(|(symbol, shares)| {
            let price = marks.get(symbol)?;
            let value = match exchange_rate {
                Some(fx) => shares * price * fx,
                None => shares * price,
            };
            if value > MAX_POSITION_VALUE {
                tracing::warn!(symbol = %symbol, %value, "Ignoring implausible position value");
                return None;
            }
            Some(value)
        })
        .sum()
}

/// Total assets in JPY. `usd_value_jpy` is already converted, `usd_cash` is not.
pub fn total_asset_value(
    jpy_value: Decimal,
    jpy_cash: Decimal,
    usd_value_jpy: Decimal,
    usd_cash: Decimal,
    exchange_rate: Decimal,
) -> Decimal {
    jpy_value + jpy_cash + usd_value_jpy + usd_cash * exchange_rate
}

/// Day-over-day change in percent; zero when the previous value is not positive
pub fn daily_pnl_rate(today: Decimal, previous: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (today - previous) / previous * dec!(100)
}
