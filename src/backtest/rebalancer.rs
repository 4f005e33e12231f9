//! Vote-driven bucket rebalancing
//!
//! One call rebalances one currency bucket on one rebalance day:
//!
//! 1. sell every holding that dropped out of the ranking,
//! 2. size investable capital (principal on the first rebalance),
//! 3. compute whole-share targets per ranked slot,
//! 4. correct capital for the proceeds of forced reductions,
//! 5. sell down to target, then
//! 6. buy up to target, shrinking buys that cash cannot cover.
//!
//! Symbols without a price for the day are never traded.

use super::{AllocationSchedule, CurrencyBook};
use crate::accounting::PriceMap;
use crate::config::Config;
use crate::execution::{CostModel, TradeAction, TradeRecord};
use crate::pricing::Currency;
use crate::storage::NameResolver;
use crate::votes::RankedSymbol;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Target share count for one ranked symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPosition {
    pub symbol: String,
    pub shares: Decimal,
}

/// Targets in ranking order
pub type TargetPortfolio = Vec<TargetPosition>;

fn target_shares(targets: &[TargetPosition], symbol: &str) -> Decimal {
    targets
        .iter()
        .find(|t| t.symbol == symbol)
        .map(|t| t.shares)
        .unwrap_or(Decimal::ZERO)
}

/// Everything a rebalance needs besides the book itself
pub struct RebalanceContext<'a> {
    pub trade_date: NaiveDate,
    pub vote_date: NaiveDate,
    /// Today's closes for held and ranked symbols; missing means unpriced
    pub prices: &'a PriceMap,
    pub schedule: &'a AllocationSchedule,
    /// Bucket principal, set only on the run's first rebalance
    pub principal: Option<Decimal>,
    /// JPY per USD, recorded on USD trades
    pub exchange_rate: Decimal,
    pub names: &'a dyn NameResolver,
}

/// Result of rebalancing one bucket
#[derive(Debug, Clone, Default)]
pub struct RebalanceOutcome {
    pub trades: Vec<TradeRecord>,
    /// Costs paid, in the bucket's currency
    pub trading_cost: Decimal,
}

/// Applies the rebalancing rules with a given cost model
#[derive(Debug, Clone)]
pub struct Rebalancer {
    costs: CostModel,
    cash_safety_margin: Decimal,
    correction_passes: u32,
}

impl Default for Rebalancer {
    fn default() -> Self {
        Self::new(CostModel::default(), dec!(0.99), 1)
    }
}

impl Rebalancer {
    pub fn new(costs: CostModel, cash_safety_margin: Decimal, correction_passes: u32) -> Self {
        Self {
            costs,
            cash_safety_margin,
            correction_passes,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CostModel::from_config(&config.costs),
            config.simulation.cash_safety_margin,
            config.simulation.correction_passes,
        )
    }

    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    /// Whole-share targets: slot `i` receives `schedule[i]` of `capital`, net of
    /// trading cost. Unpriced symbols and zero targets are dropped.
    pub fn target_portfolio(
        &self,
        ranking: &[RankedSymbol],
        schedule: &AllocationSchedule,
        capital: Decimal,
        prices: &PriceMap,
    ) -> TargetPortfolio {
        ranking
            .iter()
            .enumerate()
            .filter_map(|(slot, ranked)| {
                let price = *prices.get(ranked.symbol.code())?;
                if price <= Decimal::ZERO {
                    return None;
                }
                let allocation = capital * schedule.weight(slot);
                let shares = ((allocation - self.costs.trading_cost(allocation)) / price).floor();
                (shares > Decimal::ZERO).then(|| TargetPosition {
                    symbol: ranked.symbol.code().to_string(),
                    shares,
                })
            })
            .collect()
    }

    /// Net cash raised by selling every priced holding down to `targets`
    pub fn required_sale_proceeds(
        &self,
        book: &CurrencyBook,
        targets: &[TargetPosition],
        prices: &PriceMap,
    ) -> Decimal {
        book.holdings()
            .iter()
            .filter_map(|(symbol, held)| {
                let excess = *held - target_shares(targets, symbol);
                let price = prices.get(symbol)?;
                (excess > Decimal::ZERO).then(|| {
                    let value = excess * price;
                    value - self.costs.trading_cost(value)
                })
            })
            .sum()
    }

    /// Rebalance `book` toward `ranking`
    pub fn rebalance(
        &self,
        book: &mut CurrencyBook,
        ranking: &[RankedSymbol],
        ctx: &RebalanceContext<'_>,
    ) -> RebalanceOutcome {
        let mut outcome = RebalanceOutcome::default();

        // Exit holdings that are no longer ranked
        let exits: Vec<(String, Decimal)> = book
            .holdings()
            .iter()
            .filter(|(symbol, _)| !ranking.iter().any(|r| r.symbol.code() == symbol.as_str()))
            .map(|(symbol, shares)| (symbol.clone(), *shares))
            .collect();
        for (symbol, shares) in exits {
            self.sell(book, &symbol, shares, ctx, &mut outcome);
        }

        // Investable capital and provisional targets
        let mut capital = ctx
            .principal
            .unwrap_or_else(|| book.holdings_value(ctx.prices) + book.cash());
        let mut targets = self.target_portfolio(ranking, ctx.schedule, capital, ctx.prices);

        // Reductions raise cash net of cost, which shrinks capital slightly
        if ctx.principal.is_none() {
            for _ in 0..self.correction_passes {
                let proceeds = self.required_sale_proceeds(book, &targets, ctx.prices);
                let reduced_value: Decimal = book
                    .holdings()
                    .iter()
                    .filter_map(|(symbol, held)| {
                        let excess = *held - target_shares(&targets, symbol);
                        let price = ctx.prices.get(symbol)?;
                        (excess > Decimal::ZERO).then(|| excess * price)
                    })
                    .sum();
                capital = book.holdings_value(ctx.prices) - reduced_value + book.cash() + proceeds;

                let corrected = self.target_portfolio(ranking, ctx.schedule, capital, ctx.prices);
                if corrected == targets {
                    break;
                }
                targets = corrected;
            }
        }

        tracing::debug!(
            currency = %book.currency(),
            %capital,
            targets = targets.len(),
            "Computed target portfolio"
        );

        // Reduce positions above target
        let reductions: Vec<(String, Decimal)> = book
            .holdings()
            .iter()
            .filter_map(|(symbol, held)| {
                let excess = *held - target_shares(&targets, symbol);
                (excess > Decimal::ZERO).then(|| (symbol.clone(), excess))
            })
            .collect();
        for (symbol, excess) in reductions {
            self.sell(book, &symbol, excess, ctx, &mut outcome);
        }

        // Increase positions below target, in ranking order
        for target in &targets {
            let shortfall = target.shares - book.shares(&target.symbol);
            if shortfall > Decimal::ZERO {
                self.buy(book, &target.symbol, shortfall, ctx, &mut outcome);
            }
        }

        outcome
    }

    fn sell(
        &self,
        book: &mut CurrencyBook,
        symbol: &str,
        shares: Decimal,
        ctx: &RebalanceContext<'_>,
        outcome: &mut RebalanceOutcome,
    ) {
        let Some(price) = ctx.prices.get(symbol).copied() else {
            tracing::debug!(symbol, date = %ctx.trade_date, "Unpriced holding left untouched");
            return;
        };
        let value = shares * price;
        let cost = self.costs.trading_cost(value);
        book.sell(symbol, shares, value - cost);
        outcome.trading_cost += cost;
        outcome
            .trades
            .push(self.record(book.currency(), symbol, TradeAction::Sell, shares, price, ctx));
    }

    fn buy(
        &self,
        book: &mut CurrencyBook,
        symbol: &str,
        wanted: Decimal,
        ctx: &RebalanceContext<'_>,
        outcome: &mut RebalanceOutcome,
    ) {
        let Some(price) = ctx.prices.get(symbol).copied() else {
            return;
        };

        let mut shares = wanted;
        let mut value = shares * price;
        let mut cost = self.costs.trading_cost(value);
        if value + cost > book.cash() {
            shares = (book.cash() * self.cash_safety_margin
                / (price * (Decimal::ONE + self.costs.total_rate())))
            .floor();
            if shares <= Decimal::ZERO {
                tracing::debug!(symbol, cash = %book.cash(), %price, "Insufficient cash for a single share");
                return;
            }
            value = shares * price;
            cost = self.costs.trading_cost(value);
        }

        if !book.buy(symbol, shares, value + cost) {
            return;
        }
        outcome.trading_cost += cost;
        outcome
            .trades
            .push(self.record(book.currency(), symbol, TradeAction::Buy, shares, price, ctx));
    }

    fn record(
        &self,
        currency: Currency,
        symbol: &str,
        action: TradeAction,
        shares: Decimal,
        price: Decimal,
        ctx: &RebalanceContext<'_>,
    ) -> TradeRecord {
        TradeRecord {
            id: Uuid::new_v4(),
            date: ctx.trade_date,
            vote_date: ctx.vote_date,
            symbol: symbol.to_string(),
            display_name: ctx.names.name_of(symbol),
            action,
            shares,
            price,
            value: shares * price,
            currency,
            exchange_rate: (currency == Currency::Usd).then_some(ctx.exchange_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::Symbol;
    use crate::storage::MemoryStore;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    fn ranking(codes: &[&str]) -> Vec<RankedSymbol> {
        codes
            .iter()
            .map(|c| RankedSymbol {
                symbol: Symbol::parse(c).unwrap(),
                votes: 1,
            })
            .collect()
    }

    fn prices(entries: &[(&str, Decimal)]) -> PriceMap {
        entries.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    fn schedule(slots: [u8; 10]) -> AllocationSchedule {
        AllocationSchedule::new(slots).unwrap()
    }

    fn ctx<'a>(
        prices: &'a PriceMap,
        schedule: &'a AllocationSchedule,
        principal: Option<Decimal>,
        names: &'a MemoryStore,
    ) -> RebalanceContext<'a> {
        RebalanceContext {
            trade_date: monday(),
            vote_date: monday() - chrono::Duration::days(2),
            prices,
            schedule,
            principal,
            exchange_rate: dec!(150),
            names,
        }
    }

    #[test]
    fn test_target_portfolio_floor_after_cost() {
        let rebalancer = Rebalancer::default();
        let targets = rebalancer.target_portfolio(
            &ranking(&["1234"]),
            &schedule([100, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            dec!(1000000),
            &prices(&[("1234", dec!(1000))]),
        );
        assert_eq!(
            targets,
            vec![TargetPosition {
                symbol: "1234".to_string(),
                shares: dec!(998)
            }]
        );
    }

    #[test]
    fn test_target_portfolio_drops_unpriced_and_zero() {
        let rebalancer = Rebalancer::default();
        let targets = rebalancer.target_portfolio(
            &ranking(&["AAPL", "MSFT", "NVDA"]),
            &schedule([50, 40, 10, 0, 0, 0, 0, 0, 0, 0]),
            dec!(1000),
            &prices(&[("AAPL", dec!(100)), ("NVDA", dec!(500))]),
        );
        // MSFT unpriced, NVDA's 100 buys no whole share
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].symbol, "AAPL");
        assert_eq!(targets[0].shares, dec!(4));
    }

    #[test]
    fn test_first_rebalance_uses_principal() {
        let rebalancer = Rebalancer::default();
        let names = MemoryStore::new().with_name("1234", "Test Corp");
        let p = prices(&[("1234", dec!(1000))]);
        let s = schedule([100, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut book = CurrencyBook::new(Currency::Jpy, dec!(1000000));

        let outcome = rebalancer.rebalance(
            &mut book,
            &ranking(&["1234"]),
            &ctx(&p, &s, Some(dec!(1000000)), &names),
        );

        assert_eq!(book.shares("1234"), dec!(998));
        assert_eq!(book.cash(), dec!(303.4));
        assert_eq!(outcome.trading_cost, dec!(1696.6));
        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.action, TradeAction::Buy);
        assert_eq!(trade.display_name, "Test Corp");
        assert_eq!(trade.value, dec!(998000));
        assert!(trade.exchange_rate.is_none());
    }

    #[test]
    fn test_empty_ranking_liquidates() {
        let rebalancer = Rebalancer::default();
        let names = MemoryStore::new();
        let p = prices(&[("1234", dec!(1000))]);
        let s = schedule([100, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut book = CurrencyBook::new(Currency::Jpy, dec!(303.4));
        book.buy("1234", dec!(998), dec!(0));

        let outcome = rebalancer.rebalance(&mut book, &[], &ctx(&p, &s, None, &names));

        assert!(book.holdings().is_empty());
        assert_eq!(book.cash(), dec!(996606.8));
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].action, TradeAction::Sell);
        assert_eq!(outcome.trades[0].shares, dec!(998));
    }

    #[test]
    fn test_unpriced_holding_is_not_sold() {
        let rebalancer = Rebalancer::default();
        let names = MemoryStore::new();
        let p = PriceMap::new();
        let s = schedule([100, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut book = CurrencyBook::new(Currency::Usd, dec!(0));
        book.buy("GME", dec!(10), dec!(0));

        let outcome = rebalancer.rebalance(&mut book, &[], &ctx(&p, &s, None, &names));

        assert_eq!(book.shares("GME"), dec!(10));
        assert!(outcome.trades.is_empty());
    }

    #[test]
    fn test_insufficient_cash_clamps_buy() {
        let rebalancer = Rebalancer::default();
        let names = MemoryStore::new();
        let p = prices(&[("AAPL", dec!(100))]);
        let s = schedule([100, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut book = CurrencyBook::new(Currency::Usd, dec!(1000));

        // principal claims more than the cash on hand
        let outcome = rebalancer.rebalance(
            &mut book,
            &ranking(&["AAPL"]),
            &ctx(&p, &s, Some(dec!(5000)), &names),
        );

        // floor(1000 * 0.99 / (100 * 1.0017)) = 9
        assert_eq!(book.shares("AAPL"), dec!(9));
        assert_eq!(book.cash(), dec!(98.47));
        assert_eq!(outcome.trades[0].exchange_rate, Some(dec!(150)));
        assert!(book.cash() >= Decimal::ZERO);
    }

    #[test]
    fn test_correction_pass_resizes_after_reduction() {
        let rebalancer = Rebalancer::default();
        let names = MemoryStore::new();
        let p = prices(&[("AAPL", dec!(100)), ("MSFT", dec!(100))]);
        let s = schedule([50, 50, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut book = CurrencyBook::new(Currency::Usd, dec!(0));
        book.buy("AAPL", dec!(100), dec!(0));

        let outcome = rebalancer.rebalance(
            &mut book,
            &ranking(&["AAPL", "MSFT"]),
            &ctx(&p, &s, None, &names),
        );

        assert_eq!(book.shares("AAPL"), dec!(49));
        assert_eq!(book.shares("MSFT"), dec!(49));
        assert_eq!(book.cash(), dec!(183));
        let actions: Vec<TradeAction> = outcome.trades.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![TradeAction::Sell, TradeAction::Buy]);
    }

    #[test]
    fn test_required_sale_proceeds() {
        let rebalancer = Rebalancer::default();
        let mut book = CurrencyBook::new(Currency::Jpy, dec!(0));
        book.buy("7203", dec!(10), dec!(0));
        book.buy("6758", dec!(5), dec!(0));
        let targets = vec![TargetPosition {
            symbol: "7203".to_string(),
            shares: dec!(4),
        }];
        let p = prices(&[("7203", dec!(1000)), ("6758", dec!(2000))]);

        // 6 * 1000 + 5 * 2000 = 16000 gross, less 0.17%
        assert_eq!(
            rebalancer.required_sale_proceeds(&book, &targets, &p),
            dec!(15972.8)
        );
    }

    #[test]
    fn test_cash_stays_non_negative_across_many_buys() {
        let rebalancer = Rebalancer::default();
        let names = MemoryStore::new();
        let codes = ["AAPL", "MSFT", "NVDA", "AMZN", "GOOG"];
        let p = prices(&codes.map(|c| (c, dec!(37.3))));
        let s = schedule([40, 40, 40, 40, 40, 0, 0, 0, 0, 0]);
        let mut book = CurrencyBook::new(Currency::Usd, dec!(10000));

        rebalancer.rebalance(&mut book, &ranking(&codes), &ctx(&p, &s, None, &names));
        assert!(book.cash() >= Decimal::ZERO);
    }
}
