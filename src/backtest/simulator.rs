//! Day-by-day backtest loop
//!
//! Walks every calendar day of the run. Weekends and days without a usable
//! FX rate produce no snapshot; Mondays and Wednesdays rebalance both buckets
//! (JPY first) from the mapped vote date, and every remaining day is marked to
//! market at its closes.

use super::{
    CurrencyBook, DailySnapshot, RebalanceContext, Rebalancer, RunStats, SimulationError,
    SimulationParams, SimulationResult,
};
use crate::accounting::{daily_pnl_rate, portfolio_value, total_asset_value, PriceMap};
use crate::pricing::{Currency, PriceResolver, Symbol};
use crate::storage::NameResolver;
use crate::telemetry::{increment_counter, record_trade, CounterMetric};
use crate::votes::{is_weekend, vote_date_for, VoteAggregator, VoteRanking};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;

/// Progress of a running simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationProgress {
    pub date: NaiveDate,
    /// Calendar days processed, including the current one
    pub days_elapsed: i64,
    pub total_days: i64,
}

impl SimulationProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_days <= 0 {
            return 1.0;
        }
        (self.days_elapsed as f64 / self.total_days as f64).min(1.0)
    }
}

type ProgressObserver = Box<dyn FnMut(SimulationProgress) + Send>;

/// Runs the vote-driven backtest
pub struct Simulator {
    resolver: PriceResolver,
    aggregator: VoteAggregator,
    names: Arc<dyn NameResolver>,
    rebalancer: Rebalancer,
    prefetch: bool,
    progress: Option<ProgressObserver>,
}

/// Mutable state of one run
struct RunState {
    jpy: CurrencyBook,
    usd: CurrencyBook,
    seeded: bool,
    previous_total: Decimal,
    result: SimulationResult,
}

impl Simulator {
    pub fn new(
        resolver: PriceResolver,
        aggregator: VoteAggregator,
        names: Arc<dyn NameResolver>,
        rebalancer: Rebalancer,
    ) -> Self {
        Self {
            resolver,
            aggregator,
            names,
            rebalancer,
            prefetch: true,
            progress: None,
        }
    }

    /// Fetch each series once over the remaining range instead of per day
    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Observer called once per calendar day
    pub fn with_progress(mut self, observer: impl FnMut(SimulationProgress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    pub fn resolver(&self) -> &PriceResolver {
        &self.resolver
    }

    /// Run the simulation over `params`
    #[tracing::instrument(skip_all, fields(start = %params.start, end = %params.end))]
    pub async fn run(&mut self, params: &SimulationParams) -> Result<SimulationResult, SimulationError> {
        params.validate()?;

        if self.prefetch {
            self.resolver.prefetch_fx(params.start, params.end).await;
        }

        let initial_fx = self
            .resolver
            .resolve_fx_rate(params.start)
            .await
            .ok_or(SimulationError::InitialFxUnavailable(params.start))?;

        let initial_total_value = params.initial_jpy + params.initial_usd;
        let mut state = RunState {
            jpy: CurrencyBook::new(Currency::Jpy, params.initial_jpy),
            usd: CurrencyBook::new(Currency::Usd, params.initial_usd / initial_fx),
            seeded: false,
            previous_total: initial_total_value,
            result: SimulationResult {
                initial_total_value,
                ..SimulationResult::default()
            },
        };

        tracing::info!(
            initial_jpy = %params.initial_jpy,
            initial_usd = %params.initial_usd,
            %initial_fx,
            total_days = params.total_days(),
            "Starting simulation"
        );

        let total_days = params.total_days();
        for (offset, date) in params
            .start
            .iter_days()
            .take_while(|d| *d <= params.end)
            .enumerate()
        {
            let progress = SimulationProgress {
                date,
                days_elapsed: offset as i64 + 1,
                total_days,
            };
            if let Some(observer) = self.progress.as_mut() {
                observer(progress);
            }
            if progress.days_elapsed % 30 == 0 {
                tracing::info!(%date, done = progress.days_elapsed, total_days, "Simulation progress");
            }

            if is_weekend(date) {
                continue;
            }
            self.simulate_day(date, params, initial_fx, &mut state).await;
        }

        let resolver_stats = self.resolver.stats();
        state.result.stats.provider_fetches = resolver_stats.provider_fetches;
        state.result.stats.cache_hits = resolver_stats.cache_hits;

        tracing::info!(
            snapshots = state.result.snapshots.len(),
            trades = state.result.trades.len(),
            skipped_days = state.result.skipped_days.len(),
            price_misses = state.result.stats.price_misses,
            final_value = ?state.result.final_value(),
            "Simulation finished"
        );

        Ok(state.result)
    }

    async fn simulate_day(
        &mut self,
        date: NaiveDate,
        params: &SimulationParams,
        initial_fx: Decimal,
        state: &mut RunState,
    ) {
        let Some(fx) = self.resolver.resolve_fx_rate(date).await else {
            tracing::warn!(%date, "No exchange rate, skipping day");
            increment_counter(CounterMetric::FxSkippedDays, 1);
            state.result.stats.fx_skipped_days += 1;
            state.result.skipped_days.push(date);
            return;
        };

        let mut missed: HashSet<String> = HashSet::new();
        let vote_date = vote_date_for(date);
        let mut trading_cost = Decimal::ZERO;

        if let Some(vote_date) = vote_date {
            state.result.stats.rebalance_days += 1;
            match self.aggregator.vote_results(vote_date) {
                Ok(ranking) => {
                    trading_cost = self
                        .rebalance(date, vote_date, fx, &ranking, params, initial_fx, state, &mut missed)
                        .await;
                }
                Err(e) => {
                    tracing::warn!(%date, %vote_date, error = %e, "Vote lookup failed, holdings carried");
                    increment_counter(CounterMetric::VoteLookupFailures, 1);
                    state.result.stats.vote_lookup_failures += 1;
                }
            }
        }

        // Mark to market at the day's closes
        let held = held_symbols(&state.jpy, &state.usd);
        let marks = self.price_map(held, date, &mut missed).await;
        let jpy_value = portfolio_value(state.jpy.holdings(), &marks, None);
        let usd_value = portfolio_value(state.usd.holdings(), &marks, Some(fx));
        let total_value =
            total_asset_value(jpy_value, state.jpy.cash(), usd_value, state.usd.cash(), fx);

        state.result.stats.price_misses += missed.len() as u64;
        if !missed.is_empty() {
            increment_counter(CounterMetric::PriceMisses, missed.len() as u64);
        }

        let snapshot = DailySnapshot {
            date,
            vote_date,
            jpy_holdings: state.jpy.holdings().clone(),
            usd_holdings: state.usd.holdings().clone(),
            jpy_cash: state.jpy.cash(),
            usd_cash: state.usd.cash(),
            total_value,
            exchange_rate: fx,
            jpy_portfolio_value: jpy_value,
            usd_portfolio_value: usd_value,
            trading_cost,
            daily_pnl_rate: daily_pnl_rate(total_value, state.previous_total),
            is_rebalance_day: vote_date.is_some(),
            marks,
        };
        tracing::debug!(%date, total_value = %snapshot.total_value, rate = %snapshot.daily_pnl_rate, "Snapshot");

        state.previous_total = total_value;
        state.result.snapshots.push(snapshot);
    }

    /// Rebalance both buckets; returns the day's trading cost in JPY
    #[allow(clippy::too_many_arguments)]
    async fn rebalance(
        &mut self,
        date: NaiveDate,
        vote_date: NaiveDate,
        fx: Decimal,
        ranking: &VoteRanking,
        params: &SimulationParams,
        initial_fx: Decimal,
        state: &mut RunState,
        missed: &mut HashSet<String>,
    ) -> Decimal {
        let ranked: Vec<Symbol> = ranking
            .domestic
            .iter()
            .chain(ranking.foreign.iter())
            .map(|r| r.symbol.clone())
            .collect();

        if self.prefetch {
            for symbol in &ranked {
                self.resolver.prefetch(symbol, date, params.end).await;
            }
        }

        let mut symbols = held_symbols(&state.jpy, &state.usd);
        symbols.extend(ranked);
        let prices = self.price_map(symbols, date, missed).await;

        let (jpy_principal, usd_principal) = if state.seeded {
            (None, None)
        } else {
            (Some(params.initial_jpy), Some(params.initial_usd / initial_fx))
        };
        state.seeded = true;

        let names = self.names.as_ref();
        let jpy_outcome = self.rebalancer.rebalance(
            &mut state.jpy,
            ranking.bucket(Currency::Jpy),
            &RebalanceContext {
                trade_date: date,
                vote_date,
                prices: &prices,
                schedule: &params.jpy_allocation,
                principal: jpy_principal,
                exchange_rate: fx,
                names,
            },
        );
        let usd_outcome = self.rebalancer.rebalance(
            &mut state.usd,
            ranking.bucket(Currency::Usd),
            &RebalanceContext {
                trade_date: date,
                vote_date,
                prices: &prices,
                schedule: &params.usd_allocation,
                principal: usd_principal,
                exchange_rate: fx,
                names,
            },
        );

        let trades = jpy_outcome.trades.into_iter().chain(usd_outcome.trades);
        let before = state.result.trades.len();
        for trade in trades {
            record_trade(trade.action);
            state.result.trades.push(trade);
        }

        tracing::info!(
            %date,
            %vote_date,
            domestic = ranking.domestic.len(),
            foreign = ranking.foreign.len(),
            trades = state.result.trades.len() - before,
            "Rebalanced"
        );

        jpy_outcome.trading_cost + usd_outcome.trading_cost * fx
    }

    /// Resolve `symbols` on `date`, recording the ones without a price
    async fn price_map(
        &mut self,
        symbols: Vec<Symbol>,
        date: NaiveDate,
        missed: &mut HashSet<String>,
    ) -> PriceMap {
        let mut prices = PriceMap::new();
        for symbol in symbols {
            if prices.contains_key(symbol.code()) {
                continue;
            }
            match self.resolver.resolve_price(&symbol, date).await {
                Some(price) => {
                    prices.insert(symbol.code().to_string(), price);
                }
                None => {
                    missed.insert(symbol.code().to_string());
                }
            }
        }
        prices
    }
}

fn held_symbols(jpy: &CurrencyBook, usd: &CurrencyBook) -> Vec<Symbol> {
    [jpy, usd]
        .into_iter()
        .flat_map(|book| {
            book.holdings()
                .keys()
                .map(move |code| Symbol::with_currency(code.clone(), book.currency()))
        })
        .collect()
}
