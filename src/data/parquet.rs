//! Parquet and JSON writers for run results

use crate::backtest::{BacktestReport, BacktestSummary, DailySnapshot, SimulationResult};
use crate::execution::TradeRecord;
use arrow::array::{ArrayRef, BooleanArray, Date32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn decimal_column(values: impl Iterator<Item = Decimal>) -> ArrayRef {
    Arc::new(StringArray::from(
        values.map(|v| v.to_string()).collect::<Vec<_>>(),
    ))
}

/// Daily snapshot schema fields
pub fn snapshot_schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("vote_date", DataType::Date32, true),
        Field::new("total_value", DataType::Utf8, false), // Store as string for Decimal precision
        Field::new("jpy_cash", DataType::Utf8, false),
        Field::new("usd_cash", DataType::Utf8, false),
        Field::new("exchange_rate", DataType::Utf8, false),
        Field::new("jpy_portfolio_value", DataType::Utf8, false),
        Field::new("usd_portfolio_value", DataType::Utf8, false),
        Field::new("trading_cost", DataType::Utf8, false),
        Field::new("daily_pnl_rate", DataType::Utf8, false),
        Field::new("is_rebalance_day", DataType::Boolean, false),
        Field::new("jpy_holdings", DataType::Utf8, false), // JSON object symbol -> shares
        Field::new("usd_holdings", DataType::Utf8, false),
    ])
}

/// Trade log schema fields
pub fn trade_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("vote_date", DataType::Date32, false),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("display_name", DataType::Utf8, false),
        Field::new("action", DataType::Utf8, false),
        Field::new("shares", DataType::Utf8, false),
        Field::new("price", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("currency", DataType::Utf8, false),
        Field::new("exchange_rate", DataType::Utf8, true),
    ])
}

/// Writes run results under one output directory
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Generate file path for a run timestamp, prefix and extension
    pub fn file_path(&self, prefix: &str, timestamp: DateTime<Utc>, extension: &str) -> PathBuf {
        let filename = format!(
            "{}_{}.{}",
            prefix,
            timestamp.format("%Y%m%d_%H%M%S"),
            extension
        );
        self.output_dir.join(filename)
    }

    fn write_batch(&self, path: &Path, schema: Arc<Schema>, columns: Vec<ArrayRef>) -> anyhow::Result<()> {
        self.ensure_dir()?;

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let batch = RecordBatch::try_new(schema, columns)?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    /// Write daily snapshots to a Parquet file
    pub fn write_snapshots(&self, path: &Path, snapshots: &[DailySnapshot]) -> anyhow::Result<()> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let dates: Vec<i32> = snapshots.iter().map(|s| epoch_days(s.date)).collect();
        let vote_dates: Vec<Option<i32>> = snapshots
            .iter()
            .map(|s| s.vote_date.map(epoch_days))
            .collect();
        let rebalance: Vec<bool> = snapshots.iter().map(|s| s.is_rebalance_day).collect();
        let jpy_holdings = snapshots
            .iter()
            .map(|s| serde_json::to_string(&s.jpy_holdings))
            .collect::<Result<Vec<_>, _>>()?;
        let usd_holdings = snapshots
            .iter()
            .map(|s| serde_json::to_string(&s.usd_holdings))
            .collect::<Result<Vec<_>, _>>()?;

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Date32Array::from(dates)),
            Arc::new(Date32Array::from(vote_dates)),
            decimal_column(snapshots.iter().map(|s| s.total_value)),
            decimal_column(snapshots.iter().map(|s| s.jpy_cash)),
            decimal_column(snapshots.iter().map(|s| s.usd_cash)),
            decimal_column(snapshots.iter().map(|s| s.exchange_rate)),
            decimal_column(snapshots.iter().map(|s| s.jpy_portfolio_value)),
            decimal_column(snapshots.iter().map(|s| s.usd_portfolio_value)),
            decimal_column(snapshots.iter().map(|s| s.trading_cost)),
            decimal_column(snapshots.iter().map(|s| s.daily_pnl_rate)),
            Arc::new(BooleanArray::from(rebalance)),
            Arc::new(StringArray::from(jpy_holdings)),
            Arc::new(StringArray::from(usd_holdings)),
        ];

        self.write_batch(path, Arc::new(snapshot_schema()), columns)?;
        tracing::debug!(path = ?path, count = snapshots.len(), "Wrote snapshots to Parquet");
        Ok(())
    }

    /// Write the trade log to a Parquet file
    pub fn write_trades(&self, path: &Path, trades: &[TradeRecord]) -> anyhow::Result<()> {
        if trades.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = trades.iter().map(|t| t.id.to_string()).collect();
        let dates: Vec<i32> = trades.iter().map(|t| epoch_days(t.date)).collect();
        let vote_dates: Vec<i32> = trades.iter().map(|t| epoch_days(t.vote_date)).collect();
        let symbols: Vec<&str> = trades.iter().map(|t| t.symbol.as_str()).collect();
        let names: Vec<&str> = trades.iter().map(|t| t.display_name.as_str()).collect();
        let actions: Vec<&str> = trades.iter().map(|t| t.action.as_str()).collect();
        let currencies: Vec<&str> = trades.iter().map(|t| t.currency.code()).collect();
        let rates: Vec<Option<String>> = trades
            .iter()
            .map(|t| t.exchange_rate.map(|r| r.to_string()))
            .collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(Date32Array::from(vote_dates)),
            Arc::new(StringArray::from(symbols)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(actions)),
            decimal_column(trades.iter().map(|t| t.shares)),
            decimal_column(trades.iter().map(|t| t.price)),
            decimal_column(trades.iter().map(|t| t.value)),
            Arc::new(StringArray::from(currencies)),
            Arc::new(StringArray::from(rates)),
        ];

        self.write_batch(path, Arc::new(trade_schema()), columns)?;
        tracing::debug!(path = ?path, count = trades.len(), "Wrote trades to Parquet");
        Ok(())
    }

    /// Write any serializable value as pretty JSON
    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        self.ensure_dir()?;
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, value)?;
        tracing::debug!(path = ?path, "Wrote JSON");
        Ok(())
    }

    /// Write the summary, full result and P&L report as JSON, plus Parquet
    /// files when `parquet` is set. Returns the paths written.
    pub fn export(
        &self,
        result: &SimulationResult,
        summary: &BacktestSummary,
        report: &BacktestReport,
        timestamp: DateTime<Utc>,
        parquet: bool,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        let summary_path = self.file_path("summary", timestamp, "json");
        self.write_json(&summary_path, summary)?;
        written.push(summary_path);

        let result_path = self.file_path("result", timestamp, "json");
        self.write_json(&result_path, result)?;
        written.push(result_path);

        let breakdown_path = self.file_path("pnl_breakdown", timestamp, "json");
        self.write_json(&breakdown_path, &report.breakdown)?;
        written.push(breakdown_path);

        let performance_path = self.file_path("performance", timestamp, "json");
        self.write_json(&performance_path, &report.performance)?;
        written.push(performance_path);

        let calendar_path = self.file_path("calendar", timestamp, "json");
        self.write_json(&calendar_path, &report.calendars)?;
        written.push(calendar_path);

        if parquet {
            if !result.snapshots.is_empty() {
                let path = self.file_path("snapshots", timestamp, "parquet");
                self.write_snapshots(&path, &result.snapshots)?;
                written.push(path);
            }
            if !result.trades.is_empty() {
                let path = self.file_path("trades", timestamp, "parquet");
                self.write_trades(&path, &result.trades)?;
                written.push(path);
            }
        }

        tracing::info!(files = written.len(), dir = ?self.output_dir, "Exported results");
        Ok(written)
    }
}

/// Reader for exported Parquet files
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read `(date, total_value)` pairs from a snapshot file
    pub fn read_snapshot_values(&self) -> anyhow::Result<Vec<(NaiveDate, Decimal)>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
        use std::str::FromStr;

        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut values = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;

            let dates = batch
                .column(0)
                .as_any()
                .downcast_ref::<Date32Array>()
                .ok_or_else(|| anyhow::anyhow!("Invalid date column"))?;
            let totals = batch
                .column(2)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow::anyhow!("Invalid total_value column"))?;

            for i in 0..batch.num_rows() {
                let date = dates
                    .value_as_date(i)
                    .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;
                values.push((date, Decimal::from_str(totals.value(i))?));
            }
        }

        Ok(values)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
