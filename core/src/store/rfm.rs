use rusqlite::{params, params_from_iter, types::Value, OptionalExtension};

use super::{tables, AnalyticsStore};
use crate::{
    error::AnalyticsResult,
    outcome::{DataOutcome, LiveRows},
    rfm_engine::{RfmOverview, RfmRecord, SegmentSummary},
};

const RFM_COLUMNS: &str = "customer_id, recency_days, frequency, monetary,
    r_score, f_score, m_score, rfm_score, segment";

impl AnalyticsStore {
    // ── RFM writes ─────────────────────────────────────────────

    /// Replace rfm_segments and segment_summary in one transaction.
    pub fn replace_rfm(
        &self,
        run_id: &str,
        records: &[RfmRecord],
        summaries: &[SegmentSummary],
    ) -> AnalyticsResult<()> {
        let targets = [
            (tables::RFM_SEGMENTS, records.len()),
            (tables::SEGMENT_SUMMARY, summaries.len()),
        ];
        self.replace_tables(run_id, &targets, |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO rfm_segments (
                    customer_id, recency_days, frequency, monetary,
                    r_score, f_score, m_score, rfm_score, segment
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.customer_id,
                    r.recency_days,
                    r.frequency,
                    r.monetary,
                    r.r_score,
                    r.f_score,
                    r.m_score,
                    r.rfm_score,
                    r.segment,
                ])?;
            }

            let mut stmt = conn.prepare(
                "INSERT INTO segment_summary (
                    segment, customer_count, total_revenue, avg_monetary,
                    customer_percentage, revenue_percentage
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for s in summaries {
                stmt.execute(params![
                    s.segment,
                    s.customer_count,
                    s.total_revenue,
                    s.avg_monetary,
                    s.customer_percentage,
                    s.revenue_percentage,
                ])?;
            }
            Ok(())
        })
    }

    // ── RFM reads ──────────────────────────────────────────────

    /// Highest composite score first, then highest spend.
    pub fn top_customers(&self, limit: usize) -> DataOutcome<LiveRows<Vec<RfmRecord>>> {
        self.read_list(tables::RFM_SEGMENTS, |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RFM_COLUMNS} FROM rfm_segments
                 ORDER BY rfm_score DESC, monetary DESC, customer_id ASC
                 LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], rfm_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Customers whose segment label contains any of `needles`
    /// (case-sensitive), highest spend first.
    pub fn customers_matching(
        &self,
        needles: &[&str],
        limit: usize,
    ) -> DataOutcome<LiveRows<Vec<RfmRecord>>> {
        self.read_list(tables::RFM_SEGMENTS, |conn| {
            let filter = (1..=needles.len())
                .map(|i| format!("instr(segment, ?{i}) > 0"))
                .collect::<Vec<_>>()
                .join(" OR ");
            let filter = if filter.is_empty() { "0".to_string() } else { filter };
            let mut stmt = conn.prepare(&format!(
                "SELECT {RFM_COLUMNS} FROM rfm_segments
                 WHERE {filter}
                 ORDER BY monetary DESC, customer_id ASC
                 LIMIT ?{}",
                needles.len() + 1
            ))?;

            let mut values: Vec<Value> = needles
                .iter()
                .map(|n| Value::Text(n.to_string()))
                .collect();
            values.push(Value::Integer(limit as i64));

            let rows = stmt
                .query_map(params_from_iter(values), rfm_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn customer(&self, customer_id: &str) -> DataOutcome<LiveRows<RfmRecord>> {
        self.read_table(tables::RFM_SEGMENTS, |conn| {
            let record = conn
                .query_row(
                    &format!("SELECT {RFM_COLUMNS} FROM rfm_segments WHERE customer_id = ?1"),
                    params![customer_id],
                    rfm_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn segment_summaries(&self) -> DataOutcome<LiveRows<Vec<SegmentSummary>>> {
        self.read_list(tables::SEGMENT_SUMMARY, |conn| {
            let mut stmt = conn.prepare(
                "SELECT segment, customer_count, total_revenue, avg_monetary,
                        customer_percentage, revenue_percentage
                 FROM segment_summary
                 ORDER BY total_revenue DESC, segment ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(SegmentSummary {
                        segment:             row.get(0)?,
                        customer_count:      row.get(1)?,
                        total_revenue:       row.get(2)?,
                        avg_monetary:        row.get(3)?,
                        customer_percentage: row.get(4)?,
                        revenue_percentage:  row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn rfm_overview(&self) -> DataOutcome<LiveRows<RfmOverview>> {
        self.read_table(tables::RFM_SEGMENTS, |conn| {
            let overview = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(AVG(recency_days), 0.0),
                        COALESCE(AVG(frequency), 0.0),
                        COALESCE(AVG(monetary), 0.0),
                        COALESCE(SUM(monetary), 0.0),
                        COALESCE(MIN(recency_days), 0),
                        COALESCE(MAX(recency_days), 0),
                        COALESCE(MAX(frequency), 0),
                        COALESCE(MAX(monetary), 0.0)
                 FROM rfm_segments",
                [],
                |row| {
                    Ok(RfmOverview {
                        total_customers:        row.get(0)?,
                        average_recency_days:   row.get(1)?,
                        average_frequency:      row.get(2)?,
                        average_customer_value: row.get(3)?,
                        total_customer_value:   row.get(4)?,
                        best_recency_days:      row.get(5)?,
                        worst_recency_days:     row.get(6)?,
                        max_frequency:          row.get(7)?,
                        max_customer_value:     row.get(8)?,
                    })
                },
            )?;
            Ok((overview.total_customers > 0).then_some(overview))
        })
    }
}

fn rfm_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RfmRecord> {
    Ok(RfmRecord {
        customer_id:  row.get(0)?,
        recency_days: row.get(1)?,
        frequency:    row.get(2)?,
        monetary:     row.get(3)?,
        r_score:      row.get(4)?,
        f_score:      row.get(5)?,
        m_score:      row.get(6)?,
        rfm_score:    row.get(7)?,
        segment:      row.get(8)?,
    })
}
