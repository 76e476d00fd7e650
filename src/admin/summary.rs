//! Cost totals shown under the project listing.

use sqlx::PgConnection;

use crate::admin::{query::FilteredQuery, schema::Column, views::Project};

const COST_COLUMN: &str = "cost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub page_total: i64,
    pub grand_total: i64,
}

/// A synthetic listing row: a label plus one cell per list column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SummaryRow {
    pub title: &'static str,
    pub cells: Vec<String>,
}

impl Summary {
    /// Lays the totals out like regular rows: the cost column is filled in,
    /// every other column is left blank.
    pub fn rows(&self, columns: &[Column]) -> Vec<SummaryRow> {
        let row = |title, total: i64| SummaryRow {
            title,
            cells: columns
                .iter()
                .map(|c| {
                    if c.name == COST_COLUMN {
                        total.to_string()
                    } else {
                        String::new()
                    }
                })
                .collect(),
        };

        vec![
            row("Page Total", self.page_total),
            row("Grand Total", self.grand_total),
        ]
    }
}

pub fn page_total(page_rows: &[Project]) -> i64 {
    page_rows.iter().map(|p| i64::from(p.cost)).sum()
}

#[tracing::instrument(name = "Compute grand total", skip(filtered, conn))]
pub async fn grand_total(
    filtered: &FilteredQuery,
    conn: &mut PgConnection,
) -> Result<i64, sqlx::Error> {
    filtered
        .sum(COST_COLUMN)
        .build_query_scalar::<i64>()
        .fetch_one(conn)
        .await
}

pub async fn summarize(
    page_rows: &[Project],
    filtered: &FilteredQuery,
    conn: &mut PgConnection,
) -> Result<Summary, sqlx::Error> {
    Ok(Summary {
        page_total: page_total(page_rows),
        grand_total: grand_total(filtered, conn).await?,
    })
}
