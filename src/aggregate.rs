//! Session filters and categorical aggregates over canonical records.
//!
//! These are the views an exploration front end asks for: headline KPIs, sales
//! broken down by one or more categorical dimensions, and value frequencies.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use itertools::Itertools;

use crate::{canonical::CanonicalRecord, data::format_number};

/// Categorical fields a summary can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Dimension {
    City,
    StoreFormat,
    AgeGroup,
    Campaign,
    Category,
}

impl Dimension {
    pub fn field_name(self) -> &'static str {
        match self {
            Dimension::City => "City",
            Dimension::StoreFormat => "Store_format",
            Dimension::AgeGroup => "AgeGroup",
            Dimension::Campaign => "Campaign",
            Dimension::Category => "Category",
        }
    }

    pub fn value_of(self, record: &CanonicalRecord) -> &str {
        match self {
            Dimension::City => &record.city,
            Dimension::StoreFormat => &record.store_format,
            Dimension::AgeGroup => record.age_group.label(),
            Dimension::Campaign => &record.campaign,
            Dimension::Category => &record.category,
        }
    }
}

/// Row filters applied before any aggregate. Date bounds are whole days and
/// inclusive; rows without a date never pass a date bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub city: Option<String>,
    pub store_format: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.store_format.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        if let Some(city) = &self.city
            && record.city != *city
        {
            return false;
        }
        if let Some(format) = &self.store_format
            && record.store_format != *format
        {
            return false;
        }
        if self.date_from.is_none() && self.date_to.is_none() {
            return true;
        }
        let Some(date) = record.date else {
            return false;
        };
        if let Some(from) = self.date_from
            && date < from.and_time(NaiveTime::MIN)
        {
            return false;
        }
        if let Some(to) = self.date_to
            && date >= end_of_day(to)
        {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, records: &'a [CanonicalRecord]) -> Vec<&'a CanonicalRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.succ_opt()
        .map(|next| next.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub rows: usize,
    pub total_sales: f64,
    pub transactions: usize,
    pub average_basket: f64,
    pub total_quantity: i128,
    pub promo_rate: f64,
    pub synthesized_ages: usize,
}

impl Overview {
    pub fn compute(records: &[&CanonicalRecord]) -> Self {
        let mut baskets: HashMap<&str, f64> = HashMap::new();
        for record in records {
            *baskets.entry(record.transaction.as_str()).or_insert(0.0) += record.sales_amount;
        }
        let average_basket = if baskets.is_empty() {
            0.0
        } else {
            baskets.values().sum::<f64>() / baskets.len() as f64
        };
        let promo_rows = records.iter().filter(|r| r.promo_used).count();
        Overview {
            rows: records.len(),
            total_sales: records.iter().map(|r| r.sales_amount).sum(),
            transactions: baskets.len(),
            average_basket,
            total_quantity: records.iter().map(|r| i128::from(r.quantity)).sum(),
            promo_rate: ratio(promo_rows, records.len()),
            synthesized_ages: records.iter().filter(|r| r.age_synthesized).count(),
        }
    }

    pub fn render_rows(&self) -> Vec<Vec<String>> {
        vec![
            vec!["Rows".to_string(), self.rows.to_string()],
            vec!["Total sales".to_string(), format!("{:.2}", self.total_sales)],
            vec!["Transactions".to_string(), self.transactions.to_string()],
            vec!["Avg basket".to_string(), format!("{:.2}", self.average_basket)],
            vec!["Total quantity".to_string(), self.total_quantity.to_string()],
            vec!["Promo rate".to_string(), format_percent(self.promo_rate)],
            vec![
                "Synthesized ages".to_string(),
                self.synthesized_ages.to_string(),
            ],
        ]
    }
}

/// Metrics for one group of a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub keys: Vec<String>,
    pub rows: usize,
    pub total_sales: f64,
    pub transactions: usize,
    pub average_basket: f64,
    pub average_sale: f64,
    pub average_quantity: f64,
    pub promo_rate: f64,
    /// Most frequent category in the group; ties go to the smallest value.
    pub top_category: String,
}

pub const SUMMARY_METRIC_HEADERS: [&str; 8] = [
    "Rows",
    "TotalSales",
    "Transactions",
    "AvgBasket",
    "AvgSale",
    "AvgQty",
    "PromoRate",
    "TopCategory",
];

impl GroupSummary {
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = self.keys.clone();
        cells.extend([
            self.rows.to_string(),
            format!("{:.2}", self.total_sales),
            self.transactions.to_string(),
            format!("{:.2}", self.average_basket),
            format!("{:.2}", self.average_sale),
            format!("{:.2}", self.average_quantity),
            format!("{:.4}", self.promo_rate),
            self.top_category.clone(),
        ]);
        cells
    }
}

pub fn summary_headers(dimensions: &[Dimension]) -> Vec<String> {
    dimensions
        .iter()
        .map(|d| d.field_name().to_string())
        .chain(SUMMARY_METRIC_HEADERS.iter().map(|h| h.to_string()))
        .collect()
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    rows: usize,
    total_sales: f64,
    total_quantity: i128,
    promo_rows: usize,
    transactions: HashSet<&'a str>,
    categories: Vec<&'a str>,
}

impl<'a> GroupAccumulator<'a> {
    fn ingest(&mut self, record: &'a CanonicalRecord) {
        self.rows += 1;
        self.total_sales += record.sales_amount;
        self.total_quantity += i128::from(record.quantity);
        if record.promo_used {
            self.promo_rows += 1;
        }
        self.transactions.insert(record.transaction.as_str());
        self.categories.push(record.category.as_str());
    }

    fn finish(self, keys: Vec<String>) -> GroupSummary {
        let transactions = self.transactions.len();
        let top_category = self
            .categories
            .into_iter()
            .counts()
            .into_iter()
            .min_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .map(|(category, _)| category.to_string())
            .unwrap_or_default();
        GroupSummary {
            keys,
            rows: self.rows,
            total_sales: self.total_sales,
            transactions,
            average_basket: if transactions == 0 {
                0.0
            } else {
                self.total_sales / transactions as f64
            },
            average_sale: self.total_sales / self.rows as f64,
            average_quantity: self.total_quantity as f64 / self.rows as f64,
            promo_rate: ratio(self.promo_rows, self.rows),
            top_category,
        }
    }
}

/// Groups records by `dimensions` and orders groups by total sales
/// (descending), then keys. `top == 0` keeps every group.
pub fn summarize(
    records: &[&CanonicalRecord],
    dimensions: &[Dimension],
    top: usize,
) -> Vec<GroupSummary> {
    let mut groups: HashMap<Vec<&str>, GroupAccumulator<'_>> = HashMap::new();
    for record in records.iter().copied() {
        let keys = dimensions
            .iter()
            .map(|d| d.value_of(record))
            .collect::<Vec<_>>();
        groups.entry(keys).or_default().ingest(record);
    }
    let summaries = groups
        .into_iter()
        .map(|(keys, acc)| acc.finish(keys.into_iter().map(str::to_string).collect()))
        .sorted_by(|a, b| {
            b.total_sales
                .total_cmp(&a.total_sales)
                .then_with(|| a.keys.cmp(&b.keys))
        });
    if top > 0 {
        summaries.take(top).collect()
    } else {
        summaries.collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

/// Frequency of each value of `dimension`, most common first.
pub fn value_counts(records: &[&CanonicalRecord], dimension: Dimension) -> Vec<ValueCount> {
    let total = records.len();
    records
        .iter()
        .map(|r| dimension.value_of(r))
        .counts()
        .into_iter()
        .map(|(value, count)| ValueCount {
            value: value.to_string(),
            count,
            percent: ratio(count, total) * 100.0,
        })
        .sorted_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)))
        .collect()
}

impl ValueCount {
    pub fn to_cells(&self, dimension: Dimension) -> Vec<String> {
        vec![
            dimension.field_name().to_string(),
            self.value.clone(),
            self.count.to_string(),
            format!("{:.2}%", self.percent),
        ]
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn format_percent(rate: f64) -> String {
    format!("{}%", format_number((rate * 10_000.0).round() / 100.0))
}
