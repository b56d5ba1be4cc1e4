//! The canonical, analysis-ready table produced by normalization.

use std::{fmt, io::Write};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    data::{format_number, format_timestamp},
    vocabulary::SemanticRole,
};

/// Sentinel stored in text fields that have no usable value.
pub const UNKNOWN: &str = "Unknown";

/// Canonical column order used for exports and previews.
pub const CANONICAL_HEADERS: [&str; 18] = [
    "SalesAmount",
    "Quantity",
    "Transaction",
    "Age",
    "AgeWasSynthesized",
    "AgeGroup",
    "Department",
    "Store_format",
    "Category",
    "Product",
    "Campaign",
    "PromoCode",
    "Gender",
    "Nationality",
    "City",
    "Date",
    "PromoUsed",
    "CampaignActive",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeGroup {
    #[serde(rename = "13-17")]
    Teen,
    #[serde(rename = "18-24")]
    YoungAdult,
    #[serde(rename = "25-34")]
    Adult,
    #[serde(rename = "35-44")]
    MidAdult,
    #[serde(rename = "45-54")]
    Mature,
    #[serde(rename = "55-64")]
    PreSenior,
    #[serde(rename = "65+")]
    Senior,
    Unknown,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 8] = [
        AgeGroup::Teen,
        AgeGroup::YoungAdult,
        AgeGroup::Adult,
        AgeGroup::MidAdult,
        AgeGroup::Mature,
        AgeGroup::PreSenior,
        AgeGroup::Senior,
        AgeGroup::Unknown,
    ];

    /// Buckets an age using `age < upper` breakpoints. Anything under 18,
    /// including ages below 13, lands in `13-17`.
    pub fn from_age(age: Option<f64>) -> AgeGroup {
        let Some(age) = age.filter(|a| !a.is_nan()) else {
            return AgeGroup::Unknown;
        };
        if age < 18.0 {
            AgeGroup::Teen
        } else if age < 25.0 {
            AgeGroup::YoungAdult
        } else if age < 35.0 {
            AgeGroup::Adult
        } else if age < 45.0 {
            AgeGroup::MidAdult
        } else if age < 55.0 {
            AgeGroup::Mature
        } else if age < 65.0 {
            AgeGroup::PreSenior
        } else {
            AgeGroup::Senior
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Teen => "13-17",
            AgeGroup::YoungAdult => "18-24",
            AgeGroup::Adult => "25-34",
            AgeGroup::MidAdult => "35-44",
            AgeGroup::Mature => "45-54",
            AgeGroup::PreSenior => "55-64",
            AgeGroup::Senior => "65+",
            AgeGroup::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized transaction line.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub sales_amount: f64,
    pub quantity: i64,
    pub transaction: String,
    pub age: Option<f64>,
    pub age_synthesized: bool,
    pub age_group: AgeGroup,
    pub department: String,
    pub store_format: String,
    pub category: String,
    pub product: String,
    pub campaign: String,
    pub promo_code: String,
    pub gender: String,
    pub nationality: String,
    pub city: String,
    pub date: Option<NaiveDateTime>,
    pub promo_used: bool,
    pub campaign_active: bool,
    /// Values of the unmapped source columns, aligned with
    /// [`CanonicalTable::passthrough_headers`].
    pub passthrough: Vec<Option<String>>,
}

impl CanonicalRecord {
    pub fn text(&self, role: SemanticRole) -> Option<&str> {
        let value = match role {
            SemanticRole::Department => &self.department,
            SemanticRole::StoreFormat => &self.store_format,
            SemanticRole::Category => &self.category,
            SemanticRole::Product => &self.product,
            SemanticRole::Campaign => &self.campaign,
            SemanticRole::PromoCode => &self.promo_code,
            SemanticRole::Gender => &self.gender,
            SemanticRole::Nationality => &self.nationality,
            SemanticRole::City => &self.city,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub(crate) fn text_mut(&mut self, role: SemanticRole) -> Option<&mut String> {
        let value = match role {
            SemanticRole::Department => &mut self.department,
            SemanticRole::StoreFormat => &mut self.store_format,
            SemanticRole::Category => &mut self.category,
            SemanticRole::Product => &mut self.product,
            SemanticRole::Campaign => &mut self.campaign,
            SemanticRole::PromoCode => &mut self.promo_code,
            SemanticRole::Gender => &mut self.gender,
            SemanticRole::Nationality => &mut self.nationality,
            SemanticRole::City => &mut self.city,
            _ => return None,
        };
        Some(value)
    }

    /// Cells in [`CANONICAL_HEADERS`] order followed by passthrough values.
    pub fn to_cells(&self) -> Vec<String> {
        let mut cells = vec![
            format_number(self.sales_amount),
            self.quantity.to_string(),
            self.transaction.clone(),
            self.age.map(format_number).unwrap_or_default(),
            self.age_synthesized.to_string(),
            self.age_group.label().to_string(),
            self.department.clone(),
            self.store_format.clone(),
            self.category.clone(),
            self.product.clone(),
            self.campaign.clone(),
            self.promo_code.clone(),
            self.gender.clone(),
            self.nationality.clone(),
            self.city.clone(),
            self.date.as_ref().map(format_timestamp).unwrap_or_default(),
            self.promo_used.to_string(),
            self.campaign_active.to_string(),
        ];
        cells.extend(self.passthrough.iter().map(|v| v.clone().unwrap_or_default()));
        cells
    }
}

/// Where each canonical field's values came from, plus how many cells fell
/// back to a default during coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub mapped: Vec<(SemanticRole, String)>,
    pub defaulted: Vec<SemanticRole>,
    pub amount_fallbacks: usize,
    pub quantity_fallbacks: usize,
    pub transaction_fallbacks: usize,
    pub unparsable_ages: usize,
    pub synthesized_ages: usize,
    pub unknown_text_cells: usize,
    pub unparsable_dates: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    pub(crate) records: Vec<CanonicalRecord>,
    pub(crate) passthrough_headers: Vec<String>,
    pub(crate) report: NormalizationReport,
}

impl CanonicalTable {
    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn passthrough_headers(&self) -> &[String] {
        &self.passthrough_headers
    }

    pub fn report(&self) -> &NormalizationReport {
        &self.report
    }

    pub fn headers(&self) -> Vec<String> {
        CANONICAL_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(self.passthrough_headers.iter().cloned())
            .collect()
    }

    /// Writes the header row and then `records`, which are expected to come
    /// from this table (e.g. a filtered view of [`Self::records`]).
    pub fn write_csv<W: Write>(
        &self,
        records: &[&CanonicalRecord],
        writer: &mut csv::Writer<W>,
    ) -> Result<()> {
        writer
            .write_record(self.headers())
            .context("Writing canonical header row")?;
        for (idx, record) in records.iter().enumerate() {
            writer
                .write_record(record.to_cells())
                .with_context(|| format!("Writing canonical row {}", idx + 1))?;
        }
        writer.flush().context("Flushing canonical output")?;
        Ok(())
    }
}
