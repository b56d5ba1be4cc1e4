//! Normalization of a raw table into the canonical schema.
//!
//! Normalization never fails. Every per-cell problem has a fallback value and
//! is only counted in the [`NormalizationReport`]. The two non-deterministic
//! inputs, the random source used to synthesize missing ages and the clock
//! used to stamp dateless tables, are injected so callers can pin them.

use chrono::{Local, NaiveDateTime};
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    canonical::{
        AgeGroup, CANONICAL_HEADERS, CanonicalRecord, CanonicalTable, NormalizationReport, UNKNOWN,
    },
    data::{parse_count, parse_number, parse_timestamp},
    detect::RoleMapping,
    raw::RawTable,
    vocabulary::SemanticRole,
};

const SYNTHETIC_AGE_RANGE: std::ops::Range<i64> = 18..65;

/// Source of "now" for tables without a date column.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub struct Normalizer<R, C> {
    rng: R,
    clock: C,
}

impl Normalizer<StdRng, SystemClock> {
    /// Unseeded generator and the system clock.
    pub fn from_entropy() -> Self {
        Normalizer::new(StdRng::from_entropy(), SystemClock)
    }
}

impl<C: Clock> Normalizer<StdRng, C> {
    pub fn seeded(seed: u64, clock: C) -> Self {
        Normalizer::new(StdRng::seed_from_u64(seed), clock)
    }
}

impl<R: Rng, C: Clock> Normalizer<R, C> {
    pub fn new(rng: R, clock: C) -> Self {
        Normalizer { rng, clock }
    }

    pub fn normalize(&mut self, raw: &RawTable, mapping: &RoleMapping) -> CanonicalTable {
        let columns = ResolvedColumns::resolve(raw, mapping);
        let stamp = self.clock.now();
        let mut report = NormalizationReport::default();
        for role in SemanticRole::ALL {
            match mapping.column(role).filter(|_| columns.get(role).is_some()) {
                Some(column) => report.mapped.push((role, column.to_string())),
                None => report.defaulted.push(role),
            }
        }

        // A canonical field replaces any unused source column of the same name.
        let passthrough_indices = (0..raw.headers().len())
            .filter(|idx| !columns.uses(*idx))
            .filter(|idx| {
                let header = &raw.headers()[*idx];
                let shadowed = CANONICAL_HEADERS.contains(&header.as_str());
                if shadowed {
                    debug!("Dropping source column '{header}' in favour of the canonical field");
                }
                !shadowed
            })
            .collect::<Vec<_>>();
        let passthrough_headers = passthrough_indices
            .iter()
            .map(|idx| raw.headers()[*idx].clone())
            .collect();

        let mut records = Vec::with_capacity(raw.row_count());
        for (row_idx, row) in raw.rows().iter().enumerate() {
            let cell = |role: SemanticRole| {
                columns
                    .get(role)
                    .and_then(|idx| row.get(idx))
                    .and_then(|v| v.as_deref())
            };

            let sales_amount = if columns.has(SemanticRole::Amount) {
                cell(SemanticRole::Amount)
                    .and_then(parse_number)
                    .unwrap_or_else(|| {
                        report.amount_fallbacks += 1;
                        0.0
                    })
            } else {
                1.0
            };

            let quantity = if columns.has(SemanticRole::Quantity) {
                cell(SemanticRole::Quantity)
                    .and_then(parse_count)
                    .unwrap_or_else(|| {
                        report.quantity_fallbacks += 1;
                        1
                    })
            } else {
                1
            };

            let transaction = match cell(SemanticRole::TransactionId) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => {
                    if columns.has(SemanticRole::TransactionId) {
                        report.transaction_fallbacks += 1;
                    }
                    row_idx.to_string()
                }
            };

            let (age, age_synthesized) = if columns.has(SemanticRole::Age) {
                let parsed = cell(SemanticRole::Age).and_then(parse_number);
                if parsed.is_none() {
                    report.unparsable_ages += 1;
                }
                (parsed, false)
            } else {
                report.synthesized_ages += 1;
                (Some(self.rng.gen_range(SYNTHETIC_AGE_RANGE) as f64), true)
            };

            let date = if columns.has(SemanticRole::Date) {
                let parsed = cell(SemanticRole::Date).and_then(parse_timestamp);
                if parsed.is_none() {
                    report.unparsable_dates += 1;
                }
                parsed
            } else {
                Some(stamp)
            };

            let promo_used = columns.has(SemanticRole::PromoCode)
                && cell(SemanticRole::PromoCode).is_some_and(is_promo_code);

            let mut record = CanonicalRecord {
                sales_amount,
                quantity,
                transaction,
                age,
                age_synthesized,
                age_group: AgeGroup::from_age(age),
                department: String::new(),
                store_format: String::new(),
                category: String::new(),
                product: String::new(),
                campaign: String::new(),
                promo_code: String::new(),
                gender: String::new(),
                nationality: String::new(),
                city: String::new(),
                date,
                promo_used,
                campaign_active: false,
                passthrough: passthrough_indices
                    .iter()
                    .map(|idx| row.get(*idx).cloned().flatten())
                    .collect(),
            };
            for role in SemanticRole::TEXT {
                let text = normalize_text(cell(role));
                if text.is_none() && columns.has(role) {
                    report.unknown_text_cells += 1;
                }
                if let Some(slot) = record.text_mut(role) {
                    *slot = text.unwrap_or(UNKNOWN).to_string();
                }
            }
            record.campaign_active =
                columns.has(SemanticRole::Campaign) && record.campaign.trim() != UNKNOWN;
            records.push(record);
        }

        log_report(&report, records.len());
        CanonicalTable {
            records,
            passthrough_headers,
            report,
        }
    }
}

/// Column index per role, resolved against the raw headers.
struct ResolvedColumns {
    indices: [Option<usize>; SemanticRole::ALL.len()],
}

impl ResolvedColumns {
    fn resolve(raw: &RawTable, mapping: &RoleMapping) -> Self {
        let mut indices = [None; SemanticRole::ALL.len()];
        for (slot, role) in indices.iter_mut().zip(SemanticRole::ALL) {
            *slot = mapping
                .column(role)
                .and_then(|column| raw.column_index(column));
            if mapping.is_mapped(role) && slot.is_none() {
                debug!("Role '{role}' maps to a column missing from the input; using defaults");
            }
        }
        ResolvedColumns { indices }
    }

    fn get(&self, role: SemanticRole) -> Option<usize> {
        self.indices[role as usize]
    }

    fn has(&self, role: SemanticRole) -> bool {
        self.get(role).is_some()
    }

    fn uses(&self, column: usize) -> bool {
        self.indices.contains(&Some(column))
    }
}

fn normalize_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Judges the source cell as read, before text fields are filled with `Unknown`.
fn is_promo_code(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != "nan" && trimmed != "None"
}

fn log_report(report: &NormalizationReport, rows: usize) {
    info!(
        "Normalized {} row(s); {} role(s) mapped, {} defaulted",
        rows,
        report.mapped.len(),
        report.defaulted.len()
    );
    if !report.defaulted.is_empty() {
        let names = report
            .defaulted
            .iter()
            .map(|role| role.canonical_field())
            .collect::<Vec<_>>()
            .join(", ");
        info!("Filled defaults for unmapped field(s): {names}");
    }
    if report.synthesized_ages > 0 {
        info!(
            "Synthesized placeholder ages for {} row(s)",
            report.synthesized_ages
        );
    }
    debug!(
        "Coercion fallbacks: amount={}, quantity={}, transaction={}, age={}, text={}, date={}",
        report.amount_fallbacks,
        report.quantity_fallbacks,
        report.transaction_fallbacks,
        report.unparsable_ages,
        report.unknown_text_cells,
        report.unparsable_dates
    );
}
