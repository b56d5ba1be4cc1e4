//! Semantic roles and the candidate-term vocabulary used to detect them.
//!
//! A [`Vocabulary`] is plain immutable configuration: the detector receives it
//! explicitly, so callers can swap in their own term lists (for example from a
//! YAML file) without touching detection code.

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Meaning assigned to a raw column. Declaration order is the detection and
/// normalization order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Amount,
    Quantity,
    Department,
    StoreFormat,
    Category,
    Product,
    Campaign,
    PromoCode,
    Gender,
    Age,
    Nationality,
    City,
    TransactionId,
    Date,
}

impl SemanticRole {
    pub const ALL: [SemanticRole; 14] = [
        SemanticRole::Amount,
        SemanticRole::Quantity,
        SemanticRole::Department,
        SemanticRole::StoreFormat,
        SemanticRole::Category,
        SemanticRole::Product,
        SemanticRole::Campaign,
        SemanticRole::PromoCode,
        SemanticRole::Gender,
        SemanticRole::Age,
        SemanticRole::Nationality,
        SemanticRole::City,
        SemanticRole::TransactionId,
        SemanticRole::Date,
    ];

    /// Roles that normalize to free text.
    pub const TEXT: [SemanticRole; 9] = [
        SemanticRole::Department,
        SemanticRole::StoreFormat,
        SemanticRole::Category,
        SemanticRole::Product,
        SemanticRole::Campaign,
        SemanticRole::PromoCode,
        SemanticRole::Gender,
        SemanticRole::Nationality,
        SemanticRole::City,
    ];

    /// Key used in vocabulary files, mapping dumps and `--map` overrides.
    pub fn key(self) -> &'static str {
        match self {
            SemanticRole::Amount => "amount",
            SemanticRole::Quantity => "quantity",
            SemanticRole::Department => "department",
            SemanticRole::StoreFormat => "store_format",
            SemanticRole::Category => "category",
            SemanticRole::Product => "product",
            SemanticRole::Campaign => "campaign",
            SemanticRole::PromoCode => "promo_code",
            SemanticRole::Gender => "gender",
            SemanticRole::Age => "age",
            SemanticRole::Nationality => "nationality",
            SemanticRole::City => "city",
            SemanticRole::TransactionId => "transaction_id",
            SemanticRole::Date => "date",
        }
    }

    /// Column name the role receives in the canonical table.
    pub fn canonical_field(self) -> &'static str {
        match self {
            SemanticRole::Amount => "SalesAmount",
            SemanticRole::Quantity => "Quantity",
            SemanticRole::Department => "Department",
            SemanticRole::StoreFormat => "Store_format",
            SemanticRole::Category => "Category",
            SemanticRole::Product => "Product",
            SemanticRole::Campaign => "Campaign",
            SemanticRole::PromoCode => "PromoCode",
            SemanticRole::Gender => "Gender",
            SemanticRole::Age => "Age",
            SemanticRole::Nationality => "Nationality",
            SemanticRole::City => "City",
            SemanticRole::TransactionId => "Transaction",
            SemanticRole::Date => "Date",
        }
    }

    fn default_terms(self) -> &'static [&'static str] {
        match self {
            SemanticRole::Amount => &["amount", "sales", "revenue", "net", "total", "paid", "value"],
            SemanticRole::Quantity => &["qty", "quantity", "units"],
            SemanticRole::Department => &["department", "dept"],
            SemanticRole::StoreFormat => &[
                "store_format",
                "store format",
                "format",
                "storetype",
                "store_type",
            ],
            SemanticRole::Category => &["category", "cat", "sub_category", "subcat"],
            SemanticRole::Product => &["product", "sku", "item", "product_name"],
            SemanticRole::Campaign => &["campaign", "ad_campaign", "campaign_name"],
            SemanticRole::PromoCode => &["promo", "voucher", "coupon", "promo_code", "discount"],
            SemanticRole::Gender => &["gender"],
            SemanticRole::Age => &["age", "customer_age", "age_group"],
            SemanticRole::Nationality => &["national", "country", "nationality"],
            SemanticRole::City => &["city", "location"],
            SemanticRole::TransactionId => &[
                "invoice",
                "transaction",
                "order",
                "receipt",
                "bill",
                "txn",
            ],
            SemanticRole::Date => &["date", "transaction_date", "purchase_date"],
        }
    }
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SemanticRole {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        SemanticRole::ALL
            .into_iter()
            .find(|role| role.key() == wanted)
            .ok_or_else(|| {
                let known = SemanticRole::ALL.map(SemanticRole::key).join(", ");
                anyhow!("Unknown role '{value}'. Expected one of: {known}")
            })
    }
}

/// Ordered candidate terms per role. Terms are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    terms: BTreeMap<SemanticRole, Vec<String>>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let terms = SemanticRole::ALL
            .into_iter()
            .map(|role| {
                let terms = role.default_terms().iter().map(|t| t.to_string()).collect();
                (role, terms)
            })
            .collect();
        Vocabulary { terms }
    }
}

impl Vocabulary {
    pub fn terms(&self, role: SemanticRole) -> &[String] {
        self.terms.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces the term list of `role`, keeping priority order.
    pub fn with_terms<I, S>(mut self, role: SemanticRole, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.terms.insert(role, clean_terms(terms));
        self
    }

    /// Parses a YAML document keyed by role. Roles the document leaves out keep
    /// their default terms.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let overrides: BTreeMap<SemanticRole, Vec<String>> =
            serde_yaml::from_str(input).context("Parsing vocabulary YAML")?;
        Ok(overrides
            .into_iter()
            .fold(Vocabulary::default(), |vocab, (role, terms)| {
                vocab.with_terms(role, terms)
            }))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening vocabulary file {path:?}"))?;
        let overrides: BTreeMap<SemanticRole, Vec<String>> =
            serde_yaml::from_reader(BufReader::new(file))
                .with_context(|| format!("Parsing vocabulary YAML {path:?}"))?;
        Ok(overrides
            .into_iter()
            .fold(Vocabulary::default(), |vocab, (role, terms)| {
                vocab.with_terms(role, terms)
            }))
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing vocabulary to YAML")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let rendered = self.to_yaml_string()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating vocabulary file {path:?}"))?;
        file.write_all(rendered.as_bytes())
            .with_context(|| format!("Writing vocabulary file {path:?}"))
    }
}

fn clean_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    terms
        .into_iter()
        .map(|term| term.as_ref().trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocabulary_covers_every_role() {
        let vocab = Vocabulary::default();
        for role in SemanticRole::ALL {
            assert!(!vocab.terms(role).is_empty(), "no terms for {role}");
        }
        assert_eq!(vocab.terms(SemanticRole::Quantity), ["qty", "quantity", "units"]);
    }

    #[test]
    fn role_keys_round_trip_through_from_str() {
        for role in SemanticRole::ALL {
            assert_eq!(role.key().parse::<SemanticRole>().unwrap(), role);
        }
        assert_eq!(
            "Store-Format".parse::<SemanticRole>().unwrap(),
            SemanticRole::StoreFormat
        );
        assert!("price".parse::<SemanticRole>().is_err());
    }

    #[test]
    fn yaml_overrides_replace_only_listed_roles() {
        let vocab = Vocabulary::from_yaml_str("amount: [' Betrag ', '', umsatz]\ncity: []\n")
            .expect("parse vocabulary");
        assert_eq!(vocab.terms(SemanticRole::Amount), ["betrag", "umsatz"]);
        assert!(vocab.terms(SemanticRole::City).is_empty());
        assert_eq!(
            vocab.terms(SemanticRole::Gender),
            Vocabulary::default().terms(SemanticRole::Gender)
        );
    }

    #[test]
    fn yaml_rejects_unknown_roles() {
        assert!(Vocabulary::from_yaml_str("price: [cost]\n").is_err());
    }

    #[test]
    fn default_vocabulary_serializes_in_role_order() {
        let yaml = Vocabulary::default().to_yaml_string().expect("yaml");
        let amount = yaml.find("amount:").expect("amount key");
        let date = yaml.find("\ndate:").expect("date key");
        assert!(amount < date);
        let reparsed = Vocabulary::from_yaml_str(&yaml).expect("reparse");
        assert_eq!(reparsed, Vocabulary::default());
    }
}
