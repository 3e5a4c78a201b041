//! Fee calculator
//!
//! `fee = base price × complexity × urgency × company size`, rounded to the
//! nearest whole unit, with a ±15% band computed from the unrounded product.
//! Estimates are informational and never stored.

use crate::config::PricingConfig;
use crate::services::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};

/// Width of the displayed band around the estimate
const BAND: f64 = 0.15;

const BASE_PRICES: &[(&str, f64)] = &[
    ("consultation", 300.0),
    ("contract_review", 800.0),
    ("business_formation", 2500.0),
    ("labor", 1500.0),
    ("family", 1800.0),
    ("tax", 2000.0),
    ("litigation", 5000.0),
];

const COMPLEXITY: &[(&str, f64)] = &[("low", 1.0), ("medium", 1.5), ("high", 2.0)];

const URGENCY: &[(&str, f64)] = &[("standard", 1.0), ("priority", 1.25), ("urgent", 1.5)];

const COMPANY_SIZE: &[(&str, f64)] = &[
    ("individual", 1.0),
    ("small", 1.2),
    ("medium", 1.5),
    ("large", 2.0),
];

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateInput {
    pub service_type: String,
    pub complexity: String,
    pub urgency: String,
    pub company_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub fee: i64,
    pub low: i64,
    pub high: i64,
    pub currency: String,
    pub base_price: f64,
    pub complexity_multiplier: f64,
    pub urgency_multiplier: f64,
    pub company_size_multiplier: f64,
}

/// One selectable value of a calculator field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateOption {
    pub key: String,
    pub value: f64,
}

/// Every table, in display order, for rendering the calculator form
#[derive(Debug, Clone, Serialize)]
pub struct EstimateOptions {
    pub currency: String,
    pub service_types: Vec<EstimateOption>,
    pub complexity: Vec<EstimateOption>,
    pub urgency: Vec<EstimateOption>,
    pub company_size: Vec<EstimateOption>,
}

#[derive(Debug, Clone)]
pub struct FeeCalculator {
    base_prices: Vec<(String, f64)>,
    currency: String,
}

impl Default for FeeCalculator {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

impl FeeCalculator {
    /// Default tables with the configured base price overrides applied
    pub fn from_config(config: &PricingConfig) -> Self {
        let mut base_prices: Vec<(String, f64)> = BASE_PRICES
            .iter()
            .map(|(key, price)| (key.to_string(), *price))
            .collect();

        for (key, price) in &config.base_prices {
            if !price.is_finite() || *price < 0.0 {
                tracing::warn!("Ignoring invalid base price for {}: {}", key, price);
                continue;
            }
            match base_prices.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = *price,
                None => tracing::warn!("Ignoring base price for unknown service type {}", key),
            }
        }

        Self {
            base_prices,
            currency: config.currency.clone(),
        }
    }

    pub fn estimate(&self, input: &EstimateInput) -> ServiceResult<Estimate> {
        let base_price = lookup("service_type", &self.base_prices, &input.service_type)?;
        let complexity = lookup_static("complexity", COMPLEXITY, &input.complexity)?;
        let urgency = lookup_static("urgency", URGENCY, &input.urgency)?;
        let company_size = lookup_static("company_size", COMPANY_SIZE, &input.company_size)?;

        let raw = base_price * complexity * urgency * company_size;
        Ok(Estimate {
            fee: raw.round() as i64,
            low: (raw * (1.0 - BAND)).round() as i64,
            high: (raw * (1.0 + BAND)).round() as i64,
            currency: self.currency.clone(),
            base_price,
            complexity_multiplier: complexity,
            urgency_multiplier: urgency,
            company_size_multiplier: company_size,
        })
    }

    pub fn options(&self) -> EstimateOptions {
        EstimateOptions {
            currency: self.currency.clone(),
            service_types: self
                .base_prices
                .iter()
                .map(|(key, value)| EstimateOption {
                    key: key.clone(),
                    value: *value,
                })
                .collect(),
            complexity: static_options(COMPLEXITY),
            urgency: static_options(URGENCY),
            company_size: static_options(COMPANY_SIZE),
        }
    }
}

fn lookup(field: &str, table: &[(String, f64)], key: &str) -> ServiceResult<f64> {
    let key = key.trim().to_lowercase();
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| unknown_key(field, &key, table.iter().map(|(k, _)| k.as_str())))
}

fn lookup_static(field: &str, table: &[(&str, f64)], key: &str) -> ServiceResult<f64> {
    let key = key.trim().to_lowercase();
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| unknown_key(field, &key, table.iter().map(|(k, _)| *k)))
}

fn unknown_key<'a>(field: &str, key: &str, valid: impl Iterator<Item = &'a str>) -> ServiceError {
    ServiceError::validation(format!(
        "Invalid {} '{}'. Valid values: {}",
        field,
        key,
        valid.collect::<Vec<_>>().join(", ")
    ))
}

fn static_options(table: &[(&str, f64)]) -> Vec<EstimateOption> {
    table
        .iter()
        .map(|(key, value)| EstimateOption {
            key: key.to_string(),
            value: *value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn input(service: &str, complexity: &str, urgency: &str, size: &str) -> EstimateInput {
        EstimateInput {
            service_type: service.into(),
            complexity: complexity.into(),
            urgency: urgency.into(),
            company_size: size.into(),
        }
    }

    #[test]
    fn test_baseline_estimate() {
        let estimate = FeeCalculator::default()
            .estimate(&input("consultation", "low", "standard", "individual"))
            .unwrap();
        assert_eq!(estimate.fee, 300);
        assert_eq!(estimate.low, 255);
        assert_eq!(estimate.high, 345);
        assert_eq!(estimate.currency, "USD");
    }

    #[test]
    fn test_multipliers_compound() {
        // 1500 × 1.5 × 1.25 × 1.2 = 3375
        let estimate = FeeCalculator::default()
            .estimate(&input("labor", "medium", "priority", "small"))
            .unwrap();
        assert_eq!(estimate.fee, 3375);
        assert_eq!(estimate.low, 2869);
        assert_eq!(estimate.high, 3881);
        assert_eq!(estimate.urgency_multiplier, 1.25);
    }

    #[test]
    fn test_band_uses_unrounded_product() {
        // 300 × 1.5 × 1.25 = 562.5; a band around the rounded 563 would give 479
        let calc = FeeCalculator::default();
        let e = calc.estimate(&input("consultation", "medium", "priority", "individual")).unwrap();
        assert_eq!((e.fee, e.low, e.high), (563, 478, 647));
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let estimate = FeeCalculator::default()
            .estimate(&input(" Litigation", "HIGH", "Urgent", "large"))
            .unwrap();
        assert_eq!(estimate.fee, 30000);
    }

    #[test]
    fn test_unknown_key_lists_valid_values() {
        match FeeCalculator::default().estimate(&input("divorce", "low", "standard", "individual")) {
            Err(ServiceError::Validation(msg)) => {
                assert!(msg.contains("service_type"));
                assert!(msg.contains("consultation, contract_review"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(FeeCalculator::default()
            .estimate(&input("tax", "extreme", "standard", "individual"))
            .is_err());
    }

    #[test]
    fn test_config_overrides() {
        let mut base_prices = HashMap::new();
        base_prices.insert("tax".to_string(), 2500.0);
        base_prices.insert("maritime".to_string(), 9000.0);
        base_prices.insert("labor".to_string(), -1.0);
        let calc = FeeCalculator::from_config(&PricingConfig {
            currency: "EUR".into(),
            base_prices,
        });

        let e = calc.estimate(&input("tax", "low", "standard", "individual")).unwrap();
        assert_eq!((e.fee, e.currency.as_str()), (2500, "EUR"));
        let e = calc.estimate(&input("labor", "low", "standard", "individual")).unwrap();
        assert_eq!(e.fee, 1500);
        assert!(calc.estimate(&input("maritime", "low", "standard", "individual")).is_err());
    }

    #[test]
    fn test_options_list_every_table() {
        let options = FeeCalculator::default().options();
        assert_eq!(options.service_types.len(), 7);
        assert_eq!(options.service_types[0].key, "consultation");
        assert_eq!(options.complexity.len(), 3);
        assert_eq!(options.urgency[2], EstimateOption { key: "urgent".into(), value: 1.5 });
        assert_eq!(options.company_size.len(), 4);
    }

    fn keys(table: &'static [(&'static str, f64)]) -> impl Strategy<Value = &'static str> {
        prop::sample::select(table.iter().map(|(k, _)| *k).collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn band_brackets_fee(
            service in keys(BASE_PRICES),
            complexity in keys(COMPLEXITY),
            urgency in keys(URGENCY),
            size in keys(COMPANY_SIZE),
        ) {
            let e = FeeCalculator::default()
                .estimate(&input(service, complexity, urgency, size))
                .unwrap();
            prop_assert!(e.low <= e.fee && e.fee <= e.high);
            prop_assert!(e.fee >= 300);
            let raw = e.base_price * e.complexity_multiplier * e.urgency_multiplier * e.company_size_multiplier;
            prop_assert!((e.fee as f64 - raw).abs() <= 0.5);
        }
    }
}
