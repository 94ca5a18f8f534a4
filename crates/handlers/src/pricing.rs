use pricing_bot_core::config::{PriceLabel, PricingSettings};

pub const PRICE_PREFIX: &str = "Price: ";

/// Price of a (time, priority) pair, rounded to cents.
pub fn price(base_rate: f64, time_weight: f64, priority_weight: f64) -> f64 {
    (base_rate * time_weight * priority_weight * 100.0).round() / 100.0
}

/// Render a price label, dropping the cents when whole.
pub fn price_label(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{PRICE_PREFIX}{} USD", value as i64)
    } else {
        format!("{PRICE_PREFIX}{value} USD")
    }
}

pub fn is_price_label(name: &str) -> bool { name.starts_with(PRICE_PREFIX) }

/// Whether a label is one of the configured time or priority labels, i.e.
/// changing it can change an issue's price.
pub fn affects_pricing(settings: &PricingSettings, name: &str) -> bool {
    weight_of(&settings.labels.time, name).is_some()
        || weight_of(&settings.labels.priority, name).is_some()
}

/// Every price label the configuration implies: one per (time, priority)
/// pair, deduplicated since distinct pairs can price identically.
pub fn configured_price_labels(settings: &PricingSettings) -> Vec<String> {
    let mut out = Vec::new();
    for time in &settings.labels.time {
        for priority in &settings.labels.priority {
            out.push(price_label(price(settings.base_rate, time.weight, priority.weight)));
        }
    }
    out.sort();
    out.dedup();
    out
}

/// Price an issue from its current label set. `None` until the issue carries
/// both a time and a priority label.
pub fn price_from_labels<'a>(
    settings: &PricingSettings,
    names: impl Iterator<Item = &'a str>,
) -> Option<f64> {
    let mut time = None;
    let mut priority = None;
    for name in names {
        if let Some(weight) = weight_of(&settings.labels.time, name) {
            time.get_or_insert(weight);
        } else if let Some(weight) = weight_of(&settings.labels.priority, name) {
            priority.get_or_insert(weight);
        }
    }
    Some(price(settings.base_rate, time?, priority?))
}

fn weight_of(labels: &[PriceLabel], name: &str) -> Option<f64> {
    labels.iter().find(|l| l.name.eq_ignore_ascii_case(name)).map(|l| l.weight)
}

#[cfg(test)]
mod tests {
    use pricing_bot_core::config::{PriceLabel, PriceLabelGroups, PricingSettings};

    use super::{
        affects_pricing, configured_price_labels, is_price_label, price, price_from_labels,
        price_label,
    };

    fn settings() -> PricingSettings {
        PricingSettings {
            labels: PriceLabelGroups {
                time: vec![
                    PriceLabel { name: "Time: <1 Hour".to_string(), weight: 12.5 },
                    PriceLabel { name: "Time: <1 Day".to_string(), weight: 100.0 },
                ],
                priority: vec![
                    PriceLabel { name: "Priority: 1 (Normal)".to_string(), weight: 1.0 },
                    PriceLabel { name: "Priority: 2 (Medium)".to_string(), weight: 2.0 },
                ],
            },
            base_rate: 2.0,
            global_config_update: Default::default(),
        }
    }

    #[test]
    fn prices_round_to_cents() {
        assert_eq!(price(1.0, 12.5, 1.0), 12.5);
        assert_eq!(price(3.0, 1.0, 0.333), 1.0);
    }

    #[test]
    fn renders_whole_and_fractional_prices() {
        assert_eq!(price_label(25.0), "Price: 25 USD");
        assert_eq!(price_label(12.5), "Price: 12.5 USD");
        assert!(is_price_label("Price: 25 USD"));
        assert!(!is_price_label("Priority: 1 (Normal)"));
    }

    #[test]
    fn configured_set_is_the_pair_product() {
        let labels = configured_price_labels(&settings());
        assert_eq!(labels, vec![
            "Price: 200 USD",
            "Price: 25 USD",
            "Price: 400 USD",
            "Price: 50 USD",
        ]);
    }

    #[test]
    fn prices_from_complete_label_set() {
        let names = ["bug", "Time: <1 Hour", "Priority: 2 (Medium)"];
        assert_eq!(price_from_labels(&settings(), names.into_iter()), Some(50.0));
    }

    #[test]
    fn incomplete_label_set_has_no_price() {
        assert_eq!(price_from_labels(&settings(), ["Time: <1 Hour"].into_iter()), None);
        assert_eq!(price_from_labels(&settings(), ["Priority: 1 (Normal)"].into_iter()), None);
        assert_eq!(price_from_labels(&settings(), [].into_iter()), None);
    }

    #[test]
    fn pricing_membership_ignores_case() {
        assert!(affects_pricing(&settings(), "time: <1 hour"));
        assert!(affects_pricing(&settings(), "Priority: 1 (Normal)"));
        assert!(!affects_pricing(&settings(), "bug"));
    }
}
