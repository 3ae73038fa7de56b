//! SKU generation for products created without an explicit SKU.

use chrono::NaiveDate;

/// Build a SKU as `CAT` + `NAM` + `yymmdd` + a three-digit suffix.
///
/// `CAT` is the first three characters of the upper-cased category and `NAM`
/// the first three characters of the upper-cased name with whitespace removed.
/// `suffix` is reduced into `1..=999`; callers retry with a new suffix when the
/// result collides with an existing SKU.
pub fn generate_sku(name: &str, category: &str, date: NaiveDate, suffix: u16) -> String {
    let category_part: String = category.trim().to_uppercase().chars().take(3).collect();
    let name_part: String = name
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(3)
        .collect();
    let suffix = (suffix % 999) + 1;

    format!("{category_part}{name_part}{}{suffix:03}", date.format("%y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn sku_combines_category_name_and_date() {
        let sku = generate_sku("Red Pen", "stationery", test_date(), 41);
        assert_eq!(sku, "STARED240307042");
    }

    #[test]
    fn short_inputs_use_what_is_available() {
        let sku = generate_sku("ab", "x", test_date(), 0);
        assert_eq!(sku, "XAB240307001");
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

        #[test]
        fn suffix_is_always_three_digits_in_range(suffix in any::<u16>()) {
            let sku = generate_sku("Widget", "Tools", test_date(), suffix);
            let tail: u32 = sku[sku.len() - 3..].parse().unwrap();
            prop_assert!((1..=999).contains(&tail));
            prop_assert!(sku.starts_with("TOOWID240307"));
        }
    }
}
