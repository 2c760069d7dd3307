use shardkeeper_core::{CivilDate, Granularity};

/// Recognizes the indices owned by one policy: `{base}{separator}{suffix}`,
/// where the suffix is a valid date of exactly the granularity's width.
///
/// Names containing `:` are cross-cluster / federated views of another
/// cluster's indices and never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNameFilter {
    base_name: String,
    separator: String,
    granularity: Granularity,
}

impl IndexNameFilter {
    pub fn new(
        base_name: impl Into<String>,
        separator: impl Into<String>,
        granularity: Granularity,
    ) -> Self {
        Self {
            base_name: base_name.into(),
            separator: separator.into(),
            granularity,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Whether `name` belongs to this policy.
    pub fn matches(&self, name: &str) -> bool {
        match self.split(name) {
            Some((base, suffix)) => {
                base.eq_ignore_ascii_case(&self.base_name)
                    && CivilDate::from_suffix(suffix, self.granularity).is_some()
            }
            None => false,
        }
    }

    /// The part of `name` before the separator and date suffix, or `None`
    /// when the name does not have that shape.
    pub fn base_part<'a>(&self, name: &'a str) -> Option<&'a str> {
        self.split(name).map(|(base, _)| base)
    }

    /// Date suffix of a matching name.
    pub fn date_suffix(&self, name: &str) -> Option<u32> {
        if !self.matches(name) {
            return None;
        }
        self.split(name).map(|(_, suffix)| suffix)
    }

    /// Name of this policy's index for `date`.
    pub fn index_name(&self, date: CivilDate) -> String {
        format!(
            "{}{}{:0width$}",
            self.base_name,
            self.separator,
            date.suffix(self.granularity),
            width = self.granularity.suffix_digits()
        )
    }

    fn split<'a>(&self, name: &'a str) -> Option<(&'a str, u32)> {
        if name.contains(':') {
            return None;
        }

        let digits = self.granularity.suffix_digits();
        let split_at = name.len().checked_sub(digits)?;
        let (head, suffix) = (name.get(..split_at)?, name.get(split_at..)?);
        if !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let base = head.strip_suffix(self.separator.as_str())?;
        if base.is_empty() {
            return None;
        }
        Some((base, suffix.parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(base: &str, separator: &str) -> IndexNameFilter {
        IndexNameFilter::new(base, separator, Granularity::Daily)
    }

    #[test]
    fn daily_name_without_separator() {
        let filter = daily("logs", "");
        assert!(filter.matches("logs20240101"));
        assert_eq!(filter.base_part("logs20240101"), Some("logs"));
        assert_eq!(filter.date_suffix("logs20240101"), Some(20240101));
    }

    #[test]
    fn other_base_does_not_match() {
        let filter = daily("logs", "");
        assert!(!filter.matches("otherindex20240101"));
        assert_eq!(filter.base_part("otherindex20240101"), Some("otherindex"));
        assert_eq!(filter.date_suffix("otherindex20240101"), None);
    }

    #[test]
    fn base_comparison_ignores_case() {
        assert!(daily("logs", "-").matches("LOGS-20240101"));
    }

    #[test]
    fn missing_separator_does_not_match() {
        let filter = daily("logs", "-");
        assert!(filter.matches("logs-20240101"));
        assert!(!filter.matches("logs20240101"));
        assert!(!filter.matches("logs_20240101"));
    }

    #[test]
    fn wrong_width_or_impossible_date() {
        let filter = daily("logs", "");
        assert!(!filter.matches("logs202401"));
        assert!(!filter.matches("logs2024010"));
        assert!(!filter.matches("logs20241341"));
        assert!(!filter.matches("logs2024O101"));
        assert!(!filter.matches("20240101"));
        assert!(!filter.matches(""));
    }

    #[test]
    fn longer_base_ending_in_digits_is_not_ours() {
        let filter = daily("logs", "");
        assert!(!filter.matches("logs120240101"));
    }

    #[test]
    fn federated_names_never_match() {
        let filter = daily("logs", "");
        assert!(!filter.matches("remote:logs20240101"));
        assert_eq!(filter.base_part("remote:logs20240101"), None);
    }

    #[test]
    fn non_ascii_names_are_handled() {
        let filter = daily("jöurnal", "");
        assert!(filter.matches("jöurnal20240101"));
        assert!(!filter.matches("é"));
    }

    #[test]
    fn monthly_and_yearly_shapes() {
        let monthly = IndexNameFilter::new("audit", ".", Granularity::Monthly);
        assert!(monthly.matches("audit.202402"));
        assert!(!monthly.matches("audit.202413"));
        assert_eq!(monthly.date_suffix("audit.202402"), Some(202402));

        let yearly = IndexNameFilter::new("archive", "-", Granularity::Yearly);
        assert!(yearly.matches("archive-2023"));
        assert!(!yearly.matches("archive-23"));
    }

    #[test]
    fn index_name_renders_own_shape() {
        let date = CivilDate::from_ymd(2024, 3, 5).unwrap();
        let filter = daily("metrics", "-");
        let name = filter.index_name(date);
        assert_eq!(name, "metrics-20240305");
        assert!(filter.matches(&name));

        let monthly = IndexNameFilter::new("audit", "", Granularity::Monthly);
        assert_eq!(monthly.index_name(date), "audit202403");
    }
}
