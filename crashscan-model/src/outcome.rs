use std::collections::BTreeMap;

/// Findings produced by one analyzer for one crash log.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisOutcome {
    pub analyzer_name: String,
    pub succeeded: bool,
    pub has_findings: bool,
    pub report_lines: Vec<String>,
    pub errors: Vec<String>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub data: Option<BTreeMap<String, String>>,
}

impl AnalysisOutcome {
    /// A successful outcome without findings.
    pub fn success(analyzer_name: impl Into<String>) -> Self {
        Self {
            analyzer_name: analyzer_name.into(),
            succeeded: true,
            has_findings: false,
            report_lines: Vec::new(),
            errors: Vec::new(),
            data: None,
        }
    }

    pub fn failure(
        analyzer_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            analyzer_name: analyzer_name.into(),
            succeeded: false,
            has_findings: false,
            report_lines: Vec::new(),
            errors: vec![error.into()],
            data: None,
        }
    }

    /// Appends a report line and marks the outcome as carrying findings.
    pub fn with_report_line(mut self, line: impl Into<String>) -> Self {
        self.report_lines.push(line.into());
        self.has_findings = true;
        self
    }

    pub fn with_report_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self = self.with_report_line(line);
        }
        self
    }

    pub fn with_data(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.data
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn data_value(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.get(key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lines_flag_findings() {
        let outcome = AnalysisOutcome::success("plugins");
        assert!(!outcome.has_findings);

        let outcome = outcome.with_report_line("too many plugins");
        assert!(outcome.has_findings);
        assert_eq!(outcome.report_lines, vec!["too many plugins"]);
    }

    #[test]
    fn failure_carries_error_message() {
        let outcome = AnalysisOutcome::failure("stack", "boom");
        assert!(!outcome.succeeded);
        assert_eq!(outcome.errors, vec!["boom"]);
        assert!(outcome.data.is_none());
    }

    #[test]
    fn data_values_are_addressable_by_key() {
        let outcome = AnalysisOutcome::success("plugins")
            .with_data("full", "12")
            .with_data("light", "3");
        assert_eq!(outcome.data_value("full"), Some("12"));
        assert_eq!(outcome.data_value("missing"), None);
    }
}
