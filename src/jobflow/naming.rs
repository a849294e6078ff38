/// Decides the fully-qualified names of the classes generated for a stage.
///
/// A strategy is chosen when the compiler is configured and passed in
/// explicitly; there is no process-wide naming state.
pub trait ClassNaming: Send + Sync {
    /// Package holding every class of one stage.
    fn stage_package(&self, batch_id: &str, flow_id: &str, stage: usize) -> String;

    fn class_name(&self, package: &str, simple_name: &str) -> String {
        format!("{package}.{simple_name}")
    }
}

/// Names stage classes `<base>.<batch>.<flow>.stage0001.<Class>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultClassNaming {
    base_package: String,
}

impl DefaultClassNaming {
    pub fn new(base_package: impl Into<String>) -> Self {
        Self {
            base_package: base_package.into(),
        }
    }
}

impl Default for DefaultClassNaming {
    fn default() -> Self {
        Self::new("com.example.batchapp")
    }
}

impl ClassNaming for DefaultClassNaming {
    fn stage_package(&self, batch_id: &str, flow_id: &str, stage: usize) -> String {
        format!(
            "{}.{}.{}.stage{:04}",
            self.base_package,
            package_segment(batch_id),
            package_segment(flow_id),
            stage
        )
    }
}

/// Turns an identifier into a valid lower-case package segment.
pub fn package_segment(id: &str) -> String {
    let mut segment: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if segment.is_empty() || segment.starts_with(|c: char| c.is_ascii_digit()) {
        segment.insert(0, '_');
    }
    segment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_package_segments() {
        assert_eq!(package_segment("Daily-Summary"), "daily_summary");
        assert_eq!(package_segment("2nd"), "_2nd");
        assert_eq!(package_segment(""), "_");
    }
}
