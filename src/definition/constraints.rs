// ABOUTME: Architectural constraint policy value restricting workflow contents
// ABOUTME: Absent fields mean unconstrained for that dimension

use serde::{Deserialize, Serialize};

/// Organizational policy checked against a workflow before any step runs.
///
/// Every field is optional; a `None` means "unconstrained" for that
/// dimension. The checks themselves live in
/// [`ConstraintValidator`](crate::engine::ConstraintValidator).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchitecturalConstraints {
    /// Maximum number of steps a workflow may declare.
    pub max_steps: Option<usize>,
    /// If set, every step's task type must be in this list.
    pub allowed_task_types: Option<Vec<String>>,
    /// If set, no step's task type may be in this list.
    pub prohibited_task_types: Option<Vec<String>>,
    /// If set, every step's task must carry all of these tags.
    pub required_tags: Option<Vec<String>>,
    /// If set, no step's task may carry any of these tags.
    pub prohibited_tags: Option<Vec<String>>,
}

impl ArchitecturalConstraints {
    /// True when no dimension is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.max_steps.is_none()
            && self.allowed_task_types.is_none()
            && self.prohibited_task_types.is_none()
            && self.required_tags.is_none()
            && self.prohibited_tags.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconstrained() {
        assert!(ArchitecturalConstraints::default().is_unconstrained());
    }

    #[test]
    fn test_parse_partial_policy() {
        let yaml = r#"
max_steps: 10
prohibited_tags: [network, gpu]
"#;
        let constraints: ArchitecturalConstraints = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(constraints.max_steps, Some(10));
        assert!(constraints.allowed_task_types.is_none());
        assert_eq!(
            constraints.prohibited_tags.as_deref(),
            Some(&["network".to_string(), "gpu".to_string()][..])
        );
        assert!(!constraints.is_unconstrained());
    }
}
