use tracing::debug;

use crate::variants::VariantListing;

/// Assignment text owed for `variant_number`, if the listing has it.
pub fn bind(variants: &VariantListing, variant_number: Option<u32>) -> Option<&str> {
    let number = variant_number?;
    let text = variants.get(&number).map(String::as_str);
    if text.is_none() {
        debug!(variant = number, listed = variants.len(), "variant not in listing");
    }
    text
}

/// Variant derived from roster order: `position % variant_count + 1`.
///
/// Used only when the variants sheet has no row for the student.
pub fn variant_by_position(position: usize, variant_count: usize) -> Option<u32> {
    if variant_count == 0 {
        return None;
    }
    u32::try_from(position % variant_count + 1).ok()
}

/// Lab name and student suffix recovered from a classroom repository name
/// such as `lab-2-octocat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabIdentity {
    pub lab: String,
    /// Username suffix after `"{lab}-"`; None when no known lab matched
    pub student: Option<String>,
}

impl LabIdentity {
    /// The longest known lab name that `repo` starts with, followed by `-`
    /// or the end of the name, wins. With no match the whole repository name
    /// is the lab.
    pub fn from_repo(repo: &str, known_labs: &[String]) -> Self {
        let matched = known_labs
            .iter()
            .filter(|lab| !lab.is_empty())
            .filter_map(|lab| {
                let rest = repo.strip_prefix(lab.as_str())?;
                if rest.is_empty() {
                    Some((lab, None))
                } else {
                    rest.strip_prefix('-').map(|student| (lab, Some(student)))
                }
            })
            .max_by_key(|(lab, _)| lab.len());

        match matched {
            Some((lab, student)) => Self {
                lab: lab.clone(),
                student: student.filter(|s| !s.is_empty()).map(str::to_string),
            },
            None => Self {
                lab: repo.to_string(),
                student: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Roster, RosterEntry, VariantAssignment};
    use crate::variants::VariantParser;

    fn listing(entries: &[(u32, &str)]) -> VariantListing {
        entries.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_bind_present() {
        let variants = listing(&[(1, "X"), (2, "Y")]);
        assert_eq!(bind(&variants, Some(2)), Some("Y"));
    }

    #[test]
    fn test_bind_absent() {
        let variants = listing(&[(1, "X")]);
        assert_eq!(bind(&variants, Some(2)), None);
        assert_eq!(bind(&variants, None), None);
        assert_eq!(bind(&VariantListing::new(), Some(1)), None);
    }

    #[test]
    fn test_roster_to_assignment_text() {
        let roster = Roster::new(
            vec![RosterEntry {
                external_identity: "octocat".to_string(),
                display_name: "Jane Doe".to_string(),
            }],
            vec![VariantAssignment {
                display_name: "Jane Doe".to_string(),
                variant_number: Some(3),
            }],
        );
        let variants = VariantParser::new("Variants")
            .parse("Variants\n1. Implement a queue\n2. Implement a heap\n3. Implement a stack\n");

        let name = roster.resolve_display_name("octocat").unwrap();
        let text = bind(&variants, roster.resolve_variant(&name));
        assert_eq!(text, Some("Implement a stack"));
    }

    #[test]
    fn test_variant_by_position() {
        assert_eq!(variant_by_position(0, 3), Some(1));
        assert_eq!(variant_by_position(2, 3), Some(3));
        assert_eq!(variant_by_position(3, 3), Some(1));
        assert_eq!(variant_by_position(5, 0), None);
    }

    #[test]
    fn test_lab_identity_from_classroom_repo() {
        let labs = vec!["lab-1".to_string(), "lab-2".to_string()];
        let id = LabIdentity::from_repo("lab-2-octocat", &labs);
        assert_eq!(id.lab, "lab-2");
        assert_eq!(id.student.as_deref(), Some("octocat"));
    }

    #[test]
    fn test_lab_identity_keeps_hyphenated_username() {
        let labs = vec!["sorting".to_string()];
        let id = LabIdentity::from_repo("sorting-jane-doe-42", &labs);
        assert_eq!(id.lab, "sorting");
        assert_eq!(id.student.as_deref(), Some("jane-doe-42"));
    }

    #[test]
    fn test_lab_identity_prefers_longest_lab() {
        let labs = vec!["lab-1".to_string(), "lab-10".to_string()];
        let id = LabIdentity::from_repo("lab-10-octocat", &labs);
        assert_eq!(id.lab, "lab-10");
        assert_eq!(id.student.as_deref(), Some("octocat"));

        let id = LabIdentity::from_repo("lab-1-octocat", &labs);
        assert_eq!(id.lab, "lab-1");
        assert_eq!(id.student.as_deref(), Some("octocat"));
    }

    #[test]
    fn test_lab_identity_requires_prefix() {
        let labs = vec!["lab-1".to_string()];
        let id = LabIdentity::from_repo("old-lab-1-octocat", &labs);
        assert_eq!(id.lab, "old-lab-1-octocat");
        assert!(id.student.is_none());
    }

    #[test]
    fn test_lab_identity_unknown_lab() {
        let id = LabIdentity::from_repo("homework", &["lab-1".to_string()]);
        assert_eq!(id.lab, "homework");
        assert!(id.student.is_none());
    }

    #[test]
    fn test_lab_identity_without_suffix() {
        let id = LabIdentity::from_repo("lab-1", &["lab-1".to_string()]);
        assert_eq!(id.lab, "lab-1");
        assert!(id.student.is_none());
    }
}
