use std::collections::{HashMap, HashSet};

use catalogue::{Hierarchy, OptionId, OptionRecord, PersistenceGateway};
use clap::Parser;
use tracing::instrument;

use super::{Context, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Check the stored catalogue for broken category references")]
pub struct Validate {
    /// Repair fixable issues and save the catalogue
    #[arg(long)]
    fix: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Issue {
    DuplicateId { id: OptionId },
    EmptyLabel { id: OptionId },
    SelfReference { id: OptionId, label: String },
    MissingCategory { label: String, category: OptionId },
    NestedCategory { label: String, category: OptionId },
    NotCanonical,
}

impl Issue {
    /// Whether loading the catalogue repairs the issue.
    const fn is_fixable(&self) -> bool {
        !matches!(self, Self::DuplicateId { .. } | Self::EmptyLabel { .. })
    }

    fn describe(&self) -> String {
        match self {
            Self::DuplicateId { id } => format!("duplicate id {id}"),
            Self::EmptyLabel { id } => format!("option {id} has no label"),
            Self::SelfReference { id, label } => {
                format!("'{label}' ({id}) is its own category")
            }
            Self::MissingCategory { label, category } => {
                format!("'{label}' references missing category {category}")
            }
            Self::NestedCategory { label, category } => {
                format!("'{label}' references sub-option {category} as its category")
            }
            Self::NotCanonical => "options are not stored in canonical order".to_string(),
        }
    }
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub(super) fn run(self, context: &Context) -> anyhow::Result<()> {
        let config = context.config();
        let option_type = context.option_type(&config);
        let mut store = context.store(&config);
        let records = store.load(option_type)?;

        let mut issues = check(&records);
        let normalized = if issues.iter().any(|i| matches!(i, Issue::DuplicateId { .. })) {
            None
        } else {
            let hierarchy = Hierarchy::load(config.sentinel_label(), records.clone())?;
            if !same_order(&records, hierarchy.records()) {
                issues.push(Issue::NotCanonical);
            }
            Some(hierarchy)
        };

        if issues.is_empty() {
            println!(
                "{}",
                format!("✅ {} {option_type} options, no issues", records.len()).success()
            );
            if let Some(hierarchy) = &normalized {
                println!(
                    "{}",
                    format!("Fingerprint: {}", hierarchy.snapshot().fingerprint()).dim()
                );
            }
            return Ok(());
        }

        println!(
            "{}",
            format!("⚠️  {} issue(s) in {option_type}:", issues.len()).warning()
        );
        for issue in &issues {
            let marker = if issue.is_fixable() { "fixable" } else { "manual" };
            println!("  • {} {}", issue.describe(), format!("[{marker}]").dim());
        }

        let fixable = issues.iter().any(Issue::is_fixable);
        if let Some(hierarchy) = normalized.filter(|_| self.fix && fixable) {
            store.save(option_type, hierarchy.records())?;
            issues.retain(|issue| !issue.is_fixable());
            println!();
            println!(
                "{}",
                format!("✅ Saved repaired catalogue to {}", store.path(option_type).display())
                    .success()
            );
        }

        if !issues.is_empty() {
            std::process::exit(2);
        }
        Ok(())
    }
}

fn check(records: &[OptionRecord]) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(&record.id) {
            issues.push(Issue::DuplicateId {
                id: record.id.clone(),
            });
        }
    }

    let by_id: HashMap<&OptionId, &OptionRecord> = records.iter().map(|r| (&r.id, r)).collect();
    for record in records {
        if record.label.trim().is_empty() {
            issues.push(Issue::EmptyLabel {
                id: record.id.clone(),
            });
        }

        let Some(category) = &record.parent_id else {
            continue;
        };
        let issue = if category == &record.id {
            Issue::SelfReference {
                id: record.id.clone(),
                label: record.label.clone(),
            }
        } else {
            match by_id.get(category) {
                None => Issue::MissingCategory {
                    label: record.label.clone(),
                    category: category.clone(),
                },
                Some(parent) if parent.is_sub_option() => Issue::NestedCategory {
                    label: record.label.clone(),
                    category: category.clone(),
                },
                Some(_) => continue,
            }
        };
        issues.push(issue);
    }

    issues
}

fn same_order(stored: &[OptionRecord], canonical: &[OptionRecord]) -> bool {
    stored.iter().map(|r| &r.id).eq(canonical.iter().map(|r| &r.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_catalogue_has_no_issues() {
        let records = vec![
            OptionRecord::top_level("sport", "Sport"),
            OptionRecord::sub_option("football", "Football", "sport"),
        ];
        assert!(check(&records).is_empty());
    }

    #[test]
    fn broken_references_are_reported() {
        let records = vec![
            OptionRecord::top_level("sport", "Sport"),
            OptionRecord::sub_option("football", "Football", "sport"),
            OptionRecord::sub_option("derby", "Derby", "football"),
            OptionRecord::sub_option("chess", "Chess", "games"),
            OptionRecord::sub_option("loop", "Loop", "loop"),
        ];

        let issues = check(&records);

        assert_eq!(
            issues,
            vec![
                Issue::NestedCategory {
                    label: "Derby".to_string(),
                    category: OptionId::from("football"),
                },
                Issue::MissingCategory {
                    label: "Chess".to_string(),
                    category: OptionId::from("games"),
                },
                Issue::SelfReference {
                    id: OptionId::from("loop"),
                    label: "Loop".to_string(),
                },
            ]
        );
        assert!(issues.iter().all(Issue::is_fixable));
    }

    #[test]
    fn duplicates_and_empty_labels_need_manual_repair() {
        let records = vec![
            OptionRecord::top_level("sport", "Sport"),
            OptionRecord::top_level("sport", " "),
        ];

        let issues = check(&records);

        assert!(issues.contains(&Issue::DuplicateId {
            id: OptionId::from("sport")
        }));
        assert!(issues.contains(&Issue::EmptyLabel {
            id: OptionId::from("sport")
        }));
        assert!(!issues.iter().any(Issue::is_fixable));
    }

    #[test]
    fn order_is_compared_by_id() {
        let sport = OptionRecord::top_level("sport", "Sport");
        let culture = OptionRecord::top_level("culture", "Culture");

        assert!(same_order(
            &[culture.clone(), sport.clone()],
            &[culture.clone(), sport.clone()]
        ));
        assert!(!same_order(&[sport.clone(), culture.clone()], &[culture, sport]));
    }
}
