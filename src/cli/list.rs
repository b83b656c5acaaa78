use catalogue::{Hierarchy, OptionId, OptionRecord, OptionType};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::instrument;

use super::{Context, terminal::Colorize};

/// Command arguments for `optcat list`.
#[derive(Debug, Default, Parser)]
pub struct List {
    /// Emit JSON instead of a tree.
    #[arg(long)]
    json: bool,

    /// Show only top-level options.
    #[arg(long)]
    top_level: bool,
}

#[derive(Debug, Serialize)]
struct ListOutput<'a> {
    option_type: OptionType,
    saved: Option<DateTime<Utc>>,
    options: Vec<ListEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    value: &'a str,
    label: &'a str,
    category: Option<&'a str>,
    category_label: &'a str,
}

impl List {
    #[instrument]
    pub(super) fn run(self, context: &Context) -> anyhow::Result<()> {
        let session = context.open(false)?;
        let hierarchy = session.hierarchy();
        let records: Vec<&OptionRecord> = if self.top_level {
            hierarchy.top_options(None).collect()
        } else {
            hierarchy.iter().collect()
        };

        if self.json {
            let output = ListOutput {
                option_type: session.option_type(),
                saved: session.gateway().saved_at(session.option_type())?,
                options: records
                    .iter()
                    .map(|record| ListEntry {
                        value: record.id.as_str(),
                        label: &record.label,
                        category: record.parent_id.as_ref().map(OptionId::as_str),
                        category_label: hierarchy.category_label(&record.id).unwrap_or_default(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        if records.is_empty() {
            println!("No {} options", session.option_type());
            return Ok(());
        }

        for record in records {
            print_record(hierarchy, record);
        }

        println!();
        println!(
            "{}",
            format!(
                "{} options in {} categories",
                hierarchy.len(),
                hierarchy.top_index().len()
            )
            .dim()
        );
        Ok(())
    }
}

fn print_record(hierarchy: &Hierarchy, record: &OptionRecord) {
    let id = format!("({})", record.id).dim();
    if record.is_sub_option() {
        println!("  └ {} {id}", record.label);
    } else {
        let children = hierarchy.children(&record.id).count();
        let suffix = if children == 0 {
            String::new()
        } else {
            format!(" [{children}]").dim()
        };
        println!("{}{suffix} {id}", record.label.heading());
    }
}
