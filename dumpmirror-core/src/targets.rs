//! Selection list parsing.
//!
//! A selection list holds one `database<TAB>collection` pair per line. Pairs
//! are grouped into [`Target`]s, one per database, in first-seen order. An
//! empty collection field (`inventory<TAB>`) selects the whole database.

use std::collections::HashMap;

use tracing::warn;

use crate::error::DumpMirrorError;
use crate::models::Target;

#[derive(Debug)]
struct Selection {
    database: String,
    collections: Vec<String>,
    whole_database: bool,
}

/// Parses a selection list into targets.
///
/// Blank lines are skipped and surrounding whitespace in each field is
/// ignored. Duplicate collections collapse onto their first occurrence. If a
/// database is marked whole anywhere in the list, its named collections are
/// dropped because the whole-database dump already covers them.
///
/// # Errors
/// Returns `MalformedSelection` for a line without exactly one tab, or with an
/// empty database name.
///
/// # Example
/// ```rust
/// use dumpmirror_core::targets::resolve_targets;
///
/// let targets = resolve_targets("sales\torders\nsales\tinvoices\ninventory\t")?;
/// assert_eq!(targets.len(), 2);
/// assert_eq!(targets[0].collections, ["orders", "invoices"]);
/// assert!(targets[1].is_whole_database());
/// # Ok::<(), dumpmirror_core::DumpMirrorError>(())
/// ```
pub fn resolve_targets(text: &str) -> crate::Result<Vec<Target>> {
    let mut selections: Vec<Selection> = Vec::new();
    let mut by_database: HashMap<String, usize> = HashMap::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index.saturating_add(1);
        if line.trim().is_empty() {
            continue;
        }

        let tabs = line.matches('\t').count();
        let Some((database, collection)) = line.split_once('\t').filter(|_| tabs == 1) else {
            return Err(DumpMirrorError::malformed_selection(
                line_number,
                format!("expected exactly one tab between database and collection, found {tabs}"),
            ));
        };

        let database = database.trim();
        let collection = collection.trim();
        if database.is_empty() {
            return Err(DumpMirrorError::malformed_selection(
                line_number,
                "database name is empty",
            ));
        }

        let slot = *by_database.entry(database.to_string()).or_insert_with(|| {
            selections.push(Selection {
                database: database.to_string(),
                collections: Vec::new(),
                whole_database: false,
            });
            selections.len().saturating_sub(1)
        });
        let selection = &mut selections[slot];

        if collection.is_empty() {
            selection.whole_database = true;
        } else if !selection.collections.iter().any(|c| c == collection) {
            selection.collections.push(collection.to_string());
        }
    }

    Ok(selections
        .into_iter()
        .map(|selection| {
            if selection.whole_database {
                if !selection.collections.is_empty() {
                    warn!(
                        "Database '{}' is selected whole; ignoring {} named collection(s)",
                        selection.database,
                        selection.collections.len()
                    );
                }
                Target::new(selection.database)
            } else {
                Target::with_collections(selection.database, selection.collections)
            }
        })
        .collect())
}
