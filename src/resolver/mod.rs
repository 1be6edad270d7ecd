// src/resolver/mod.rs
//
// Bridges free-text names in the legacy row-store to stable identifiers.
// Records in the legacy store are addressed by name only; the first time
// a name is resolved, an identifier is minted, persisted in the mapping
// table, and written back into the originating row. The mapping is
// stable for the life of the system: the same name (trimmed, casefolded)
// always resolves to the same identifier, including when concurrent
// first-sight resolutions race (the mapping table's primary key decides
// the winner and every caller gets the winner's id).

use rand::Rng;

use crate::error::{FunilError, Result};
use crate::rowstore::{RangeRef, RowStore};
use crate::store::SqliteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Business,
    Creator,
}

impl IdKind {
    /// Sheet holding rows of this kind in the legacy store.
    pub fn sheet(&self) -> &'static str {
        match self {
            IdKind::Business => "Businesses",
            IdKind::Creator => "Creators",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            IdKind::Business => "biz",
            IdKind::Creator => "crt",
        }
    }
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::Business => write!(f, "business"),
            IdKind::Creator => write!(f, "creator"),
        }
    }
}

/// A resolved identifier plus the display name as stored (original
/// casing, not the normalized comparison form).
#[derive(Debug, Clone)]
pub struct Resolved {
    pub id: String,
    pub display_name: String,
}

pub struct IdResolver {
    rows: Box<dyn RowStore>,
}

impl IdResolver {
    pub fn new(rows: Box<dyn RowStore>) -> Self {
        Self { rows }
    }

    /// Resolve a name to its stable identifier. Fails `NotFound` when
    /// the legacy store has no row for the name; mints and persists an
    /// identifier when the row exists but has none yet.
    pub fn resolve(&mut self, store: &SqliteStore, kind: IdKind, name: &str) -> Result<Resolved> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(FunilError::InvalidInput(format!("empty {} name", kind)));
        }

        if let Some((id, display_name)) = store.find_mapping(kind, &normalized)? {
            return Ok(Resolved { id, display_name });
        }

        let sheet = kind.sheet();
        let rows = self.rows.get_rows(sheet)?;
        let layout = SheetLayout::detect(&rows)?;
        let (row_idx, row) = rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| {
                row.get(layout.name_col)
                    .map(|cell| normalize_name(cell) == normalized)
                    .unwrap_or(false)
            })
            .ok_or_else(|| FunilError::NotFound(format!("{} '{}'", kind, name.trim())))?;

        let display_name = row[layout.name_col].trim().to_string();

        // Legacy rows may already carry an identifier from an earlier
        // deployment; adopt it rather than minting a second one.
        let existing = row
            .get(layout.id_col)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let candidate = existing
            .clone()
            .unwrap_or_else(|| mint_id(kind, &normalized));
        let (winner_id, winner_name) =
            store.insert_mapping_or_fetch(kind, &normalized, &candidate, &display_name)?;

        // Write the id back into the originating row so the sheet and
        // the mapping table agree.
        if existing.as_deref() != Some(winner_id.as_str()) {
            self.rows.update_range(
                sheet,
                RangeRef {
                    row: row_idx,
                    col: layout.id_col,
                },
                vec![vec![winner_id.clone()]],
            )?;
        }

        Ok(Resolved {
            id: winner_id,
            display_name: winner_name,
        })
    }

    /// Ensure the legacy store has a row for this name, appending one
    /// (and the header, on a fresh sheet) when missing. Used by intake
    /// and roster registration before resolution.
    pub fn ensure_row(&mut self, kind: IdKind, name: &str) -> Result<()> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(FunilError::InvalidInput(format!("empty {} name", kind)));
        }

        let sheet = kind.sheet();
        let rows = self.rows.get_rows(sheet)?;
        if rows.is_empty() {
            self.rows
                .append_row(sheet, vec!["Id".to_string(), "Name".to_string()])?;
        } else {
            let layout = SheetLayout::detect(&rows)?;
            let present = rows.iter().skip(1).any(|row| {
                row.get(layout.name_col)
                    .map(|cell| normalize_name(cell) == normalized)
                    .unwrap_or(false)
            });
            if present {
                return Ok(());
            }
        }

        self.rows
            .append_row(sheet, vec![String::new(), name.trim().to_string()])
    }
}

/// Column positions read off the header row. The only place in the
/// crate that knows anything about sheet layout.
struct SheetLayout {
    id_col: usize,
    name_col: usize,
}

impl SheetLayout {
    fn detect(rows: &[Vec<String>]) -> Result<Self> {
        let header = rows
            .first()
            .ok_or_else(|| FunilError::Storage("legacy sheet has no header row".into()))?;
        let find = |wanted: &str| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(wanted))
        };
        match (find("id"), find("name")) {
            (Some(id_col), Some(name_col)) => Ok(Self { id_col, name_col }),
            _ => Err(FunilError::Storage(
                "legacy sheet header is missing Id/Name columns".into(),
            )),
        }
    }
}

/// Comparison form of a name: trimmed and casefolded. Display names keep
/// their original casing.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn mint_id(kind: IdKind, normalized: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: u16 = rand::thread_rng().gen();
    let slug: String = normalized
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .chars()
        .take(16)
        .collect();
    format!("{}_{:x}{:04x}_{}", kind.prefix(), millis, nonce, slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowstore::MemoryRowStore;

    fn resolver_with(names: &[&str]) -> IdResolver {
        let mut rows = vec![vec!["Id".to_string(), "Name".to_string()]];
        for name in names {
            rows.push(vec![String::new(), name.to_string()]);
        }
        IdResolver::new(Box::new(
            MemoryRowStore::new().with_sheet("Creators", rows),
        ))
    }

    #[test]
    fn test_resolve_mints_and_is_stable() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut resolver = resolver_with(&["Ana Silva"]);

        let first = resolver
            .resolve(&store, IdKind::Creator, "Ana Silva")
            .unwrap();
        assert!(first.id.starts_with("crt_"));
        assert!(first.id.ends_with("ana-silva"));
        assert_eq!(first.display_name, "Ana Silva");

        // Case and whitespace variants resolve to the same id.
        let second = resolver
            .resolve(&store, IdKind::Creator, "  ANA SILVA ")
            .unwrap();
        assert_eq!(second.id, first.id);
    }

    #[test]
    fn test_display_name_keeps_first_sight_casing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut resolver = resolver_with(&["Ana Silva"]);
        resolver
            .resolve(&store, IdKind::Creator, "Ana Silva")
            .unwrap();

        // Later callers may spell the name however they like; the stored
        // display name wins.
        let again = resolver
            .resolve(&store, IdKind::Creator, "ANA SILVA")
            .unwrap();
        assert_eq!(again.display_name, "Ana Silva");
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut resolver = resolver_with(&["Ana Silva"]);

        assert!(matches!(
            resolver.resolve(&store, IdKind::Creator, "Carlos Santos"),
            Err(FunilError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_adopts_preexisting_sheet_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let rows = vec![
            vec!["Id".to_string(), "Name".to_string()],
            vec!["crt_legacy".to_string(), "Ana Silva".to_string()],
        ];
        let mut resolver = IdResolver::new(Box::new(
            MemoryRowStore::new().with_sheet("Creators", rows),
        ));

        let resolved = resolver
            .resolve(&store, IdKind::Creator, "Ana Silva")
            .unwrap();
        assert_eq!(resolved.id, "crt_legacy");
    }

    #[test]
    fn test_resolve_race_returns_mapping_winner() {
        let store = SqliteStore::open_in_memory().unwrap();
        // Another request already claimed the name in the mapping table.
        store
            .insert_mapping_or_fetch(IdKind::Creator, "ana silva", "crt_winner", "Ana Silva")
            .unwrap();

        let mut resolver = resolver_with(&["Ana Silva"]);
        let resolved = resolver
            .resolve(&store, IdKind::Creator, "Ana Silva")
            .unwrap();
        assert_eq!(resolved.id, "crt_winner");
    }

    #[test]
    fn test_ensure_row_seeds_header_and_deduplicates() {
        let mut resolver = IdResolver::new(Box::new(MemoryRowStore::new()));
        resolver.ensure_row(IdKind::Creator, "Ana Silva").unwrap();
        resolver.ensure_row(IdKind::Creator, "ana silva").unwrap();

        let rows = resolver.rows.get_rows("Creators").unwrap();
        assert_eq!(rows.len(), 2); // header + one row
        assert_eq!(rows[1][1], "Ana Silva");
    }

    #[test]
    fn test_writeback_persists_minted_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut resolver = resolver_with(&["Ana Silva"]);

        let resolved = resolver
            .resolve(&store, IdKind::Creator, "Ana Silva")
            .unwrap();
        let rows = resolver.rows.get_rows("Creators").unwrap();
        assert_eq!(rows[1][0], resolved.id);
    }
}
