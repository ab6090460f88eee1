//! Migration name resolution
//!
//! Derives the logical name of a migration from its file identifier. The
//! logical name is what the inclusion policy matches against and what the
//! ledger records, so it must not depend on where the file lives or on the
//! timestamp prefix used to order it.
//!
//! ```text
//! db/migrations/2020_01_01_create_widgets_table.sql  ->  create_widgets_table
//! 2014_10_12_000000_create_users_table.php           ->  create_users_table
//! V042__add_order_index.sql                          ->  add_order_index
//! ```

/// Resolve a migration file identifier into its logical name.
///
/// Strips directory components, the extension (everything from the first
/// `.` in the file name) and any leading version prefix: underscore
/// separated all-digit segments, or a Flyway style `V<digits>__`. Stripping
/// repeats until nothing changes, so resolving an already-resolved name
/// returns it unchanged.
///
/// Identifiers that leave nothing behind (`20200101.sql`, `.hidden`) are
/// returned as-is.
pub fn resolve_migration_name(identifier: &str) -> String {
    let mut current = file_stem(identifier);

    loop {
        let next = strip_version_prefix(current);
        if next.len() == current.len() {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        log::warn!(
            "Cannot derive a logical name from '{}', using it unchanged",
            identifier
        );
        return identifier.to_string();
    }

    current.to_string()
}

/// Final path component with everything from the first `.` removed.
fn file_stem(identifier: &str) -> &str {
    let file_name = identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier);

    match file_name.find('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

/// Remove one layer of version prefix, returning the input when there is none.
fn strip_version_prefix(name: &str) -> &str {
    if let Some(rest) = strip_flyway_prefix(name) {
        return rest;
    }

    let mut rest = name;
    while let Some((segment, tail)) = rest.split_once('_') {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            break;
        }
        rest = tail;
    }

    // A name made only of digits (`2020_01_01`, `20200101`) has no logical part.
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        return "";
    }

    rest
}

/// `V001__create_users` -> `create_users`
fn strip_flyway_prefix(name: &str) -> Option<&str> {
    let after_v = name.strip_prefix(['V', 'v'])?;
    let (version, rest) = after_v.split_once("__")?;
    if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit() || b == b'_') {
        return None;
    }
    Some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_date_prefix_and_extension() {
        assert_eq!(
            resolve_migration_name("2020_01_01_create_widgets_table.php"),
            "create_widgets_table"
        );
        assert_eq!(
            resolve_migration_name("2014_10_12_000000_create_users_table"),
            "create_users_table"
        );
    }

    #[test]
    fn test_strips_directories() {
        assert_eq!(
            resolve_migration_name("db/migrations/2020_01_02_create_gadgets_table.sql"),
            "create_gadgets_table"
        );
        assert_eq!(
            resolve_migration_name(r"db\migrations\2020_01_02_create_gadgets_table.sql"),
            "create_gadgets_table"
        );
    }

    #[test]
    fn test_strips_compound_extension() {
        assert_eq!(
            resolve_migration_name("000001_create_users.up.sql"),
            "create_users"
        );
    }

    #[test]
    fn test_flyway_prefix() {
        assert_eq!(resolve_migration_name("V042__add_order_index.sql"), "add_order_index");
        assert_eq!(resolve_migration_name("V1_2__add_order_index.sql"), "add_order_index");
    }

    #[test]
    fn test_name_without_prefix_is_unchanged() {
        assert_eq!(resolve_migration_name("create_widgets_table"), "create_widgets_table");
        assert_eq!(resolve_migration_name("vacuum__stats"), "vacuum__stats");
    }

    #[test]
    fn test_digits_inside_name_are_kept() {
        assert_eq!(
            resolve_migration_name("2021_05_05_add_v2_columns.sql"),
            "add_v2_columns"
        );
    }

    #[test]
    fn test_unresolvable_identifier_falls_back_to_raw() {
        assert_eq!(resolve_migration_name("20200101.sql"), "20200101.sql");
        assert_eq!(resolve_migration_name("2020_01_01"), "2020_01_01");
        assert_eq!(resolve_migration_name(".hidden"), ".hidden");
        assert_eq!(resolve_migration_name(""), "");
    }

    #[test]
    fn test_nested_prefixes_resolve_fully() {
        assert_eq!(resolve_migration_name("V1__2020_01_01_create_x.sql"), "create_x");
        assert_eq!(resolve_migration_name("2020_V1__create_x.sql"), "create_x");
    }

    proptest! {
        #[test]
        fn prop_resolution_is_idempotent(id in "[0-9A-Za-z_./]{0,40}") {
            let once = resolve_migration_name(&id);
            let twice = resolve_migration_name(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_all_digit_stem_falls_back_to_raw(stem in "[0-9]{1,14}", ext in "(sql|php)") {
            let file = format!("{stem}.{ext}");
            prop_assert_eq!(resolve_migration_name(&file), file.clone());
        }

        #[test]
        fn prop_timestamp_prefix_is_dropped(
            year in 1970u32..2100,
            seq in 0u32..999_999,
            name in "[a-z][a-z_]{0,20}[a-z]",
        ) {
            let file = format!("{year}_01_01_{seq:06}_{name}.sql");
            prop_assert_eq!(resolve_migration_name(&file), name);
        }
    }
}
