//! Partitioning Module Tests
//!
//! ## Test Scopes
//! - **PartitionSpec**: creation-time validation of counts and column groups.
//! - **PartitionRouter**: deterministic key placement and vertical column splitting.

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::partition::router::{ColumnSlice, PartitionRouter};
    use crate::partition::types::{PartitionSpec, PartitionType};
    use crate::types::{Predicate, TableDef};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn students() -> TableDef {
        TableDef::sql("students", &["id", "name", "age"])
    }

    // ============================================================
    // LAYOUT VALIDATION TESTS
    // ============================================================

    #[test]
    fn test_partition_count_above_limit_is_rejected() {
        let result = PartitionSpec::horizontal(4).validate(&students());
        assert!(matches!(result, Err(Error::Config(_))));

        let result = PartitionSpec::horizontal(0).validate(&students());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_group_count_must_match_partition_count() {
        let mut spec = PartitionSpec::vertical(&[&["id", "name"], &["age"]]);
        spec.partition_count = 3;

        assert!(matches!(spec.validate(&students()), Err(Error::Config(_))));
    }

    #[test]
    fn test_every_column_in_exactly_one_group() {
        let missing = PartitionSpec::vertical(&[&["id"], &["name"]]);
        assert!(matches!(missing.validate(&students()), Err(Error::Config(_))));

        let duplicated = PartitionSpec::vertical(&[&["id", "name"], &["name", "age"]]);
        assert!(matches!(
            duplicated.validate(&students()),
            Err(Error::Config(_))
        ));

        let unknown = PartitionSpec::vertical(&[&["id", "name"], &["age", "grade"]]);
        assert!(matches!(unknown.validate(&students()), Err(Error::Config(_))));
    }

    #[test]
    fn test_nosql_cannot_be_vertical() {
        let spec = PartitionSpec::vertical(&[&["k"]]);
        assert!(matches!(
            spec.validate(&TableDef::nosql("users")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_valid_layouts_pass() {
        assert!(PartitionSpec::none().validate(&students()).is_ok());
        assert!(PartitionSpec::horizontal(3).validate(&students()).is_ok());
        assert!(
            PartitionSpec::horizontal(2)
                .validate(&TableDef::nosql("users"))
                .is_ok()
        );
        assert!(
            PartitionSpec::vertical(&[&["id", "name"], &["age"]])
                .validate(&students())
                .is_ok()
        );
    }

    #[test]
    fn test_spec_json_defaults_to_unpartitioned() {
        let spec: PartitionSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec, PartitionSpec::none());

        let spec: PartitionSpec =
            serde_json::from_str(r#"{"type": "horizontal", "partition_count": 2}"#).unwrap();
        assert_eq!(spec.partition_type, PartitionType::Horizontal);
        assert_eq!(spec.partition_count, 2);
    }

    // ============================================================
    // HORIZONTAL ROUTING TESTS
    // ============================================================

    #[test]
    fn test_horizontal_key_is_deterministic() {
        let router = PartitionRouter::new(PartitionSpec::horizontal(2), &students()).unwrap();

        // Same key -> same partition
        assert_eq!(
            router.partition_for_key("7").unwrap(),
            router.partition_for_key("7").unwrap()
        );
        assert_eq!(router.partition_for_key("2").unwrap(), 0);
        assert_eq!(router.partition_for_key("1").unwrap(), 1);
        assert_eq!(router.partition_for_key("3").unwrap(), 1);
        assert_eq!(router.partition_for_key("'4'").unwrap(), 0);
        assert_eq!(router.partition_for_key("-1").unwrap(), 1);
    }

    #[test]
    fn test_horizontal_key_stays_in_range() {
        let router = PartitionRouter::new(PartitionSpec::horizontal(3), &students()).unwrap();

        for key in 0..1000 {
            let partition = router.partition_for_key(&key.to_string()).unwrap();
            assert!(partition < router.partition_count());
        }
    }

    #[test]
    fn test_horizontal_non_integer_key_is_invalid() {
        let router = PartitionRouter::new(PartitionSpec::horizontal(2), &students()).unwrap();

        assert!(matches!(
            router.partition_for_key("'Alice'"),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_horizontal_insert_uses_first_value() {
        let router = PartitionRouter::new(PartitionSpec::horizontal(2), &students()).unwrap();

        let slices = router
            .route_insert(
                &strings(&["id", "name", "age"]),
                &strings(&["3", "'Carol'", "22"]),
            )
            .unwrap();

        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].partition, 1);
        assert_eq!(slices[0].values, strings(&["3", "'Carol'", "22"]));
    }

    #[test]
    fn test_horizontal_predicate_uses_value() {
        let router = PartitionRouter::new(PartitionSpec::horizontal(3), &students()).unwrap();

        assert_eq!(router.route_predicate(&Predicate::new("id", "5")).unwrap(), 2);
    }

    #[test]
    fn test_unpartitioned_always_targets_zero() {
        let router = PartitionRouter::new(PartitionSpec::none(), &students()).unwrap();

        assert_eq!(router.partitions(), 0..1);
        assert_eq!(router.route_predicate(&Predicate::new("age", "x")).unwrap(), 0);
        let slices = router
            .route_insert(&strings(&["name"]), &strings(&["'Zed'"]))
            .unwrap();
        assert_eq!(slices[0].partition, 0);
    }

    // ============================================================
    // VERTICAL ROUTING TESTS
    // ============================================================

    #[test]
    fn test_vertical_insert_splits_by_group() {
        let spec = PartitionSpec::vertical(&[&["id", "name"], &["age"]]);
        let router = PartitionRouter::new(spec, &students()).unwrap();

        let slices = router
            .route_insert(
                &strings(&["age", "id", "name"]),
                &strings(&["20", "1", "'Alice'"]),
            )
            .unwrap();

        assert_eq!(
            slices,
            vec![
                ColumnSlice {
                    partition: 0,
                    columns: strings(&["id", "name"]),
                    values: strings(&["1", "'Alice'"]),
                },
                ColumnSlice {
                    partition: 1,
                    columns: strings(&["age"]),
                    values: strings(&["20"]),
                },
            ]
        );
    }

    #[test]
    fn test_vertical_insert_keeps_empty_groups() {
        let spec = PartitionSpec::vertical(&[&["id", "name"], &["age"]]);
        let router = PartitionRouter::new(spec, &students()).unwrap();

        let slices = router
            .route_insert(&strings(&["id"]), &strings(&["9"]))
            .unwrap();

        assert_eq!(slices.len(), 2);
        assert!(slices[1].columns.is_empty());
    }

    #[test]
    fn test_vertical_predicate_targets_owning_group() {
        let spec = PartitionSpec::vertical(&[&["id", "name"], &["age"]]);
        let router = PartitionRouter::new(spec, &students()).unwrap();

        assert_eq!(router.route_predicate(&Predicate::new("age", "20")).unwrap(), 1);
        assert_eq!(router.route_predicate(&Predicate::new("id", "1")).unwrap(), 0);
        assert!(matches!(
            router.route_predicate(&Predicate::new("grade", "A")),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_vertical_assignments_skip_untouched_groups() {
        let spec = PartitionSpec::vertical(&[&["id"], &["name"], &["age"]]);
        let router = PartitionRouter::new(spec, &students()).unwrap();

        let slices = router
            .split_assignments(&strings(&["age"]), &strings(&["21"]))
            .unwrap();

        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].partition, 2);
    }
}
