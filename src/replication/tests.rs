//! Replication Module Tests
//!
//! ## Test Scopes
//! - **Fan-out**: every replica of a partition receives each write and converges.
//! - **Routing**: horizontal placement and vertical row alignment end to end.
//! - **Failure detection**: heartbeat-driven `CannotWrite` gating and recovery.
//!
//! All managers run against `InProcessDiscovery` with a short heartbeat period.

#[cfg(test)]
mod tests {
    use crate::config::ReplicationConfig;
    use crate::error::Error;
    use crate::partition::types::PartitionSpec;
    use crate::replication::manager::ReplicaSetManager;
    use crate::replication::types::ReplicaState;
    use crate::transport::discovery::InProcessDiscovery;
    use crate::transport::remote::RemoteCallError;
    use crate::types::{Operation, Predicate, TableDef};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    const HEARTBEAT: Duration = Duration::from_millis(50);

    fn students() -> TableDef {
        TableDef::sql("students", &["id", "name", "age"])
    }

    async fn manager(
        dir: &TempDir,
        table: TableDef,
        replica_count: usize,
        spec: PartitionSpec,
    ) -> (ReplicaSetManager, Arc<InProcessDiscovery>) {
        let discovery = InProcessDiscovery::new();
        let config = ReplicationConfig::new(dir.path(), HEARTBEAT);
        let manager =
            ReplicaSetManager::create(table, replica_count, spec, discovery.clone(), &config)
                .await
                .expect("Failed to create replica set");
        (manager, discovery)
    }

    async fn wait_heartbeats(cycles: u32) {
        tokio::time::sleep(HEARTBEAT * cycles).await;
    }

    async fn insert_student(manager: &ReplicaSetManager, id: &str, name: &str, age: &str) {
        manager
            .insert(&Operation::insert(
                "students",
                &["id", "name", "age"],
                &[id, name, age],
            ))
            .await
            .expect("Insert should succeed");
    }

    async fn raw(manager: &ReplicaSetManager, partition: usize, replica: usize) -> String {
        manager
            .replica(partition, replica)
            .unwrap()
            .node()
            .store()
            .read_raw()
            .await
            .unwrap()
    }

    // ============================================================
    // CREATION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_create_registers_every_replica() {
        let dir = TempDir::new().unwrap();
        let (manager, discovery) =
            manager(&dir, students(), 2, PartitionSpec::horizontal(3)).await;

        assert_eq!(discovery.registered_count(), 6);
        assert_eq!(manager.status().len(), 6);
        assert!(dir.path().join("students-SQL-2-1.csv").exists());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_configuration() {
        let dir = TempDir::new().unwrap();
        let config = ReplicationConfig::new(dir.path(), HEARTBEAT);

        let zero_replicas = ReplicaSetManager::create(
            students(),
            0,
            PartitionSpec::none(),
            InProcessDiscovery::new(),
            &config,
        )
        .await;
        assert!(matches!(zero_replicas, Err(Error::Config(_))));

        let too_many = ReplicaSetManager::create(
            students(),
            1,
            PartitionSpec::horizontal(4),
            InProcessDiscovery::new(),
            &config,
        )
        .await;
        assert!(matches!(too_many, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_drop_releases_registrations() {
        let dir = TempDir::new().unwrap();
        let (manager, discovery) = manager(&dir, students(), 3, PartitionSpec::none()).await;

        drop(manager);

        assert_eq!(discovery.registered_count(), 0);
    }

    // ============================================================
    // FAN-OUT TESTS
    // ============================================================

    #[tokio::test]
    async fn test_students_lifecycle() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 3, PartitionSpec::none()).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        assert_eq!(manager.select().await.unwrap(), "1,'Alice',20,\n");

        let summary = manager
            .update(&Operation::update(
                "students",
                &["age"],
                &["21"],
                Predicate::new("id", "1"),
            ))
            .await
            .unwrap();
        assert_eq!(summary.succeeded, 3);
        assert_eq!(manager.select().await.unwrap(), "1,'Alice',21,\n");

        manager
            .delete(&Operation::delete("students", Predicate::new("id", "1")))
            .await
            .unwrap();
        assert_eq!(manager.select().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_replicas_converge_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 3, PartitionSpec::none()).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        insert_student(&manager, "2", "'Bob'", "30").await;
        insert_student(&manager, "3", "'Carol'", "22").await;
        manager
            .update(&Operation::update(
                "students",
                &["name"],
                &["'Robert'"],
                Predicate::new("id", "2"),
            ))
            .await
            .unwrap();
        manager
            .delete(&Operation::delete("students", Predicate::new("id", "3")))
            .await
            .unwrap();

        let first = raw(&manager, 0, 0).await;
        assert_eq!(first, "id,name,age\n1,'Alice',20,\n2,'Robert',30,\n");
        assert_eq!(raw(&manager, 0, 1).await, first);
        assert_eq!(raw(&manager, 0, 2).await, first);
    }

    #[tokio::test]
    async fn test_write_without_predicate_is_invalid() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 1, PartitionSpec::none()).await;

        let mut op = Operation::delete("students", Predicate::new("id", "1"));
        op.predicate = None;

        assert!(matches!(
            manager.delete(&op).await,
            Err(Error::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_nosql_round_trip() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) =
            manager(&dir, TableDef::nosql("users"), 2, PartitionSpec::none()).await;

        manager
            .insert(&Operation::insert("users", &["name", "city"], &["ann", "oslo"]))
            .await
            .unwrap();
        manager
            .insert(&Operation::insert("users", &["name"], &["bo"]))
            .await
            .unwrap();
        manager
            .update(&Operation::update(
                "users",
                &["city"],
                &["rome"],
                Predicate::new("name", "ann"),
            ))
            .await
            .unwrap();
        assert_eq!(
            manager.select().await.unwrap(),
            "name,ann,city,rome,\nname,bo,\n"
        );

        manager
            .delete(&Operation::delete("users", Predicate::new("name", "bo")))
            .await
            .unwrap();
        assert_eq!(manager.select().await.unwrap(), "name,ann,city,rome,\n");
        assert_eq!(raw(&manager, 0, 1).await, "name,ann,city,rome,\n");
    }

    // ============================================================
    // HORIZONTAL PARTITIONING TESTS
    // ============================================================

    #[tokio::test]
    async fn test_horizontal_rows_land_by_key() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) =
            manager(&dir, students(), 2, PartitionSpec::horizontal(2)).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        insert_student(&manager, "2", "'Bob'", "30").await;
        insert_student(&manager, "3", "'Carol'", "22").await;

        assert_eq!(raw(&manager, 0, 0).await, "id,name,age\n2,'Bob',30,\n");
        assert_eq!(
            raw(&manager, 1, 1).await,
            "id,name,age\n1,'Alice',20,\n3,'Carol',22,\n"
        );

        // Partition 0 is read before partition 1
        assert_eq!(
            manager.select().await.unwrap(),
            "2,'Bob',30,\n1,'Alice',20,\n3,'Carol',22,\n"
        );
    }

    #[tokio::test]
    async fn test_horizontal_delete_targets_key_partition() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) =
            manager(&dir, students(), 1, PartitionSpec::horizontal(2)).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        insert_student(&manager, "2", "'Bob'", "30").await;

        let summary = manager
            .delete(&Operation::delete("students", Predicate::new("id", "1")))
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(manager.select().await.unwrap(), "2,'Bob',30,\n");
    }

    #[tokio::test]
    async fn test_horizontal_non_integer_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) =
            manager(&dir, students(), 1, PartitionSpec::horizontal(2)).await;

        let result = manager
            .insert(&Operation::insert(
                "students",
                &["id", "name"],
                &["'x'", "'Nobody'"],
            ))
            .await;

        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }

    // ============================================================
    // VERTICAL PARTITIONING TESTS
    // ============================================================

    fn vertical() -> PartitionSpec {
        PartitionSpec::vertical(&[&["id", "name"], &["age"]])
    }

    #[tokio::test]
    async fn test_vertical_select_zips_groups() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 2, vertical()).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        insert_student(&manager, "2", "'Bob'", "30").await;

        assert_eq!(raw(&manager, 0, 0).await, "id,name\n1,'Alice',\n2,'Bob',\n");
        assert_eq!(raw(&manager, 1, 1).await, "age\n20,\n30,\n");
        assert_eq!(
            manager.select().await.unwrap(),
            "1,'Alice',20,\n2,'Bob',30,\n"
        );
    }

    #[tokio::test]
    async fn test_vertical_delete_keeps_groups_aligned() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 2, vertical()).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        insert_student(&manager, "2", "'Bob'", "30").await;
        insert_student(&manager, "3", "'Carol'", "20").await;

        // Predicate on the second group; the first group must follow by position
        let summary = manager
            .delete(&Operation::delete("students", Predicate::new("age", "20")))
            .await
            .unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(raw(&manager, 0, 0).await, "id,name\n2,'Bob',\n");
        assert_eq!(raw(&manager, 0, 1).await, "id,name\n2,'Bob',\n");
        assert_eq!(raw(&manager, 1, 0).await, "age\n30,\n");
        assert_eq!(manager.select().await.unwrap(), "2,'Bob',30,\n");
    }

    #[tokio::test]
    async fn test_vertical_delete_without_match_skips_propagation() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 2, vertical()).await;

        insert_student(&manager, "1", "'Alice'", "20").await;

        let summary = manager
            .delete(&Operation::delete("students", Predicate::new("id", "9")))
            .await
            .unwrap();

        // Only the driver replicas were called
        assert_eq!(summary.total, 2);
        assert_eq!(manager.select().await.unwrap(), "1,'Alice',20,\n");
    }

    #[tokio::test]
    async fn test_vertical_update_reaches_other_groups() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 1, vertical()).await;

        insert_student(&manager, "1", "'Alice'", "20").await;
        insert_student(&manager, "2", "'Bob'", "30").await;

        manager
            .update(&Operation::update(
                "students",
                &["name", "age"],
                &["'Bobby'", "31"],
                Predicate::new("id", "2"),
            ))
            .await
            .unwrap();

        assert_eq!(
            manager.select().await.unwrap(),
            "1,'Alice',20,\n2,'Bobby',31,\n"
        );
    }

    #[tokio::test]
    async fn test_vertical_partial_insert_still_adds_a_row_everywhere() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 1, vertical()).await;

        manager
            .insert(&Operation::insert("students", &["id", "name"], &["7", "'Gus'"]))
            .await
            .unwrap();

        assert_eq!(raw(&manager, 1, 0).await, "age\n,\n");
        assert_eq!(manager.select().await.unwrap(), "7,'Gus',,\n");
    }

    // ============================================================
    // FAILURE DETECTION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_stopped_replica_blocks_writes_until_restarted() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 2, PartitionSpec::none()).await;
        insert_student(&manager, "1", "'Alice'", "20").await;

        manager.stop_replica(0, 0).unwrap();
        wait_heartbeats(4).await;

        assert_eq!(manager.replica(0, 0).unwrap().state(), ReplicaState::Down);
        let rejected = manager
            .insert(&Operation::insert(
                "students",
                &["id", "name", "age"],
                &["2", "'Bob'", "30"],
            ))
            .await;
        assert!(matches!(
            rejected,
            Err(Error::CannotWrite { partition: 0, .. })
        ));

        // Reads are unaffected
        assert_eq!(manager.select().await.unwrap(), "1,'Alice',20,\n");

        manager.start_replica(0, 0).unwrap();
        wait_heartbeats(4).await;

        assert_eq!(manager.replica(0, 0).unwrap().state(), ReplicaState::Alive);
        insert_student(&manager, "2", "'Bob'", "30").await;
        assert_eq!(
            manager.select().await.unwrap(),
            "1,'Alice',20,\n2,'Bob',30,\n"
        );
    }

    #[tokio::test]
    async fn test_down_replica_only_blocks_its_partition() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) =
            manager(&dir, students(), 2, PartitionSpec::horizontal(2)).await;

        manager.stop_replica(1, 1).unwrap();
        wait_heartbeats(4).await;

        // id 2 -> partition 0, still writable
        insert_student(&manager, "2", "'Bob'", "30").await;

        let rejected = manager
            .insert(&Operation::insert(
                "students",
                &["id", "name", "age"],
                &["3", "'Carol'", "22"],
            ))
            .await;
        assert!(matches!(
            rejected,
            Err(Error::CannotWrite { partition: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_vertical_insert_checks_every_group() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 1, vertical()).await;

        manager.stop_replica(1, 0).unwrap();
        wait_heartbeats(4).await;

        let rejected = manager
            .insert(&Operation::insert("students", &["id", "name"], &["1", "'Al'"]))
            .await;

        assert!(matches!(
            rejected,
            Err(Error::CannotWrite { partition: 1, .. })
        ));
        // Nothing was written to the healthy group either
        assert_eq!(raw(&manager, 0, 0).await, "id,name\n");
    }

    #[tokio::test]
    async fn test_write_racing_heartbeat_reports_partial_fan_out() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 3, PartitionSpec::none()).await;

        // Not yet observed by the heartbeat: the write goes ahead
        manager.stop_replica(0, 2).unwrap();
        let summary = manager
            .insert(&Operation::insert(
                "students",
                &["id", "name", "age"],
                &["1", "'Alice'", "20"],
            ))
            .await
            .expect("Write before detection should not be rejected");

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.total, 3);
        assert!(!summary.is_complete());
        assert_eq!(summary.failures[0].replica, "students-SQL-0-2");
        assert_eq!(
            summary.failures[0].error,
            RemoteCallError::NotRegistered("students-SQL-0-2".to_string())
        );
        assert_eq!(raw(&manager, 0, 2).await, "id,name,age\n");
    }

    #[tokio::test]
    async fn test_select_falls_back_to_next_replica() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 2, PartitionSpec::none()).await;
        insert_student(&manager, "1", "'Alice'", "20").await;

        // Still flagged alive, but unreachable
        manager.stop_replica(0, 0).unwrap();

        assert_eq!(manager.select().await.unwrap(), "1,'Alice',20,\n");
    }

    #[tokio::test]
    async fn test_select_without_live_replica_fails() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 1, PartitionSpec::none()).await;

        manager.stop_replica(0, 0).unwrap();
        wait_heartbeats(4).await;

        assert!(matches!(
            manager.select().await,
            Err(Error::NoLiveReplica(0))
        ));
    }

    #[tokio::test]
    async fn test_stop_unknown_replica_is_invalid() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 1, PartitionSpec::none()).await;

        assert!(matches!(
            manager.stop_replica(0, 5),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            manager.start_replica(2, 0),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_status_reports_down_replica() {
        let dir = TempDir::new().unwrap();
        let (manager, _discovery) = manager(&dir, students(), 2, PartitionSpec::none()).await;

        manager.stop_replica(0, 1).unwrap();
        wait_heartbeats(4).await;

        let states: Vec<ReplicaState> = manager.status().iter().map(|s| s.state).collect();
        assert_eq!(states, vec![ReplicaState::Alive, ReplicaState::Down]);
    }

    // ============================================================
    // CREATION FAILURE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_zero_heartbeat_interval_is_rejected() {
        let dir = TempDir::new().unwrap();
        let discovery = InProcessDiscovery::new();
        let config = ReplicationConfig::new(dir.path(), Duration::ZERO);

        let result = ReplicaSetManager::create(
            students(),
            2,
            PartitionSpec::none(),
            discovery.clone(),
            &config,
        )
        .await;

        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(discovery.registered_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_create_releases_registered_replicas() {
        let dir = TempDir::new().unwrap();
        let discovery = InProcessDiscovery::new();
        let config = ReplicationConfig::new(dir.path(), HEARTBEAT);

        // A directory in place of the second replica's file makes its store creation fail
        std::fs::create_dir(dir.path().join("students-SQL-0-1.csv")).unwrap();

        let result = ReplicaSetManager::create(
            students(),
            3,
            PartitionSpec::none(),
            discovery.clone(),
            &config,
        )
        .await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(discovery.registered_count(), 0);
    }

    #[tokio::test]
    async fn test_manager_rejects_path_like_table_name() {
        let dir = TempDir::new().unwrap();
        let discovery = InProcessDiscovery::new();
        let config = ReplicationConfig::new(dir.path().join("data"), HEARTBEAT);

        let result = ReplicaSetManager::create(
            TableDef::sql("../students", &["id"]),
            1,
            PartitionSpec::none(),
            discovery.clone(),
            &config,
        )
        .await;

        assert!(matches!(result, Err(Error::Config(_))));
        assert!(!dir.path().join("students-SQL-0-0.csv").exists());
        assert_eq!(discovery.registered_count(), 0);
    }
}
