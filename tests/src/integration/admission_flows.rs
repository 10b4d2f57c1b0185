//! # Admission Flows
//!
//! Several coordinator replicas admitting transactions against one shared
//! graph store and one shared temporal-order service.
//!
//! ## Flows Tested:
//!
//! 1. **Cross-replica writes**: a write from a replica that never saw the
//!    previous write is ordered through the service
//! 2. **Retry loop**: a conflicting timestamp is retried with a later one
//! 3. **Shard failure**: the abort report names the shards to compensate,
//!    and the aborted writes disappear
//! 4. **Deletes**: a committed delete is seen by every replica
//! 5. **Coordinator failover**: a backup resumes acknowledgement tracking
//! 6. **Parallel load**: many transactions in flight at once, including
//!    writers racing on one node

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cg_01_causal_order::{CausalOrderApi, InMemoryTemporalOrderService, Oracle, OracleConfig};
    use cg_02_tx_admission::{
        AbortReason, AckProgress, AdmissionConfig, AdmissionStatus, AdmissionTracker, GraphStore,
        GraphUpdate, InMemoryGraphStore, NodeRef, PendingTransaction, SubmitOutcome, Timestamper,
        TransactionAdmissionApi,
    };
    use shared_types::{ClusterLayout, NodeHandle, ReplicaId, ShardId, Timestamp, TxId};

    type Tracker = AdmissionTracker<Oracle<InMemoryTemporalOrderService>, InMemoryGraphStore>;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// One coordinator replica: its own clock and tracker, shared backends.
    struct Coordinator {
        stamper: Timestamper,
        tracker: Tracker,
    }

    struct Cluster {
        service: Arc<InMemoryTemporalOrderService>,
        oracle: Arc<Oracle<InMemoryTemporalOrderService>>,
        store: Arc<InMemoryGraphStore>,
        coordinators: Vec<Coordinator>,
    }

    impl Cluster {
        fn new() -> Self {
            cg_telemetry::init_for_tests();
            let layout = ClusterLayout::for_testing();
            let service = Arc::new(InMemoryTemporalOrderService::new());
            let oracle = Arc::new(
                Oracle::with_config(service.clone(), OracleConfig::for_testing()).unwrap(),
            );
            let store = Arc::new(InMemoryGraphStore::new());
            let coordinators = (0..layout.num_replicas as u64)
                .map(|r| Coordinator {
                    stamper: Timestamper::new(ReplicaId(r), &layout, 0).unwrap(),
                    tracker: Self::tracker(&oracle, &store),
                })
                .collect();
            Self {
                service,
                oracle,
                store,
                coordinators,
            }
        }

        fn tracker(
            oracle: &Arc<Oracle<InMemoryTemporalOrderService>>,
            store: &Arc<InMemoryGraphStore>,
        ) -> Tracker {
            AdmissionTracker::with_config(
                AdmissionConfig::for_testing(),
                oracle.clone(),
                store.clone(),
            )
            .unwrap()
        }

        fn coordinator(&self, replica: usize) -> &Coordinator {
            &self.coordinators[replica]
        }
    }

    impl Coordinator {
        fn stamp(&self, id: u64, updates: Vec<GraphUpdate>) -> PendingTransaction {
            let ts = self.stamper.next_timestamp().unwrap();
            PendingTransaction::new(TxId(id), ts, updates, &ClusterLayout::for_testing()).unwrap()
        }

        /// Submit, acknowledge every shard, and return the commit timestamp.
        async fn commit(&self, id: u64, updates: Vec<GraphUpdate>) -> Timestamp {
            let tx = self.stamp(id, updates);
            let ts = tx.timestamp.clone();
            let awaiting = match self.tracker.submit(tx).await.unwrap() {
                SubmitOutcome::Admitted { awaiting } => awaiting,
                other => panic!("expected admission, got {:?}", other),
            };
            ack_all(&self.tracker, TxId(id), &awaiting).await;
            ts
        }
    }

    async fn ack_all(tracker: &Tracker, id: TxId, shards: &[ShardId]) {
        for (i, shard) in shards.iter().enumerate() {
            let progress = tracker.on_shard_ack(id, *shard).await.unwrap();
            if i + 1 == shards.len() {
                assert_eq!(progress, AckProgress::Committed);
            }
        }
    }

    fn create(handle: &str, shard: ShardId) -> GraphUpdate {
        GraphUpdate::CreateNode {
            handle: NodeHandle::new(handle),
            shard,
        }
    }

    fn set(handle: &str, shard: ShardId, value: &str) -> GraphUpdate {
        GraphUpdate::SetNodeProperty {
            node: NodeRef::new(handle, shard),
            key: "name".into(),
            value: value.into(),
        }
    }

    // =============================================================================
    // CROSS-REPLICA WRITES
    // =============================================================================

    #[tokio::test]
    async fn test_unseen_write_is_ordered_through_service() {
        let cluster = Cluster::new();
        let created = cluster
            .coordinator(0)
            .commit(1, vec![create("alice", 0)])
            .await;
        assert_eq!(cluster.service.calls(), 0);

        // Replica 1 never observed replica 0's clock.
        let updated = cluster
            .coordinator(1)
            .commit(2, vec![set("alice", 0, "Alice")])
            .await;
        assert_eq!(cluster.service.calls(), 1);

        let last = cluster.store.last_update(&NodeHandle::new("alice")).unwrap();
        assert_eq!(last, updated);
        assert_eq!(
            cluster.oracle.compare_vts(&[updated, created]).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_observed_write_needs_no_service() {
        let cluster = Cluster::new();
        let created = cluster
            .coordinator(0)
            .commit(1, vec![create("bob", 1)])
            .await;

        cluster
            .coordinator(2)
            .stamper
            .observe(&created.clock)
            .unwrap();
        cluster
            .coordinator(2)
            .commit(2, vec![set("bob", 1, "Bob")])
            .await;

        assert_eq!(cluster.service.calls(), 0);
        assert_eq!(cluster.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_edge_reads_remote_target() {
        let cluster = Cluster::new();
        let c0 = cluster.coordinator(0);
        c0.commit(1, vec![create("a", 0), create("b", 3)]).await;

        let edge = GraphUpdate::CreateEdge {
            handle: shared_types::EdgeHandle::new("a->b"),
            from: NodeRef::new("a", 0),
            to: NodeRef::new("b", 3),
        };
        let tx = c0.stamp(2, vec![edge]);
        let ts = tx.timestamp.clone();

        // The edge lives on the source shard only.
        assert_eq!(
            c0.tracker.submit(tx).await.unwrap(),
            SubmitOutcome::Admitted { awaiting: vec![0] }
        );
        assert_eq!(cluster.store.last_update(&NodeHandle::new("a")), Some(ts));
        assert_ne!(
            cluster.store.last_update(&NodeHandle::new("b")),
            cluster.store.last_update(&NodeHandle::new("a"))
        );
    }

    // =============================================================================
    // RETRY LOOP
    // =============================================================================

    #[tokio::test]
    async fn test_conflicting_timestamp_retries_with_later_one() {
        let cluster = Cluster::new();
        let c1 = cluster.coordinator(1);
        let early = c1.stamper.next_timestamp().unwrap();
        let late = cluster.coordinator(0).commit(1, vec![create("carol", 2)]).await;

        // The service settles `early` before `late` ...
        assert_eq!(
            cluster
                .oracle
                .compare_vts(&[early.clone(), late.clone()])
                .await
                .unwrap(),
            0
        );

        // ... so a write stamped `early` cannot follow carol's creation.
        let tx = PendingTransaction::new(
            TxId(2),
            early.clone(),
            vec![set("carol", 2, "Carol")],
            &ClusterLayout::for_testing(),
        )
        .unwrap();
        let floor = match c1.tracker.submit(tx.clone()).await.unwrap() {
            SubmitOutcome::Retry { floor } => floor,
            other => panic!("expected retry, got {:?}", other),
        };
        assert_eq!(floor, early.clock);
        assert_eq!(c1.tracker.status(TxId(2)), Some(AdmissionStatus::Retry));

        // Resubmit with a strictly later timestamp.
        let retry = PendingTransaction::new(
            TxId(2),
            c1.stamper.next_after(&floor).unwrap(),
            tx.updates,
            &ClusterLayout::for_testing(),
        )
        .unwrap();
        let outcome = c1.tracker.submit(retry).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Admitted { awaiting: vec![2] });
        assert_eq!(c1.tracker.stats().retries.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_service_outage_retries_then_admits() {
        let cluster = Cluster::new();
        cluster.coordinator(0).commit(1, vec![create("dave", 0)]).await;

        cluster.service.set_offline(true);
        let c2 = cluster.coordinator(2);
        let tx = c2.stamp(2, vec![set("dave", 0, "Dave")]);
        let floor = match c2.tracker.submit(tx.clone()).await.unwrap() {
            SubmitOutcome::Retry { floor } => floor,
            other => panic!("expected retry, got {:?}", other),
        };

        cluster.service.set_offline(false);
        let retry = PendingTransaction::new(
            TxId(2),
            c2.stamper.next_after(&floor).unwrap(),
            tx.updates,
            &ClusterLayout::for_testing(),
        )
        .unwrap();
        assert!(c2.tracker.submit(retry).await.unwrap().is_admitted());
    }

    // =============================================================================
    // SHARD FAILURE
    // =============================================================================

    #[tokio::test]
    async fn test_shard_failure_names_shards_to_compensate() {
        let cluster = Cluster::new();
        let c0 = cluster.coordinator(0);
        let tx = c0.stamp(1, vec![create("e", 0), create("f", 1), create("g", 3)]);
        let updates = tx.updates.clone();
        c0.tracker.submit(tx).await.unwrap();

        c0.tracker.on_shard_ack(TxId(1), 0).await.unwrap();
        c0.tracker.on_shard_ack(TxId(1), 3).await.unwrap();
        let report = c0
            .tracker
            .on_shard_failure(TxId(1), 1, "constraint violated".into())
            .await
            .unwrap();

        assert_eq!(report.acknowledged, vec![0, 3]);
        assert_eq!(report.updates, updates);
        assert!(matches!(report.reason, AbortReason::ShardFailure { shard: 1, .. }));
        assert_eq!(c0.tracker.status(TxId(1)), None);
        assert_eq!(cluster.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_aborted_create_invisible_to_other_replicas() {
        let cluster = Cluster::new();
        let c0 = cluster.coordinator(0);
        let tx = c0.stamp(1, vec![create("ghost", 2)]);
        c0.tracker.submit(tx).await.unwrap();
        c0.tracker
            .on_shard_failure(TxId(1), 2, "disk full".into())
            .await
            .unwrap();

        let c1 = cluster.coordinator(1);
        let outcome = c1
            .tracker
            .submit(c1.stamp(2, vec![set("ghost", 2, "Boo")]))
            .await
            .unwrap();
        match outcome {
            SubmitOutcome::Aborted(report) => {
                assert_eq!(report.reason, AbortReason::NodeNotFound(NodeHandle::new("ghost")))
            }
            other => panic!("expected abort, got {:?}", other),
        }

        // The handle is free again.
        c1.commit(3, vec![create("ghost", 2)]).await;
    }

    // =============================================================================
    // DELETES
    // =============================================================================

    #[tokio::test]
    async fn test_committed_delete_seen_by_every_replica() {
        let cluster = Cluster::new();
        let created = cluster.coordinator(0).commit(1, vec![create("frank", 1)]).await;

        let c2 = cluster.coordinator(2);
        c2.stamper.observe(&created.clock).unwrap();
        c2.commit(
            2,
            vec![GraphUpdate::DeleteNode {
                node: NodeRef::new("frank", 1),
            }],
        )
        .await;
        assert_eq!(cluster.store.last_update(&NodeHandle::new("frank")), None);

        let c0 = cluster.coordinator(0);
        let outcome = c0
            .tracker
            .submit(c0.stamp(3, vec![set("frank", 1, "Frank")]))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Aborted(report)
                if report.reason == AbortReason::NodeNotFound(NodeHandle::new("frank"))
        ));
    }

    // =============================================================================
    // COORDINATOR FAILOVER
    // =============================================================================

    #[tokio::test]
    async fn test_backup_resumes_after_coordinator_loss() {
        let cluster = Cluster::new();
        let primary = cluster.coordinator(0);
        let tx = primary.stamp(7, vec![create("h", 1), create("i", 2)]);
        primary.tracker.submit(tx).await.unwrap();
        primary.tracker.on_shard_ack(TxId(7), 1).await.unwrap();

        // The primary is gone; replica 1 takes over its records.
        let backup = cluster.coordinator(1);
        let pending = cluster
            .store
            .pending_transactions(ReplicaId(0))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);

        assert_eq!(
            backup.tracker.restore_pending(ReplicaId(0)).await.unwrap(),
            vec![TxId(7)]
        );
        // Shards re-acknowledge to the backup.
        ack_all(&backup.tracker, TxId(7), &[1, 2]).await;

        assert_eq!(backup.tracker.in_flight(), 0);
        assert_eq!(cluster.store.record_count(), 0);
    }

    // =============================================================================
    // PARALLEL LOAD
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_transactions_all_commit() {
        let cluster = Cluster::new();
        let tracker = Arc::new(Cluster::tracker(&cluster.oracle, &cluster.store));
        let stamper = Arc::new(
            Timestamper::new(ReplicaId(0), &ClusterLayout::for_testing(), 0).unwrap(),
        );

        let submits = (0..64u64).map(|i| {
            let tracker = tracker.clone();
            let stamper = stamper.clone();
            tokio::spawn(async move {
                let shard = (i % 4) as ShardId;
                let tx = PendingTransaction::new(
                    TxId(i),
                    stamper.next_timestamp().unwrap(),
                    vec![create(&format!("n{}", i), shard)],
                    &ClusterLayout::for_testing(),
                )
                .unwrap();
                let outcome = tracker.submit(tx).await.unwrap();
                assert!(outcome.is_admitted());
                tracker.on_shard_ack(TxId(i), shard).await.unwrap()
            })
        });

        let results = futures::future::join_all(submits).await;
        for res in results {
            assert_eq!(res.unwrap(), AckProgress::Committed);
        }
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(cluster.store.record_count(), 0);
        assert_eq!(cluster.service.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_writers_of_one_node_all_commit() {
        let cluster = Arc::new(Cluster::new());
        cluster.coordinator(0).commit(100, vec![create("hot", 0)]).await;

        let writers = (0..12u64).map(|i| {
            let cluster = cluster.clone();
            tokio::spawn(async move {
                let c = cluster.coordinator((i % 3) as usize);
                let mut tx = c.stamp(i, vec![set("hot", 0, &format!("v{}", i))]);
                loop {
                    match c.tracker.submit(tx.clone()).await.unwrap() {
                        SubmitOutcome::Admitted { awaiting } => {
                            ack_all(&c.tracker, TxId(i), &awaiting).await;
                            return tx.timestamp;
                        }
                        SubmitOutcome::Retry { floor } => {
                            // Catch up with whatever won the race.
                            if let Some(last) = cluster.store.last_update(&NodeHandle::new("hot")) {
                                c.stamper.observe(&last.clock).unwrap();
                            }
                            tx = PendingTransaction::new(
                                TxId(i),
                                c.stamper.next_after(&floor).unwrap(),
                                tx.updates,
                                &ClusterLayout::for_testing(),
                            )
                            .unwrap();
                        }
                        SubmitOutcome::Aborted(report) => panic!("unexpected abort: {:?}", report),
                    }
                }
            })
        });

        let committed: Vec<Timestamp> = futures::future::join_all(writers)
            .await
            .into_iter()
            .map(|res| res.unwrap())
            .collect();

        let last = cluster.store.last_update(&NodeHandle::new("hot")).unwrap();
        assert!(committed.contains(&last));
        assert_eq!(cluster.store.record_count(), 0);
        for c in &cluster.coordinators {
            assert_eq!(c.tracker.in_flight(), 0);
        }
    }
}
