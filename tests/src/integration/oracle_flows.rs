//! # Oracle Flows
//!
//! The causal order oracle driven by real replica timestampers and the
//! in-memory temporal-order service.
//!
//! ## Flows Tested:
//!
//! 1. **Concurrent writers**: clocks from different replicas get one total
//!    order, and the service never contradicts an earlier answer
//! 2. **Memoization**: a repeated question is answered without a round trip
//! 3. **Node lifetime**: creation/deletion bounds checked across replicas
//! 4. **Outage**: service failures surface as recoverable errors

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cg_01_causal_order::{
        CausalOrderApi, CausalOrderError, ComparisonResult, InMemoryTemporalOrderService, Oracle,
        OracleConfig,
    };
    use cg_02_tx_admission::Timestamper;
    use shared_types::{decode_clock, encode_clock, ClusterLayout, ReplicaId, Timestamp};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn replicas() -> Vec<Timestamper> {
        let layout = ClusterLayout::for_testing();
        (0..layout.num_replicas as u64)
            .map(|r| Timestamper::new(ReplicaId(r), &layout, 0).unwrap())
            .collect()
    }

    /// One concurrent timestamp per replica: [1,0,0], [0,1,0], [0,0,1].
    fn concurrent_round(replicas: &[Timestamper]) -> Vec<Timestamp> {
        replicas
            .iter()
            .map(|r| r.next_timestamp().unwrap())
            .collect()
    }

    fn oracle(
        config: OracleConfig,
    ) -> (
        Arc<InMemoryTemporalOrderService>,
        Oracle<InMemoryTemporalOrderService>,
    ) {
        cg_telemetry::init_for_tests();
        let svc = Arc::new(InMemoryTemporalOrderService::new());
        let oracle = Oracle::with_config(svc.clone(), config).unwrap();
        (svc, oracle)
    }

    // =============================================================================
    // CONCURRENT WRITERS
    // =============================================================================

    #[tokio::test]
    async fn test_concurrent_replicas_get_stable_total_order() {
        let (svc, oracle) = oracle(OracleConfig::default());
        let stamps = concurrent_round(&replicas());

        let first = oracle.compare_vts(&stamps).await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(svc.calls(), 1);

        // Asking in reverse order must name the same timestamp.
        let reversed: Vec<Timestamp> = stamps.iter().rev().cloned().collect();
        let second = oracle.compare_vts(&reversed).await.unwrap();
        assert_eq!(reversed[second], stamps[first]);
    }

    #[tokio::test]
    async fn test_pairwise_answers_are_antisymmetric() {
        let (_svc, oracle) = oracle(OracleConfig::default());
        let stamps = concurrent_round(&replicas());

        let ab = oracle.compare_two_vts(&stamps[1], &stamps[2]).await.unwrap();
        let ba = oracle.compare_two_vts(&stamps[2], &stamps[1]).await.unwrap();

        assert_eq!(ab, ComparisonResult::LhsSmaller);
        assert_eq!(ba, ComparisonResult::RhsSmaller);
    }

    #[tokio::test]
    async fn test_observed_clock_orders_locally() {
        let (svc, oracle) = oracle(OracleConfig::default());
        let replicas = replicas();

        let from_zero = replicas[0].next_timestamp().unwrap();
        replicas[1].observe(&from_zero.clock).unwrap();
        let from_one = replicas[1].next_timestamp().unwrap();

        assert_eq!(
            oracle.compare_vts(&[from_one, from_zero]).await.unwrap(),
            1
        );
        assert_eq!(svc.calls(), 0);
        assert_eq!(oracle.stats().local_resolutions, 1);
    }

    #[tokio::test]
    async fn test_new_epoch_dominates_without_escalation() {
        let (svc, oracle) = oracle(OracleConfig::default());
        let replicas = replicas();

        let old = replicas[0].next_timestamp().unwrap();
        replicas[0].next_timestamp().unwrap();
        replicas[1].advance_epoch(1);
        let new = replicas[1].next_timestamp().unwrap();

        assert!(oracle.assign_vt_order(&[old], &new).await.unwrap());
        assert_eq!(svc.calls(), 0);
    }

    #[tokio::test]
    async fn test_clock_survives_wire_round_trip() {
        let (_svc, oracle) = oracle(OracleConfig::default());
        let layout = ClusterLayout::for_testing();
        let stamps = concurrent_round(&replicas());

        let decoded: Vec<Timestamp> = stamps
            .iter()
            .map(|ts| {
                let bytes = encode_clock(&ts.clock);
                Timestamp::new(ts.replica, decode_clock(&bytes, layout.clock_len()).unwrap())
            })
            .collect();

        assert_eq!(decoded, stamps);
        assert_eq!(
            oracle.compare_vts(&stamps).await.unwrap(),
            oracle.compare_vts(&decoded).await.unwrap()
        );
    }

    // =============================================================================
    // MEMOIZATION
    // =============================================================================

    #[tokio::test]
    async fn test_cached_oracle_skips_repeat_round_trip() {
        let (svc, oracle) = oracle(OracleConfig::for_testing());
        let stamps = concurrent_round(&replicas());

        oracle.compare_vts(&stamps[..2]).await.unwrap();
        assert_eq!(svc.calls(), 1);

        let pair = [stamps[1].clone(), stamps[0].clone()];
        assert_eq!(oracle.compare_vts(&pair).await.unwrap(), 1);
        assert_eq!(svc.calls(), 1);
        assert!(oracle.stats().cache_hits >= 1);
    }

    #[tokio::test]
    async fn test_assign_order_respects_earlier_service_decision() {
        let (svc, oracle) = oracle(OracleConfig::default());
        let stamps = concurrent_round(&replicas());

        // The service decides stamps[0] < stamps[1] ...
        assert_eq!(oracle.compare_vts(&stamps[..2]).await.unwrap(), 0);

        // ... so stamps[0] cannot be placed after stamps[1].
        assert!(!oracle
            .assign_vt_order(&[stamps[1].clone()], &stamps[0])
            .await
            .unwrap());
        assert!(oracle
            .assign_vt_order(&[stamps[0].clone()], &stamps[1])
            .await
            .unwrap());
        assert_eq!(svc.calls(), 3);
    }

    // =============================================================================
    // NODE LIFETIME
    // =============================================================================

    #[tokio::test]
    async fn test_node_lifetime_bounds_across_replicas() {
        let (_svc, oracle) = oracle(OracleConfig::default());
        let replicas = replicas();

        let created = replicas[0].next_timestamp().unwrap();
        replicas[1].observe(&created.clock).unwrap();
        let request = replicas[1].next_timestamp().unwrap();
        replicas[2].observe(&request.clock).unwrap();
        let deleted = replicas[2].next_timestamp().unwrap();

        assert!(oracle
            .clock_creat_before_del_after(&request, &created, Some(&deleted))
            .await
            .unwrap());
        assert!(oracle
            .clock_creat_before_del_after(&request, &created, None)
            .await
            .unwrap());

        // A request stamped before the node existed.
        let stale = replicas[2].next_timestamp().unwrap();
        assert!(!oracle
            .clock_creat_before_del_after(&created, &stale, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_node_lifetime_with_concurrent_request() {
        let (svc, oracle) = oracle(OracleConfig::default());
        let replicas = replicas();

        let created = replicas[0].next_timestamp().unwrap();
        let request = replicas[1].next_timestamp().unwrap();

        // Whatever the service picks, the answer must match its order.
        let visible = oracle
            .clock_creat_before_del_after(&request, &created, None)
            .await
            .unwrap();
        let order = oracle.compare_two_vts(&created, &request).await.unwrap();

        assert_eq!(visible, order == ComparisonResult::LhsSmaller);
        assert_eq!(svc.calls(), 2);
    }

    // =============================================================================
    // OUTAGE
    // =============================================================================

    #[tokio::test]
    async fn test_outage_is_recoverable() {
        let (svc, oracle) = oracle(OracleConfig::default());
        let stamps = concurrent_round(&replicas());

        svc.set_offline(true);
        let err = oracle.compare_vts(&stamps).await.unwrap_err();
        assert!(matches!(err, CausalOrderError::ServiceUnavailable(_)));
        assert!(!err.is_internal_consistency());
        assert!(!oracle
            .assign_vt_order(&[stamps[0].clone()], &stamps[1])
            .await
            .unwrap());

        svc.set_offline(false);
        assert_eq!(oracle.compare_vts(&stamps).await.unwrap(), 0);
        assert_eq!(oracle.stats().service_failures, 2);
    }
}
