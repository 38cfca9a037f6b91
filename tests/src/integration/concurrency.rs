//! # Concurrent Actors
//!
//! One in-flight action per (block, actor); different actors never wait on
//! each other.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use policy_runtime::{EngineConfig, EngineError};
    use serde_json::json;
    use shared_types::ActionErrorKind;
    use std::sync::Arc;
    use std::time::Duration;

    fn did_policy() -> IssuancePolicy {
        IssuancePolicy::default().request(json!({ "schema": "#report", "idType": "DID" }))
    }

    #[tokio::test]
    async fn test_second_action_while_busy_is_refused() {
        let h = Harness::new();
        let policy = h.engine.publish(did_policy().build()).await.unwrap();
        // DID issuance puts the request on the ledger while the actor is busy.
        h.ledger.set_latency(Duration::from_millis(50));
        let actor = alice();

        let (first, second) = tokio::join!(
            policy.set_data(SUBMIT_TAG, &actor, report(json!(1))),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                policy.set_data(SUBMIT_TAG, &actor, report(json!(1))).await
            }
        );

        assert!(first.unwrap().is_accepted());
        let err = second.unwrap_err();
        assert_eq!(
            err.action_error().map(|e| e.kind),
            Some(ActionErrorKind::Unavailable)
        );

        let state = policy.state_of(SUBMIT_TAG, &actor).unwrap();
        assert_eq!(state["active"], true);
        assert_eq!(h.ledger.mints().len(), 1);
    }

    #[tokio::test]
    async fn test_actors_do_not_contend() {
        let h = Harness::new();
        let policy = Arc::new(h.engine.publish(did_policy().build()).await.unwrap());
        h.ledger.set_latency(Duration::from_millis(20));

        let tasks: Vec<_> = [alice(), bob()]
            .into_iter()
            .map(|actor| {
                let policy = policy.clone();
                tokio::spawn(async move {
                    policy
                        .set_data(SUBMIT_TAG, &actor, report(json!(2)))
                        .await
                        .map(|outcome| outcome.is_accepted())
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().unwrap());
        }

        let mut recipients: Vec<_> = h.ledger.mints().into_iter().map(|m| m.recipient).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["0.0.1001", "0.0.1002"]);
    }

    #[tokio::test]
    async fn test_actor_state_is_partitioned() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();

        let outcome = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(3)))
            .await
            .unwrap();
        let document_id = outcome.document().unwrap().id.clone();

        let alice_state = policy.state_of(SUBMIT_TAG, &alice()).unwrap();
        assert_eq!(alice_state["lastDocumentId"], json!(document_id));

        let bob_state = policy.state_of(SUBMIT_TAG, &bob()).unwrap();
        assert_eq!(bob_state, json!({ "active": true }));
    }

    #[tokio::test]
    async fn test_timed_out_action_leaves_the_block_available() {
        let h = Harness::with_config(
            EngineConfig::default().with_action_timeout(Duration::from_millis(30)),
        );
        let policy = h.engine.publish(did_policy().build()).await.unwrap();
        h.ledger.set_latency(Duration::from_secs(5));

        let err = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));

        // The action was dropped mid-flight while busy.
        let state = policy.state_of(SUBMIT_TAG, &alice()).unwrap();
        assert_eq!(state["active"], true);

        h.ledger.set_latency(Duration::ZERO);
        let outcome = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(1)))
            .await
            .unwrap();
        assert!(outcome.is_accepted());
    }
}
