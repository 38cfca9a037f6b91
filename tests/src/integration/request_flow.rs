//! # Request → Send → Mint
//!
//! An actor's submission travels through the default routes of the
//! issuance policy:
//!
//! 1. **submit_report** builds and signs the report, validators check it
//! 2. **send_report** puts it on the ledger and persists it
//! 3. **mint_tokens** aggregates it, submits VC + VP and mints

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pe_04_document_lineage::Collection;
    use pe_05_request_block::RequestOutcome;
    use serde_json::json;
    use shared_bus::{DeliveryStatus, EventFilter};
    use shared_types::{ActionErrorKind, EventType};

    #[tokio::test]
    async fn test_report_is_submitted_and_minted() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();

        let outcome = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
            .await
            .unwrap();
        let RequestOutcome::Accepted { document, report } = outcome else {
            panic!("report should be accepted");
        };

        // The request block only drafts; the send block submits.
        assert!(!document.is_submitted());
        assert_eq!(report.completed(), 2);
        assert_eq!(report.failures().count(), 0);
        assert_eq!(report.delivered_to(&block(SEND_ID)).count(), 1);
        assert_eq!(report.delivered_to(&block(MINT_ID)).count(), 1);

        // report VC, mint VC, mint VP
        assert_eq!(h.ledger.submissions(), 3);
        let mints = h.ledger.mints();
        assert_eq!(mints.len(), 1);
        assert_eq!(mints[0].token_id, CARBON_TOKEN);
        assert_eq!(mints[0].amount, 1000);
        assert_eq!(mints[0].recipient, "0.0.1001");

        assert_eq!(h.repository.count(Collection::VcDocuments), 2);
        let presentations = h.repository.records(Collection::VpDocuments);
        assert_eq!(presentations.len(), 1);
        assert_eq!(presentations[0]["status"], "MINTED");
        assert_eq!(presentations[0]["policyId"], "issuance-policy");
    }

    #[tokio::test]
    async fn test_presentation_links_to_the_mint_credential() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();
        policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(1.5)))
            .await
            .unwrap();

        let presentation = &h.repository.records(Collection::VpDocuments)[0];
        let relationships = presentation["relationships"].as_array().unwrap();
        assert!(!relationships.is_empty());

        let credentials = h.repository.records(Collection::VcDocuments);
        let mint_vc = credentials
            .iter()
            .find(|record| record["type"] == "mint")
            .expect("mint credential persisted");
        assert!(relationships.contains(&mint_vc["messageId"]));
    }

    #[tokio::test]
    async fn test_resubmission_creates_independent_records() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();

        for _ in 0..2 {
            let outcome = policy
                .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
                .await
                .unwrap();
            assert!(outcome.is_accepted());
        }

        assert_eq!(h.ledger.mints().len(), 2);
        assert_eq!(h.repository.count(Collection::VpDocuments), 2);
        assert_eq!(h.repository.count(Collection::VcDocuments), 4);
    }

    #[tokio::test]
    async fn test_validator_rejection_stops_the_flow() {
        let h = Harness::new();
        let policy = h
            .engine
            .publish(
                IssuancePolicy::default()
                    .validator(json!({
                        "conditions": [{ "field": "site", "type": "in", "value": ["south", "east"] }]
                    }))
                    .build(),
            )
            .await
            .unwrap();

        let outcome = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
            .await
            .unwrap();
        let RequestOutcome::Rejected(rejection) = outcome else {
            panic!("report should be rejected");
        };
        assert_eq!(rejection.block_id, block(CHECK_ID));
        assert_eq!(rejection.kind, ActionErrorKind::DocumentInvalid);
        assert!(rejection.reasons[0].contains("site"));

        assert_eq!(h.ledger.submissions(), 0);
        let state = policy.state_of(SUBMIT_TAG, &alice()).unwrap();
        assert_eq!(state["active"], true);
        assert!(state["lastError"].is_string());
    }

    #[tokio::test]
    async fn test_validator_accepts_matching_report() {
        let h = Harness::new();
        let policy = h
            .engine
            .publish(
                IssuancePolicy::default()
                    .validator(json!({
                        "conditions": [{ "field": "site", "type": "equal", "value": "north" }]
                    }))
                    .build(),
            )
            .await
            .unwrap();

        let outcome = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
            .await
            .unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(h.ledger.mints().len(), 1);
    }

    #[tokio::test]
    async fn test_observers_see_the_cascade() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();
        let mut all = policy.subscribe(EventFilter::all());
        let mut from_mint = policy.subscribe(EventFilter::from_blocks(vec![block(MINT_ID)]));

        policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
            .await
            .unwrap();

        let mint_events: Vec<EventType> = from_mint.drain().iter().map(|e| e.event_type).collect();
        assert_eq!(mint_events, vec![EventType::RunEvent, EventType::RefreshEvent]);

        // Run and Refresh from each of the three blocks.
        let events = all.drain();
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.actor.username == "alice"));
    }

    #[tokio::test]
    async fn test_ledger_outage_fails_the_send_branch_only() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();
        h.ledger.fail_with(Some("ledger unreachable"));

        let outcome = policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
            .await
            .unwrap();
        let RequestOutcome::Accepted { report, .. } = outcome else {
            panic!("the request itself does not touch the ledger");
        };

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].target, Some(block(SEND_ID)));
        let DeliveryStatus::Failed(reason) = &failures[0].status else {
            panic!("expected a failed delivery");
        };
        assert!(reason.contains("SubmissionFailed"));
        assert!(h.ledger.mints().is_empty());
    }
}
