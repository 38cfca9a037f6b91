//! # Mint Outcomes Through the Flow
//!
//! Mint failures are scoped to the mint branch: the report stays accepted
//! and on the ledger, the mint delivery carries the failure.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pe_04_document_lineage::Collection;
    use pe_05_request_block::RequestOutcome;
    use policy_runtime::EngineConfig;
    use serde_json::json;
    use shared_bus::{DeliveryRecord, DeliveryStatus, DispatchReport};
    use shared_types::{EventState, EventType};

    fn accepted_report(outcome: RequestOutcome) -> DispatchReport {
        match outcome {
            RequestOutcome::Accepted { report, .. } => report,
            RequestOutcome::Rejected(rejection) => panic!("unexpected rejection: {rejection:?}"),
        }
    }

    fn mint_failure(report: &DispatchReport) -> &DeliveryRecord {
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1, "exactly the mint branch fails");
        assert_eq!(failures[0].target, Some(block(MINT_ID)));
        failures[0]
    }

    fn reason(record: &DeliveryRecord) -> &str {
        match &record.status {
            DeliveryStatus::Failed(reason) => reason,
            other => panic!("expected a failed delivery, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_fungible_token_mints_whole_units() {
        let h = Harness::new();
        let policy = h
            .engine
            .publish(
                IssuancePolicy::default()
                    .mint(json!({ "tokenId": CERTIFICATE_TOKEN, "rule": "amount" }))
                    .build(),
            )
            .await
            .unwrap();

        policy
            .set_data(SUBMIT_TAG, &alice(), report(json!(2.9)))
            .await
            .unwrap();

        let mints = h.ledger.mints();
        assert_eq!(mints.len(), 1);
        assert_eq!(mints[0].amount, 2);
        assert_eq!(mints[0].serials.len(), 2);
    }

    #[tokio::test]
    async fn test_custom_account_from_the_report() {
        let h = Harness::new();
        let policy = h
            .engine
            .publish(
                IssuancePolicy::default()
                    .mint(json!({
                        "tokenId": CARBON_TOKEN,
                        "rule": "amount",
                        "accountType": "custom",
                        "accountId": "beneficiary"
                    }))
                    .build(),
            )
            .await
            .unwrap();

        let mut payload = report(json!(1));
        payload
            .fields
            .insert("beneficiary".into(), json!("0.0.5005"));
        policy.set_data(SUBMIT_TAG, &alice(), payload).await.unwrap();

        assert_eq!(h.ledger.mints()[0].recipient, "0.0.5005");
    }

    #[tokio::test]
    async fn test_disagreeing_accounts_mint_to_the_first_with_one_warning() {
        let h = Harness::new();
        let policy = h
            .engine
            .publish(
                IssuancePolicy::default()
                    .mint(json!({
                        "tokenId": CARBON_TOKEN,
                        "rule": "amount",
                        "accountType": "custom",
                        "accountId": "beneficiary"
                    }))
                    .build(),
            )
            .await
            .unwrap();

        let subjects = ["0.0.5005", "0.0.5005", "0.0.6006"]
            .into_iter()
            .map(|account| json!({ "amount": 1, "beneficiary": account }))
            .collect();
        let drafts = h.drafts(&alice(), subjects).await;

        // Hand the drafts on as the request block would.
        let report = policy
            .dispatcher()
            .trigger(
                &block(REQUEST_ID),
                EventType::RunEvent,
                &alice(),
                EventState::with_documents(drafts),
            )
            .await;

        assert_eq!(report.failures().count(), 0);
        let warnings: Vec<_> = report.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("0.0.6006"));
        let mint_id = block(MINT_ID);
        let to_mint: Vec<_> = report.delivered_to(&mint_id).collect();
        assert_eq!(to_mint[0].warnings.len(), 1);

        let mints = h.ledger.mints();
        assert_eq!(mints.len(), 1);
        assert_eq!(mints[0].recipient, "0.0.5005");
        assert_eq!(mints[0].amount, 300);
    }

    #[tokio::test]
    async fn test_zero_amount_is_refused_before_any_mint_submission() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();

        let report = accepted_report(
            policy
                .set_data(SUBMIT_TAG, &alice(), report(json!(0)))
                .await
                .unwrap(),
        );

        assert!(reason(mint_failure(&report)).contains("InvalidAmount"));
        // Only the report VC made it to the ledger.
        assert_eq!(h.ledger.submissions(), 1);
        assert_eq!(h.repository.count(Collection::VpDocuments), 0);
    }

    #[tokio::test]
    async fn test_non_numeric_amount_is_invalid() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();

        let report = accepted_report(
            policy
                .set_data(SUBMIT_TAG, &alice(), report(json!("plenty")))
                .await
                .unwrap(),
        );

        assert!(reason(mint_failure(&report)).contains("InvalidAmount"));
        assert_eq!(h.ledger.submissions(), 1);
        assert!(h.ledger.mints().is_empty());
    }

    #[tokio::test]
    async fn test_actor_without_account_has_no_recipient() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();
        let carol = shared_types::Actor::new("carol").with_did("did:example:carol");

        let report = accepted_report(
            policy
                .set_data(SUBMIT_TAG, &carol, report(json!(5)))
                .await
                .unwrap(),
        );

        assert!(reason(mint_failure(&report)).contains("NoRecipient"));
        assert!(h.ledger.mints().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_fails_at_runtime_when_published_leniently() {
        let h = Harness::with_config(EngineConfig::default().lenient());
        let policy = h
            .engine
            .publish(
                IssuancePolicy::default()
                    .mint(json!({ "tokenId": "0.0.404", "rule": "amount" }))
                    .build(),
            )
            .await
            .unwrap();
        assert!(!policy.validation().is_valid());

        let report = accepted_report(
            policy
                .set_data(SUBMIT_TAG, &alice(), report(json!(5)))
                .await
                .unwrap(),
        );

        assert!(reason(mint_failure(&report)).contains("BadTokenId"));
        assert_eq!(h.ledger.submissions(), 1);
    }
}
