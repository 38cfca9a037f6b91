//! # Publish-Time Validation
//!
//! Every misconfigured block is reported in one pass; compile errors stop
//! publishing before validation runs.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pe_01_block_tree::{PolicyConfig, RegistryError, TreeError};
    use policy_runtime::{EngineError, INTERFACE_CONTAINER_BLOCK};
    use serde_json::json;

    async fn refused(h: &Harness, policy: PolicyConfig) -> pe_03_validation::ValidationResults {
        match h.engine.publish(policy).await {
            Err(EngineError::InvalidPolicy { results }) => results,
            Err(other) => panic!("expected InvalidPolicy, got {other}"),
            Ok(_) => panic!("expected the policy to be refused"),
        }
    }

    #[tokio::test]
    async fn test_every_misconfigured_block_is_reported() {
        let h = Harness::new();
        let results = refused(
            &h,
            IssuancePolicy::default()
                .request(json!({ "schema": "#unpublished" }))
                .mint(json!({ "tokenId": CARBON_TOKEN, "rule": "amount *" }))
                .build(),
        )
        .await;

        let mut invalid: Vec<_> = results.invalid_blocks().map(|id| id.as_str()).collect();
        invalid.sort_unstable();
        assert_eq!(invalid, vec![MINT_ID, REQUEST_ID]);
        assert!(results.errors_for(&block(SEND_ID)).is_empty());
        assert!(results.error_count() >= 2);
    }

    #[tokio::test]
    async fn test_bad_validator_conditions_are_reported() {
        let h = Harness::new();
        let results = refused(
            &h,
            IssuancePolicy::default()
                .validator(json!({
                    "conditions": [{ "field": "site", "type": "in", "value": "north" }]
                }))
                .build(),
        )
        .await;

        let errors = results.errors_for(&block(CHECK_ID));
        assert!(errors.iter().any(|e| e.contains("array")));
        assert!(results.errors_for(&block(REQUEST_ID)).is_empty());
    }

    #[tokio::test]
    async fn test_custom_account_needs_a_field_name() {
        let h = Harness::new();
        let results = refused(
            &h,
            IssuancePolicy::default()
                .mint(json!({ "tokenId": CARBON_TOKEN, "rule": "amount", "accountType": "custom" }))
                .build(),
        )
        .await;

        assert!(!results.errors_for(&block(MINT_ID)).is_empty());
    }

    #[tokio::test]
    async fn test_broken_event_link_is_reported_on_its_source() {
        let h = Harness::new();
        let mut definition = IssuancePolicy::default().to_json();
        definition["root"]["children"][1]["events"] = json!([
            { "output": "RunEvent", "target": "archive", "input": "RunEvent" }
        ]);
        let results = refused(&h, PolicyConfig::from_value(definition).unwrap()).await;

        let errors = results.errors_for(&block(SEND_ID));
        assert!(errors.iter().any(|e| e.contains("archive")));
    }

    #[tokio::test]
    async fn test_self_link_is_refused_as_a_cycle() {
        let h = Harness::new();
        let mut definition = IssuancePolicy::default().to_json();
        definition["root"]["children"][1]["events"] = json!([
            { "output": "RunEvent", "target": "send_report", "input": "RunEvent" }
        ]);
        let results = refused(&h, PolicyConfig::from_value(definition).unwrap()).await;

        let errors = results.errors_for(&block(SEND_ID));
        assert!(errors.iter().any(|e| e.contains("cycle")));
        assert!(results.errors_for(&block(MINT_ID)).is_empty());
    }

    #[tokio::test]
    async fn test_validator_cannot_be_the_root() {
        let h = Harness::new();
        let policy = PolicyConfig::from_value(json!({
            "id": "lonely-validator",
            "root": { "id": "check", "blockType": "documentValidatorBlock", "tag": "check" }
        }))
        .unwrap();

        let results = refused(&h, policy).await;
        assert!(results.errors_for(&block(CHECK_ID))[0].contains("root"));
    }

    #[tokio::test]
    async fn test_unknown_block_type_does_not_compile() {
        let h = Harness::new();
        let policy = PolicyConfig::from_value(json!({
            "id": "unknown-type",
            "root": {
                "blockType": INTERFACE_CONTAINER_BLOCK,
                "tag": "root",
                "children": [{ "blockType": "aggregateDocumentBlock", "tag": "aggregate" }]
            }
        }))
        .unwrap();

        let err = h.engine.publish(policy).await.err().unwrap();
        assert!(matches!(
            err,
            EngineError::Tree(TreeError::Registry(RegistryError::UnknownBlockType(_)))
        ));
    }

    #[tokio::test]
    async fn test_children_under_a_leaf_do_not_compile() {
        let h = Harness::new();
        let mut definition = IssuancePolicy::default().to_json();
        definition["root"]["children"][2]["children"] = json!([
            { "blockType": "sendToLedgerBlock", "tag": "nested_send" }
        ]);

        let err = h.engine.publish_json(&definition.to_string()).await.err().unwrap();
        assert!(matches!(err, EngineError::Tree(TreeError::ChildrenNotAllowed { .. })));
    }

    #[tokio::test]
    async fn test_valid_policy_reports_nothing() {
        let h = Harness::new();
        let policy = h.engine.publish(IssuancePolicy::default().build()).await.unwrap();
        assert!(policy.validation().is_valid());
        assert_eq!(policy.validation().error_count(), 0);
        assert_eq!(policy.tree().len(), 4);
    }
}
