use async_trait::async_trait;
use aws_sdk_dynamodb::{
    operation::{transact_write_items::TransactWriteItemsError, update_item::UpdateItemError},
    types::{AttributeValue, CancellationReason, Put, TransactWriteItem},
    Client,
};
use tracing::{debug, info};

use crate::accounts::{error::StoreError, repo_types::User};
use crate::config::TableNames;
use crate::dynamo::{self, sdk_message, Capacity, Created};

/// Persistence for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user and claims its nickname in one atomic step.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Sets `confirmed = true`. Fails with [`StoreError::NotFound`] if the record is gone.
    async fn mark_confirmed(&self, email: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DynamoUserStore {
    client: Client,
    tables: TableNames,
}

impl DynamoUserStore {
    pub fn new(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }
}

// Positions inside the registration transaction.
const NICKNAME_CLAIM: usize = 0;
const USER_RECORD: usize = 1;

#[async_trait]
impl UserStore for DynamoUserStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let claim = Put::builder()
            .table_name(&self.tables.nicknames)
            .item("nickname", AttributeValue::S(user.nickname.clone()))
            .item("email", AttributeValue::S(user.email.clone()))
            .condition_expression("attribute_not_exists(nickname)")
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let record = Put::builder()
            .table_name(&self.tables.users)
            .set_item(Some(user.to_item()))
            .condition_expression("attribute_not_exists(email)")
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(claim).build())
            .transact_items(TransactWriteItem::builder().put(record).build())
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(email = %user.email, "user record written");
                Ok(())
            }
            Err(err) => match err.as_service_error() {
                Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) => {
                    Err(classify_cancellation(cancelled.cancellation_reasons()))
                }
                _ => Err(StoreError::Backend(sdk_message(&err))),
            },
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let out = self
            .client
            .get_item()
            .table_name(&self.tables.users)
            .key("email", AttributeValue::S(email.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Backend(sdk_message(&e)))?;

        match out.item() {
            None => Ok(None),
            Some(item) => User::from_item(item)
                .map(Some)
                .ok_or_else(|| StoreError::Backend(format!("malformed user record for {}", email))),
        }
    }

    async fn mark_confirmed(&self, email: &str) -> Result<(), StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.tables.users)
            .key("email", AttributeValue::S(email.to_string()))
            .update_expression("SET confirmed = :val")
            .condition_expression("attribute_exists(email)")
            .expression_attribute_values(":val", AttributeValue::Bool(true))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => Err(err
                .as_service_error()
                .and_then(classify_confirm_failure)
                .unwrap_or_else(|| StoreError::Backend(sdk_message(&err)))),
        }
    }
}

/// Maps the per-item reasons of a cancelled registration transaction to a store error.
/// A nickname conflict wins over an email conflict.
pub(crate) fn classify_cancellation(reasons: &[CancellationReason]) -> StoreError {
    let failed =
        |idx: usize| reasons.get(idx).and_then(|r| r.code()) == Some("ConditionalCheckFailed");
    if failed(NICKNAME_CLAIM) {
        return StoreError::NicknameTaken;
    }
    if failed(USER_RECORD) {
        return StoreError::EmailTaken;
    }
    let codes: Vec<&str> = reasons
        .iter()
        .map(|r| r.code().unwrap_or("None"))
        .collect();
    StoreError::Backend(format!("transaction cancelled: [{}]", codes.join(", ")))
}

// A failed `attribute_exists(email)` condition means the record is gone.
fn classify_confirm_failure(err: &UpdateItemError) -> Option<StoreError> {
    err.is_conditional_check_failed_exception()
        .then_some(StoreError::NotFound)
}

/// Creates the tables the service needs. Existing tables are left untouched.
pub async fn provision_tables(client: &Client, tables: &TableNames) -> anyhow::Result<()> {
    for (table, key) in [(&tables.users, "email"), (&tables.nicknames, "nickname")] {
        match dynamo::create_hash_key_table(client, table, key, Capacity::default()).await? {
            Created::Created => info!(table = %table, "table created"),
            Created::AlreadyExists => info!(table = %table, "table already exists; skipping"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::error::{
        ConditionalCheckFailedException, ResourceNotFoundException,
    };

    use super::*;

    fn reason(code: Option<&str>) -> CancellationReason {
        CancellationReason::builder()
            .set_code(code.map(str::to_string))
            .build()
    }

    const CCF: Option<&str> = Some("ConditionalCheckFailed");

    #[test]
    fn nickname_conflict_comes_from_the_claim_slot() {
        assert_eq!(
            classify_cancellation(&[reason(CCF), reason(Some("None"))]),
            StoreError::NicknameTaken
        );
        assert_eq!(
            classify_cancellation(&[reason(CCF), reason(None)]),
            StoreError::NicknameTaken
        );
    }

    #[test]
    fn email_conflict_comes_from_the_user_slot() {
        assert_eq!(
            classify_cancellation(&[reason(Some("None")), reason(CCF)]),
            StoreError::EmailTaken
        );
        assert_eq!(
            classify_cancellation(&[reason(None), reason(CCF)]),
            StoreError::EmailTaken
        );
    }

    #[test]
    fn nickname_wins_when_both_conflict() {
        assert_eq!(
            classify_cancellation(&[reason(CCF), reason(CCF)]),
            StoreError::NicknameTaken
        );
    }

    #[test]
    fn other_cancellations_are_backend_errors() {
        match classify_cancellation(&[reason(None), reason(Some("ThrottlingError"))]) {
            StoreError::Backend(msg) => assert!(msg.contains("ThrottlingError"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(classify_cancellation(&[]), StoreError::Backend(_)));
    }

    #[test]
    fn failed_confirm_condition_means_missing_record() {
        let ccf = UpdateItemError::ConditionalCheckFailedException(
            ConditionalCheckFailedException::builder().build(),
        );
        assert_eq!(classify_confirm_failure(&ccf), Some(StoreError::NotFound));

        let missing_table = UpdateItemError::ResourceNotFoundException(
            ResourceNotFoundException::builder().build(),
        );
        assert_eq!(classify_confirm_failure(&missing_table), None);
    }
}
