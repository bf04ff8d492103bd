//! DynamoDB client bootstrap and helpers shared by the service and the admin tool.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use aws_sdk_dynamodb::{
    error::DisplayErrorContext,
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ProvisionedThroughput, ScalarAttributeType, TableStatus,
    },
    Client,
};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

/// Where to find DynamoDB.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// Custom endpoint URL (for local DynamoDB).
    pub endpoint_url: Option<String>,
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        }
    }
}

impl AwsConfig {
    pub fn target_display(&self) -> String {
        match &self.endpoint_url {
            Some(url) => format!("Local DynamoDB ({})", url),
            None => format!("AWS DynamoDB (region: {})", self.region),
        }
    }
}

pub async fn create_client(config: &AwsConfig) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let shared = loader.load().await;
    Client::new(&shared)
}

/// Renders an SDK error with its full source chain.
pub fn sdk_message<E: std::error::Error>(err: &E) -> String {
    DisplayErrorContext(err).to_string()
}

/// Throughput settings for a new table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Provisioned { read: i64, write: i64 },
    OnDemand,
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Provisioned { read: 5, write: 5 }
    }
}

/// Outcome of a create request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Created {
    Created,
    AlreadyExists,
}

/// Creates a table with a single string hash key and waits until it is active.
pub async fn create_hash_key_table(
    client: &Client,
    table_name: &str,
    key_name: &str,
    capacity: Capacity,
) -> anyhow::Result<Created> {
    let key_schema = KeySchemaElement::builder()
        .attribute_name(key_name)
        .key_type(KeyType::Hash)
        .build()
        .context("build key schema")?;
    let attribute = AttributeDefinition::builder()
        .attribute_name(key_name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .context("build attribute definition")?;

    let mut request = client
        .create_table()
        .table_name(table_name)
        .key_schema(key_schema)
        .attribute_definitions(attribute);

    request = match capacity {
        Capacity::Provisioned { read, write } => request
            .billing_mode(BillingMode::Provisioned)
            .provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(read)
                    .write_capacity_units(write)
                    .build()
                    .context("build provisioned throughput")?,
            ),
        Capacity::OnDemand => request.billing_mode(BillingMode::PayPerRequest),
    };

    match request.send().await {
        Ok(_) => {}
        Err(err)
            if err
                .as_service_error()
                .map(|e| e.is_resource_in_use_exception())
                .unwrap_or(false) =>
        {
            debug!(table = table_name, "table already exists");
            return Ok(Created::AlreadyExists);
        }
        Err(err) => anyhow::bail!("create table {}: {}", table_name, sdk_message(&err)),
    }

    wait_for_table_active(client, table_name).await?;
    info!(table = table_name, key = key_name, "table created");
    Ok(Created::Created)
}

/// Polls until the table reports ACTIVE.
pub async fn wait_for_table_active(client: &Client, table_name: &str) -> anyhow::Result<()> {
    const MAX_ATTEMPTS: u32 = 60;

    for _ in 0..MAX_ATTEMPTS {
        let out = client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("describe table {}: {}", table_name, sdk_message(&e)))?;

        let status = out.table().and_then(|t| t.table_status());
        if matches!(status, Some(TableStatus::Active)) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    anyhow::bail!("timed out waiting for table {} to become active", table_name)
}

/// Converts a DynamoDB item into JSON for display.
pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Map<String, Value> {
    item.iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect()
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(item_to_json(map)),
        AttributeValue::Ss(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(set) => Value::Array(set.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::B(blob) => Value::String(format!("<binary {} bytes>", blob.as_ref().len())),
        AttributeValue::Bs(set) => Value::String(format!("<binary set of {}>", set.len())),
        _ => Value::String("<unsupported>".into()),
    }
}

// DynamoDB numbers are decimal strings; keep the text if it does not fit a JSON number.
fn number_to_json(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
