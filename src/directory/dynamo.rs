use std::collections::HashMap;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::{debug, info, warn};

use crate::config::{AwsConfig, DirectoryConfig};
use crate::directory::model::{CONNECTION_SORT_KEY, USER_SORT_KEY};
use crate::directory::{Connection, ConnectionDirectory};
use crate::error::{ErrorCode, InfraResult, InfraResultExt, Result};
use crate::utils::{ServiceHelper, current_epoch_seconds};

const ATTR_PK: &str = "pk";
const ATTR_SK: &str = "sk";
const ATTR_USER_ID: &str = "UserID";
const ATTR_USER_SK: &str = "UserSK";
const ATTR_IP_ADDRESS: &str = "ipAddress";
const ATTR_CONNECTED_AT: &str = "connectedAt";
const ATTR_TTL: &str = "ttl";

type Item = HashMap<String, AttributeValue>;

/// 基于 DynamoDB 的连接目录
///
/// 表结构：`pk`=connectionId、`sk`="connection#"，
/// 全局二级索引（默认 `UserID`）以 `UserID` 为分区键、`UserSK`="user#" 为排序键，
/// `ttl` 属性交给表的 TTL 机制做被动清理。
#[derive(Clone)]
pub struct DynamoConnectionDirectory {
    client: Client,
    table_name: String,
    user_index: String,
}

impl DynamoConnectionDirectory {
    pub fn new(client: Client, table_name: impl Into<String>, user_index: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            user_index: user_index.into(),
        }
    }

    pub async fn from_config(directory: &DirectoryConfig, aws: &AwsConfig) -> InfraResult<Self> {
        let table_name = directory
            .table_name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| anyhow!("directory table name is required"))?;

        let sdk_config = ServiceHelper::load_sdk_config(aws).await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = aws.endpoint_url.clone() {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        info!(table = %table_name, index = %directory.user_index_name(), "dynamodb connection directory ready");
        Ok(Self::new(client, table_name, directory.user_index_name()))
    }

    fn to_item(connection: &Connection) -> Item {
        let mut item = HashMap::from([
            (ATTR_PK.to_string(), AttributeValue::S(connection.connection_id.clone())),
            (ATTR_SK.to_string(), AttributeValue::S(CONNECTION_SORT_KEY.to_string())),
            (ATTR_USER_ID.to_string(), AttributeValue::S(connection.user_id.clone())),
            (ATTR_USER_SK.to_string(), AttributeValue::S(USER_SORT_KEY.to_string())),
            (
                ATTR_CONNECTED_AT.to_string(),
                AttributeValue::N(connection.connected_at.to_string()),
            ),
            (ATTR_TTL.to_string(), AttributeValue::N(connection.expires_at.to_string())),
        ]);
        if let Some(ip) = &connection.source_ip {
            item.insert(ATTR_IP_ADDRESS.to_string(), AttributeValue::S(ip.clone()));
        }
        item
    }

    fn from_item(item: &Item) -> InfraResult<Connection> {
        let string_attr = |name: &str| -> InfraResult<String> {
            item.get(name)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .with_context(|| format!("missing {name}"))
        };
        let number_attr = |name: &str| -> InfraResult<i64> {
            item.get(name)
                .and_then(|v| v.as_n().ok())
                .with_context(|| format!("missing {name}"))?
                .parse::<i64>()
                .with_context(|| format!("invalid {name}"))
        };

        Ok(Connection {
            connection_id: string_attr(ATTR_PK)?,
            user_id: string_attr(ATTR_USER_ID)?,
            source_ip: item
                .get(ATTR_IP_ADDRESS)
                .and_then(|v| v.as_s().ok())
                .cloned(),
            connected_at: number_attr(ATTR_CONNECTED_AT).unwrap_or_default(),
            expires_at: number_attr(ATTR_TTL)?,
        })
    }

    /// 无法解析的条目只记日志并跳过，不影响同一用户的其他连接
    fn collect_live(items: &[Item], now: i64) -> Vec<Connection> {
        items
            .iter()
            .filter_map(|item| match Self::from_item(item) {
                Ok(connection) => Some(connection),
                Err(err) => {
                    warn!(
                        pk = item
                            .get(ATTR_PK)
                            .and_then(|v| v.as_s().ok())
                            .map(String::as_str)
                            .unwrap_or_default(),
                        error = %format!("{err:#}"),
                        "skipping invalid connection item"
                    );
                    None
                }
            })
            .filter(|connection| !connection.is_expired_at(now))
            .collect()
    }

    fn primary_key(connection_id: &str) -> Item {
        HashMap::from([
            (ATTR_PK.to_string(), AttributeValue::S(connection_id.to_string())),
            (ATTR_SK.to_string(), AttributeValue::S(CONNECTION_SORT_KEY.to_string())),
        ])
    }

    async fn query_user(&self, user_id: &str) -> InfraResult<Vec<Connection>> {
        let now = current_epoch_seconds();
        let mut connections = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.user_index)
                .key_condition_expression("#uid = :uid")
                .expression_attribute_names("#uid", ATTR_USER_ID)
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .context("dynamodb query failed")?;

            connections.extend(Self::collect_live(output.items(), now));

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!(user_id = %user_id, count = connections.len(), "resolved user connections");
        Ok(connections)
    }
}

#[async_trait]
impl ConnectionDirectory for DynamoConnectionDirectory {
    async fn register(&self, connection: Connection) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(Self::to_item(&connection)))
            .send()
            .await
            .into_notify(ErrorCode::DirectoryWriteFailed, "failed to register connection")?;
        info!(
            connection_id = %connection.connection_id,
            user_id = %connection.user_id,
            "connection stored in dynamodb"
        );
        Ok(())
    }

    async fn remove(&self, connection_id: &str) -> Result<()> {
        // DeleteItem 对不存在的键是空操作
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::primary_key(connection_id)))
            .send()
            .await
            .into_notify(ErrorCode::DirectoryDeleteFailed, "failed to remove connection")?;
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Connection>> {
        self.query_user(user_id)
            .await
            .into_notify(ErrorCode::DirectoryReadFailed, "failed to query user connections")
    }

    async fn get(&self, connection_id: &str) -> Result<Option<Connection>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::primary_key(connection_id)))
            .send()
            .await
            .into_notify(ErrorCode::DirectoryReadFailed, "failed to fetch connection")?;

        let now = current_epoch_seconds();
        match output.item() {
            Some(item) => {
                let connection = Self::from_item(item)
                    .into_notify(ErrorCode::DirectoryReadFailed, "invalid connection item")?;
                Ok(Some(connection).filter(|c| !c.is_expired_at(now)))
            }
            None => Ok(None),
        }
    }
}
