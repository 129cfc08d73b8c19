use serde::Serialize;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const INVOKE_ACTION: &str = "execute-api:Invoke";
/// 拒绝时返回的固定错误信息，网关据此返回 401
pub const UNAUTHORIZED: &str = "Unauthorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: String,
    pub effect: String,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerContextOut {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    pub context: AuthorizerContextOut,
}

impl AuthorizerResponse {
    pub fn allow(user_id: &str, method_arn: &str) -> Self {
        Self {
            principal_id: user_id.to_string(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: INVOKE_ACTION.to_string(),
                    effect: "Allow".to_string(),
                    resource: method_arn.to_string(),
                }],
            },
            context: AuthorizerContextOut {
                user_id: user_id.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allow_policy_wire_format() {
        let arn = "arn:aws:execute-api:us-east-1:123456789012:abc/prod/$connect";
        let value = serde_json::to_value(AuthorizerResponse::allow("a@x.com", arn)).unwrap();

        assert_eq!(
            value,
            json!({
                "principalId": "a@x.com",
                "policyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Action": "execute-api:Invoke",
                        "Effect": "Allow",
                        "Resource": arn
                    }]
                },
                "context": {"userId": "a@x.com"}
            })
        );
    }
}
