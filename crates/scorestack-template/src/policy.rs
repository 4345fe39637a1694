//! IAM policy documents.

use serde::Serialize;

use crate::value::Value;

/// A policy document with version `2012-10-17`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statements: impl IntoIterator<Item = Statement>) -> Self {
        Self {
            version: "2012-10-17",
            statement: statements.into_iter().collect(),
        }
    }

    /// Trust policy letting a service principal assume the role.
    pub fn assume_role(principal: Principal) -> Self {
        Self::new([Statement::allow(["sts:AssumeRole"], Vec::<Value>::new()).with_principal(principal)])
    }

    /// True if any statement grants the action on any resource.
    pub fn grants(&self, action: &str) -> bool {
        self.statement
            .iter()
            .any(|s| s.effect == Effect::Allow && s.action.iter().any(|a| a == action))
    }

    /// True if any statement grants the action on the given resource.
    pub fn grants_on(&self, action: &str, resource: &str) -> bool {
        self.statement.iter().any(|s| {
            s.effect == Effect::Allow
                && s.action.iter().any(|a| a == action)
                && s.resource.iter().any(|r| r.as_str() == Some(resource))
        })
    }

    /// Actions granted on the `*` resource.
    pub fn wildcard_actions(&self) -> Vec<&str> {
        self.statement
            .iter()
            .filter(|s| s.resource.iter().any(Value::is_wildcard))
            .flat_map(|s| s.action.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

/// One policy statement. Resources may be plain ARNs or intrinsic values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl Statement {
    pub fn allow<A, R>(actions: impl IntoIterator<Item = A>, resources: impl IntoIterator<Item = R>) -> Self
    where
        A: Into<String>,
        R: Into<Value>,
    {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: None,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Restrict the statement to requests originating from `source_arn`.
    pub fn from_source(mut self, source_arn: impl Into<String>) -> Self {
        self.condition = Some(serde_json::json!({ "ArnEquals": { "aws:SourceArn": source_arn.into() } }));
        self
    }
}

/// Statement principal.
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Service(String),
    Aws(String),
    /// `"*"`, any principal.
    Any,
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(name.into())
    }

    pub fn aws(arn: impl Into<String>) -> Self {
        Principal::Aws(arn.into())
    }
}

impl Serialize for Principal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        match self {
            Principal::Any => serializer.serialize_str("*"),
            Principal::Service(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Service", name)?;
                map.end()
            }
            Principal::Aws(arn) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("AWS", arn)?;
                map.end()
            }
        }
    }
}
