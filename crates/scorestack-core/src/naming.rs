//! Resource naming and ARN construction.
//!
//! Physical names are deterministic (`{base}-{stage}-{region}`), so ARNs
//! of queues, topics, tables, and roles can be computed up front and
//! handed downstream as plain strings.

/// `{resource_id}-{suffix}`.
pub fn join(resource_id: &str, suffix: &str) -> String {
    format!("{resource_id}-{suffix}")
}

/// ARN builders scoped to one account and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn<'a> {
    pub account_id: &'a str,
    pub region: &'a str,
}

impl<'a> Arn<'a> {
    pub fn new(account_id: &'a str, region: &'a str) -> Self {
        Self { account_id, region }
    }

    pub fn queue(&self, name: &str) -> String {
        format!("arn:aws:sqs:{}:{}:{name}", self.region, self.account_id)
    }

    /// Queue URL, needed by queue policies and test runners.
    pub fn queue_url(&self, name: &str) -> String {
        format!("https://sqs.{}.amazonaws.com/{}/{name}", self.region, self.account_id)
    }

    pub fn topic(&self, name: &str) -> String {
        format!("arn:aws:sns:{}:{}:{name}", self.region, self.account_id)
    }

    pub fn table(&self, name: &str) -> String {
        format!("arn:aws:dynamodb:{}:{}:table/{name}", self.region, self.account_id)
    }

    pub fn function(&self, name: &str) -> String {
        format!("arn:aws:lambda:{}:{}:function:{name}", self.region, self.account_id)
    }

    pub fn event_bus(&self, name: &str) -> String {
        format!("arn:aws:events:{}:{}:event-bus/{name}", self.region, self.account_id)
    }

    pub fn alarm(&self, name: &str) -> String {
        format!("arn:aws:cloudwatch:{}:{}:alarm:{name}", self.region, self.account_id)
    }

    pub fn log_group(&self, name: &str) -> String {
        format!("arn:aws:logs:{}:{}:log-group:{name}", self.region, self.account_id)
    }

    /// IAM is global: the region is not part of role ARNs.
    pub fn role(&self, name: &str) -> String {
        format!("arn:aws:iam::{}:role/{name}", self.account_id)
    }

    /// Session ARN of a role assumed by the model-hosting service.
    pub fn assumed_role(&self, role_name: &str, session: &str) -> String {
        format!("arn:aws:sts::{}:assumed-role/{role_name}/{session}", self.account_id)
    }

    /// Graph cluster data-plane resource, keyed by cluster resource id.
    pub fn graph_cluster_prefix(&self) -> String {
        format!("arn:aws:neptune-db:{}:{}:", self.region, self.account_id)
    }
}

/// AWS managed policy ARN.
pub fn managed_policy(name: &str) -> String {
    format!("arn:aws:iam::aws:policy/{name}")
}
